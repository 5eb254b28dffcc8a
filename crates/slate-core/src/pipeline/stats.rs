//! Thread-safe focal-length and capture-date histograms.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{DateEntry, FocalLength, FocalLengthEntry};

/// Counts per key plus a count of items that had no key.
#[derive(Debug)]
struct Histogram<K> {
    counts: BTreeMap<K, usize>,
    unknown: usize,
}

impl<K: Ord> Histogram<K> {
    fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
            unknown: 0,
        }
    }

    fn record(&mut self, key: Option<K>) {
        match key {
            Some(k) => *self.counts.entry(k).or_insert(0) += 1,
            None => self.unknown += 1,
        }
    }
}

/// Accumulates histograms from concurrent workers.
///
/// Each `record` takes each lock once for a single increment; nothing else
/// happens while a lock is held.
#[derive(Debug)]
pub struct StatAggregator {
    focal_lengths: Mutex<Histogram<FocalLength>>,
    dates: Mutex<Histogram<NaiveDate>>,
}

impl Default for StatAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatAggregator {
    pub fn new() -> Self {
        Self {
            focal_lengths: Mutex::new(Histogram::new()),
            dates: Mutex::new(Histogram::new()),
        }
    }

    /// Count one image.
    pub fn record(&self, focal_length: Option<f64>, date: Option<NaiveDate>) {
        let focal = focal_length.filter(|f| f.is_finite()).map(FocalLength);
        lock(&self.focal_lengths).record(focal);
        lock(&self.dates).record(date);
    }

    /// Focal-length buckets, ascending.
    pub fn focal_length_entries(&self) -> Vec<FocalLengthEntry> {
        lock(&self.focal_lengths)
            .counts
            .iter()
            .map(|(k, &count)| FocalLengthEntry { value: k.0, count })
            .collect()
    }

    /// Capture-date buckets, ascending, with a `DD/MM/YY` display form.
    pub fn date_entries(&self) -> Vec<DateEntry> {
        lock(&self.dates)
            .counts
            .iter()
            .map(|(&value, &count)| DateEntry {
                value,
                count,
                display_date: value.format("%d/%m/%y").to_string(),
            })
            .collect()
    }

    /// Images recorded without a focal length.
    pub fn unknown_focal_lengths(&self) -> usize {
        lock(&self.focal_lengths).unknown
    }

    /// Images recorded without a capture date.
    pub fn unknown_dates(&self) -> usize {
        lock(&self.dates).unknown
    }
}

// A panic in another worker cannot leave a counter half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_entries_sorted_ascending() {
        let stats = StatAggregator::new();
        stats.record(Some(85.0), Some(day(2024, 3, 2)));
        stats.record(Some(24.0), Some(day(2023, 12, 25)));
        stats.record(Some(85.0), Some(day(2024, 3, 2)));

        let focal = stats.focal_length_entries();
        assert_eq!(focal.len(), 2);
        assert_eq!((focal[0].value, focal[0].count), (24.0, 1));
        assert_eq!((focal[1].value, focal[1].count), (85.0, 2));

        let dates = stats.date_entries();
        assert_eq!(dates[0].value, day(2023, 12, 25));
        assert_eq!(dates[0].display_date, "25/12/23");
        assert_eq!(dates[1].count, 2);
    }

    #[test]
    fn test_unknown_buckets() {
        let stats = StatAggregator::new();
        stats.record(None, None);
        stats.record(Some(50.0), None);
        stats.record(Some(f64::NAN), Some(day(2020, 1, 1)));

        assert_eq!(stats.unknown_focal_lengths(), 2);
        assert_eq!(stats.unknown_dates(), 2);
        assert_eq!(stats.focal_length_entries().len(), 1);
    }

    #[test]
    fn test_concurrent_records() {
        let stats = Arc::new(StatAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record(Some(if i % 2 == 0 { 35.0 } else { 50.0 }), Some(day(2022, 5, 1)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let focal = stats.focal_length_entries();
        assert_eq!(focal.iter().map(|e| e.count).sum::<usize>(), 800);
        assert_eq!(focal[0].count, 400);
        assert_eq!(stats.date_entries()[0].count, 800);
    }
}
