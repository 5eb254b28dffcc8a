//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.max_workers must be > 0".into(),
            ));
        }
        if self.processing.parallel_workers == Some(0) {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.pipeline.progress_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.progress_buffer must be > 0".into(),
            ));
        }
        if self.thumbnail.size == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.size must be > 0".into(),
            ));
        }
        if self.thumbnail.quality == 0 || self.thumbnail.quality > 100 {
            return Err(ConfigError::ValidationError(
                "thumbnail.quality must be between 1 and 100".into(),
            ));
        }
        if self.scan.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "scan.supported_formats must not be empty".into(),
            ));
        }
        for pattern in &self.scan.exclude_patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::ValidationError(format!(
                    "scan.exclude_patterns entry {pattern:?} is invalid: {e}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default();
        config.processing.parallel_workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_thumbnail_size_rejected() {
        let mut config = Config::default();
        config.thumbnail.size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        let mut config = Config::default();
        config.thumbnail.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_exclude_pattern_rejected() {
        let mut config = Config::default();
        config.scan.exclude_patterns = vec!["[unclosed".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_formats_rejected() {
        let mut config = Config::default();
        config.scan.supported_formats.clear();
        assert!(config.validate().is_err());
    }
}
