//! Prompt theme and summary styling.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// `ColorfulTheme` used for every prompt, rendered on stderr.
pub fn slate_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().cyan(),
        prompt_style: Style::new().for_stderr().bold(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Print one aligned `label  value` summary line to stderr.
pub fn summary_line(label: &str, value: impl std::fmt::Display) {
    let label_style = Style::new().for_stderr().bold();
    eprintln!("  {:<16} {}", label_style.apply_to(label), value);
}

/// Print a yellow warning line to stderr.
pub fn warn_line(message: &str) {
    eprintln!("  {}", style(message).for_stderr().yellow());
}
