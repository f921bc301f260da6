//! CLI output formatting.
//!
//! Human-readable output uses colored symbols and aligned fields. JSON mode
//! emits one `{"type", "payload"}` object per line for scripting. Quiet mode
//! suppresses everything except errors.

use std::fmt::Display;
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::{json, Value};

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit machine-readable JSON output instead of human-readable text.
    pub json: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Verbosity level from repeated `-v`.
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    match config_cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn json_line(kind: &str, payload: Value) -> String {
    json!({ "type": kind, "payload": payload }).to_string()
}

/// Emit `payload` as a JSON line, or run `human` unless quiet.
fn emit(kind: &str, payload: impl FnOnce() -> Value, human: impl FnOnce()) {
    let config = read_config();
    if config.json {
        println!("{}", json_line(kind, payload()));
    } else if !config.quiet {
        human();
    }
}

/// Run `human` only in unquiet human mode.
fn human_only(human: impl FnOnce()) {
    let config = read_config();
    if !config.json && !config.quiet {
        human();
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    match config_cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[must_use]
pub fn is_json() -> bool {
    read_config().json
}

#[must_use]
pub fn verbosity() -> u8 {
    read_config().verbose
}

/// Emit a serializable record in JSON mode. No-op in human mode.
///
/// Returns whether the record was emitted, so callers can skip their
/// human rendering.
pub fn record<T: Serialize>(kind: &str, value: &T) -> bool {
    if !is_json() {
        return false;
    }
    match serde_json::to_value(value) {
        Ok(payload) => println!("{}", json_line(kind, payload)),
        Err(e) => error(&format!("failed to encode {kind}: {e}")),
    }
    true
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        || json!({ "label": label, "value": value }),
        || println!("  {:<12} {}", label.dimmed(), value),
    );
}

pub fn success(message: &str) {
    emit(
        "success",
        || json!({ "message": message }),
        || println!("  {} {}", "✓".green(), message),
    );
}

/// Print an error line to stderr. Never suppressed.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json_line("error", json!({ "message": message })));
    } else {
        eprintln!("  {} {}", "×".red(), message);
    }
}

pub fn section(title: &str) {
    emit(
        "section",
        || json!({ "title": title }),
        || println!("\n{}", title.bold()),
    );
}

pub fn note(message: &str) {
    emit(
        "note",
        || json!({ "message": message }),
        || println!("  {}", message.dimmed()),
    );
}

pub fn hint(message: &str) {
    emit(
        "hint",
        || json!({ "message": message }),
        || println!("  {}: {}", "hint".cyan().dimmed(), message.dimmed()),
    );
}

/// Print one raw log line, indented.
pub fn line(content: &str) {
    human_only(|| println!("  {content}"));
}

pub fn positive(value: impl Display) -> String {
    if is_json() {
        value.to_string()
    } else {
        value.green().to_string()
    }
}

pub fn muted(value: impl Display) -> String {
    if is_json() {
        value.to_string()
    } else {
        value.dimmed().to_string()
    }
}

fn padded<'a>(cells: impl Iterator<Item = (&'a str, usize)>) -> String {
    cells.fold(String::from("  "), |mut line, (cell, width)| {
        line.push_str(&format!("{cell:<width$} "));
        line
    })
}

pub fn table_header(columns: &[(&str, usize)]) {
    human_only(|| println!("{}", padded(columns.iter().copied()).dimmed()));
}

pub fn table_separator(widths: &[usize]) {
    human_only(|| {
        let rules: Vec<String> = widths.iter().map(|width| "─".repeat(*width)).collect();
        let line = padded(rules.iter().map(String::as_str).zip(widths.iter().copied()));
        println!("{}", line.dimmed());
    });
}

pub fn table_row(cells: &[String], widths: &[usize]) {
    human_only(|| {
        println!(
            "{}",
            padded(cells.iter().map(String::as_str).zip(widths.iter().copied()))
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_wrap_payload_with_type() {
        let line = json_line("note", json!({ "message": "hi" }));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "note");
        assert_eq!(value["payload"]["message"], "hi");
    }

    #[test]
    fn padded_cells_are_left_aligned() {
        let line = padded([("ab", 4), ("c", 2)].into_iter());
        assert_eq!(line, "  ab   c  ");
    }
}
