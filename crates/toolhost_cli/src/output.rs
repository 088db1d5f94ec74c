//! Terminal output: styled text for people, one JSON object per line for
//! scripts.
//!
//! `console` styles text (and honors NO_COLOR), `comfy-table` renders tool
//! listings and `indicatif` shows a spinner while servers connect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cli::OutputFormat;

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(format: OutputFormat) {
    JSON_MODE.store(matches!(format, OutputFormat::Json), Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

#[derive(Serialize)]
struct Line<'a> {
    level: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a JsonValue>,
}

fn json_line(level: &str, message: &str, data: Option<&JsonValue>) -> String {
    serde_json::to_string(&Line { level, message, data })
        .unwrap_or_else(|_| serde_json::json!({ "level": level, "message": message }).to_string())
}

fn emit(level: &str, message: &str, data: Option<&JsonValue>) {
    println!("{}", json_line(level, message, data));
}

pub fn header(text: &str) {
    if is_json() {
        emit("info", text, None);
    } else {
        println!("{}", style(text).bold().cyan());
    }
}

pub fn success(text: &str) {
    if is_json() {
        emit("success", text, None);
    } else {
        println!("{} {}", style("✓").green(), style(text).bright());
    }
}

/// Errors go to stderr in both modes.
pub fn error(text: &str) {
    if is_json() {
        eprintln!("{}", json_line("error", text, None));
    } else {
        eprintln!("{} {}", style("✗").red(), style(text).bright());
    }
}

pub fn warning(text: &str) {
    if is_json() {
        emit("warning", text, None);
    } else {
        println!("{} {}", style("!").yellow(), style(text).bright());
    }
}

pub fn dim(text: &str) {
    if is_json() {
        emit("info", text, None);
    } else {
        println!("{}", style(text).dim());
    }
}

/// Emits a serializable value: the JSON payload in JSON mode, the plain
/// text otherwise.
pub fn data<T: Serialize>(label: &str, value: &T, text: &str) {
    if is_json() {
        let value = serde_json::to_value(value).unwrap_or(JsonValue::Null);
        emit("data", label, Some(&value));
    } else {
        println!("{text}");
    }
}

// ── Tables ─────────────────────────────────────────────────────────

pub fn table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).fg(Color::Cyan).add_attribute(Attribute::Bold)),
        );
    table
}

/// The first cell is highlighted.
pub fn table_row(table: &mut Table, cells: &[&str]) {
    let mut row = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        row.push(if i == 0 { Cell::new(cell).fg(Color::Green) } else { Cell::new(cell) });
    }
    table.add_row(row);
}

/// Prints the table, or the given items as one JSON line.
pub fn table_print<T: Serialize>(table: &Table, items: &[T]) {
    if is_json() {
        let items = serde_json::to_value(items).unwrap_or(JsonValue::Null);
        emit("list", "", Some(&serde_json::json!({ "items": items })));
    } else {
        println!("{table}");
    }
}

// ── Spinners ───────────────────────────────────────────────────────

/// Hidden in JSON mode so stdout stays machine-readable.
pub fn spinner(message: &str) -> ProgressBar {
    if is_json() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn spinner_success(spinner: &ProgressBar, message: &str) {
    spinner.finish_and_clear();
    success(message);
}

pub fn spinner_warning(spinner: &ProgressBar, message: &str) {
    spinner.finish_and_clear();
    warning(message);
}
