//! Normalized document analysis result types.
//!
//! This is the stable shape handed to callers regardless of which service
//! model variant produced the raw payload. A `NormalizedDocument` is built
//! once per completed analysis by [`crate::normalize`] and immutable after.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate ISO8601 timestamp for current time.
pub fn now_iso8601() -> String {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    // Simple UTC timestamp without external deps
    // Format: 2025-02-05T12:00:00Z
    let days_since_epoch = secs / 86400;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let mut year = 1970i32;
    let mut remaining_days = days_since_epoch as i32;

    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let days_in_months: [i32; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1;
    for days in days_in_months {
        if remaining_days < days {
            break;
        }
        remaining_days -= days;
        month += 1;
    }
    let day = remaining_days + 1;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hours, minutes, seconds
    )
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// One completed analysis, as stored and served by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub source_file: String,
    /// Logical model name the caller selected.
    pub model: String,
    /// Service model identifier the analysis actually ran with.
    pub service_model: String,
    pub content_hash: String,
    pub analyzed_at: String, // ISO8601 timestamp
    pub document: NormalizedDocument,
}

impl AnalysisRecord {
    pub fn new(
        source_file: String,
        model: String,
        service_model: String,
        content_hash: String,
        document: NormalizedDocument,
    ) -> Self {
        Self {
            id: format!("ana_{}", Uuid::new_v4().simple()),
            source_file,
            model,
            service_model,
            content_hash,
            analyzed_at: now_iso8601(),
            document,
        }
    }
}

/// The stable internal analysis result.
///
/// All confidences are integers on a 0–100 scale; the 0–1 floats from the
/// service are converted exactly once, at normalization time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDocument {
    /// Newline join of every line's text in page order, line order.
    pub raw_text: String,
    pub pages: Vec<Page>,
    pub tables: Vec<Table>,
    pub checkboxes: Vec<Checkbox>,
    pub figures: Vec<Figure>,
    pub styles: Vec<HandwritingStyle>,
    pub key_value_pairs: Vec<KeyValuePair>,
    pub stats: DocumentStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_number: u32,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub text: String,
    pub confidence: u32,
    pub polygon: Vec<Point>,
    pub bounding_box: BoundingBox,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub text: String,
    pub confidence: u32,
    pub polygon: Vec<Point>,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned box derived deterministically from the region polygon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub row_count: u32,
    pub column_count: u32,
    pub confidence: u32,
    /// Always tiles the full `row_count x column_count` grid; cells the
    /// service omitted are present with empty content.
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub is_header: bool,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub row_index: u32,
    pub column_index: u32,
    pub content: String,
    pub confidence: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckboxState {
    Selected,
    Unselected,
}

/// A detected selection mark. The service provides no identifier, so `id` is
/// synthesized from page number and per-page mark index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkbox {
    pub id: String,
    pub state: CheckboxState,
    pub confidence: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Figure {
    pub caption: String,
    pub confidence: u32,
    pub elements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandwritingStyle {
    pub is_handwritten: bool,
    pub confidence: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
    pub confidence: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub page_count: usize,
    pub line_count: usize,
    pub table_count: usize,
    pub checkbox_count: usize,
    pub figure_count: usize,
    /// Mean of line confidences across all pages, 0 when there are no lines.
    pub average_confidence: u32,
}
