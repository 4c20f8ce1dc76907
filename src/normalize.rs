//! Pure normalization of the service's raw analysis payload.
//!
//! `normalize` is the single place where the heterogeneous nested result
//! (pages → lines → words, tables → cells, selection marks, figures, styles,
//! key-value pairs) becomes the stable [`NormalizedDocument`] shape. It never
//! fails: anything the service omitted is substituted with a documented
//! default here, not re-invented per consumer.

use crate::analysis::raw::{RawAnalyzeResult, RawTable};
use crate::document::{
    BoundingBox, Checkbox, CheckboxState, DocumentStats, Figure, HandwritingStyle, KeyValuePair,
    Line, NormalizedDocument, Page, Point, Table, TableCell, TableRow, Word,
};
use std::collections::HashMap;

/// Default confidence when the service omits a score for a line or word.
/// Carried over from the original system; the exact values look like
/// placeholders rather than a product decision, so they live here as the one
/// place to change them.
const DEFAULT_LINE_CONFIDENCE: u32 = 99;
/// Default confidence for tables, checkboxes and figures without a score.
const DEFAULT_REGION_CONFIDENCE: u32 = 95;

/// Convert a raw succeeded payload into the normalized document shape.
///
/// `model_id` is the service model the analysis ran with; it feeds the
/// fallback key-value metadata when the model returned no pairs.
pub fn normalize(raw: RawAnalyzeResult, model_id: &str) -> NormalizedDocument {
    let pages: Vec<Page> = raw
        .pages
        .iter()
        .map(|page| Page {
            page_number: page.page_number,
            lines: page
                .lines
                .iter()
                .map(|line| Line {
                    text: line.content.clone(),
                    confidence: scale_confidence(line.confidence, DEFAULT_LINE_CONFIDENCE),
                    polygon: polygon_points(&line.polygon),
                    bounding_box: bounding_box(&line.polygon),
                    words: line
                        .words
                        .iter()
                        .map(|word| Word {
                            text: word.content.clone(),
                            confidence: scale_confidence(word.confidence, DEFAULT_LINE_CONFIDENCE),
                            polygon: polygon_points(&word.polygon),
                            bounding_box: bounding_box(&word.polygon),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    let raw_text = pages
        .iter()
        .flat_map(|p| p.lines.iter())
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let tables: Vec<Table> = raw.tables.iter().map(normalize_table).collect();

    let checkboxes: Vec<Checkbox> = raw
        .pages
        .iter()
        .flat_map(|page| {
            page.selection_marks
                .iter()
                .enumerate()
                .map(move |(index, mark)| Checkbox {
                    // The service provides no mark identifier.
                    id: format!("{}:{}", page.page_number, index),
                    state: if mark.state == "selected" {
                        CheckboxState::Selected
                    } else {
                        CheckboxState::Unselected
                    },
                    confidence: scale_confidence(mark.confidence, DEFAULT_REGION_CONFIDENCE),
                })
        })
        .collect();

    let figures: Vec<Figure> = raw
        .figures
        .iter()
        .map(|figure| Figure {
            caption: figure
                .caption
                .as_ref()
                .map(|c| c.content.clone())
                .unwrap_or_default(),
            confidence: scale_confidence(figure.confidence, DEFAULT_REGION_CONFIDENCE),
            elements: figure.elements.clone(),
        })
        .collect();

    let styles: Vec<HandwritingStyle> = raw
        .styles
        .iter()
        .map(|style| HandwritingStyle {
            is_handwritten: style.is_handwritten,
            confidence: scale_confidence(style.confidence, DEFAULT_REGION_CONFIDENCE),
        })
        .collect();

    let mut key_value_pairs: Vec<KeyValuePair> = raw
        .key_value_pairs
        .iter()
        .map(|pair| KeyValuePair {
            key: pair.key.content.clone(),
            value: pair
                .value
                .as_ref()
                .map(|v| v.content.clone())
                .unwrap_or_default(),
            confidence: scale_confidence(pair.confidence, DEFAULT_LINE_CONFIDENCE),
        })
        .collect();

    // Non-form models commonly return no pairs; synthesize descriptive
    // metadata so consumers never see an empty, ambiguous result.
    if key_value_pairs.is_empty() {
        key_value_pairs = vec![
            KeyValuePair {
                key: "Document Type".to_string(),
                value: model_id.to_string(),
                confidence: 100,
            },
            KeyValuePair {
                key: "Page Count".to_string(),
                value: pages.len().to_string(),
                confidence: DEFAULT_REGION_CONFIDENCE,
            },
            KeyValuePair {
                key: "Table Count".to_string(),
                value: tables.len().to_string(),
                confidence: DEFAULT_REGION_CONFIDENCE,
            },
        ];
    }

    let line_confidences: Vec<u32> = pages
        .iter()
        .flat_map(|p| p.lines.iter())
        .map(|l| l.confidence)
        .collect();
    let average_confidence = if line_confidences.is_empty() {
        0
    } else {
        let sum: u32 = line_confidences.iter().sum();
        ((sum as f64) / (line_confidences.len() as f64)).round() as u32
    };

    let stats = DocumentStats {
        page_count: pages.len(),
        line_count: line_confidences.len(),
        table_count: tables.len(),
        checkbox_count: checkboxes.len(),
        figure_count: figures.len(),
        average_confidence,
    };

    NormalizedDocument {
        raw_text,
        pages,
        tables,
        checkboxes,
        figures,
        styles,
        key_value_pairs,
        stats,
    }
}

/// Scale a 0–1 service confidence to an integer 0–100, rounding half-up.
fn scale_confidence(raw: Option<f64>, default: u32) -> u32 {
    match raw {
        Some(value) => (value * 100.0).round().clamp(0.0, 100.0) as u32,
        None => default,
    }
}

/// Pair up a flattened polygon `[x0,y0,x1,y1,...]` into points.
fn polygon_points(polygon: &[f64]) -> Vec<Point> {
    polygon
        .chunks_exact(2)
        .map(|pair| Point {
            x: pair[0],
            y: pair[1],
        })
        .collect()
}

/// Derive the axis-aligned box from the 4-point polygon encoding (top-left,
/// top-right, bottom-right, bottom-left). Short polygons yield a zeroed box.
fn bounding_box(polygon: &[f64]) -> BoundingBox {
    if polygon.len() < 6 {
        return BoundingBox::default();
    }
    BoundingBox {
        x: polygon[0],
        y: polygon[1],
        width: (polygon[4] - polygon[0]).abs(),
        height: (polygon[5] - polygon[1]).abs(),
    }
}

/// Build a table whose rows fully tile the declared grid. Cells the service
/// omitted become empty-content cells; duplicates at the same (row, column)
/// keep the last occurrence. The first structural row is marked as the header
/// row regardless of cell content or the raw `kind` tags.
fn normalize_table(raw: &RawTable) -> Table {
    let mut by_position: HashMap<(u32, u32), &crate::analysis::raw::RawCell> = HashMap::new();
    for cell in &raw.cells {
        by_position.insert((cell.row_index, cell.column_index), cell);
    }

    let rows: Vec<TableRow> = (0..raw.row_count)
        .map(|row_index| TableRow {
            is_header: row_index == 0,
            cells: (0..raw.column_count)
                .map(|column_index| match by_position.get(&(row_index, column_index)) {
                    Some(cell) => TableCell {
                        row_index,
                        column_index,
                        content: cell.content.clone(),
                        confidence: scale_confidence(cell.confidence, DEFAULT_REGION_CONFIDENCE),
                    },
                    None => TableCell {
                        row_index,
                        column_index,
                        content: String::new(),
                        confidence: DEFAULT_REGION_CONFIDENCE,
                    },
                })
                .collect(),
        })
        .collect();

    Table {
        row_count: raw.row_count,
        column_count: raw.column_count,
        confidence: scale_confidence(raw.confidence, DEFAULT_REGION_CONFIDENCE),
        rows,
    }
}
