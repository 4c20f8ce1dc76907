//! Raw wire schema for the document analysis service.
//!
//! The single place where the service's nested JSON shape is declared. Every
//! optional field is defaulted here, once, instead of ad-hoc fallback chains
//! scattered across consumers.

use serde::Deserialize;

/// Poll response body: `{status, analyzeResult?, error?}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollEnvelope {
    pub status: String,
    #[serde(default)]
    pub analyze_result: Option<RawAnalyzeResult>,
    #[serde(default)]
    pub error: Option<RawServiceError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawServiceError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// The `analyzeResult` payload of a succeeded operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalyzeResult {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub pages: Vec<RawPage>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub key_value_pairs: Vec<RawKeyValuePair>,
    #[serde(default)]
    pub figures: Vec<RawFigure>,
    #[serde(default)]
    pub styles: Vec<RawStyle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub lines: Vec<RawLine>,
    #[serde(default)]
    pub selection_marks: Vec<RawSelectionMark>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLine {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Flattened corner coordinates `[x0,y0,x1,y1,x2,y2,x3,y3]`, ordered
    /// top-left, top-right, bottom-right, bottom-left.
    #[serde(default)]
    pub polygon: Vec<f64>,
    #[serde(default)]
    pub words: Vec<RawWord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWord {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub polygon: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub cells: Vec<RawCell>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCell {
    #[serde(default)]
    pub row_index: u32,
    #[serde(default)]
    pub column_index: u32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Some model variants tag cells (`columnHeader`, `content`, ...). Parsed
    /// but not used for header detection; see `normalize`.
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSelectionMark {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFigure {
    #[serde(default)]
    pub caption: Option<RawCaption>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub elements: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCaption {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStyle {
    #[serde(default)]
    pub is_handwritten: bool,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKeyValuePair {
    pub key: RawKvMember,
    #[serde(default)]
    pub value: Option<RawKvMember>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKvMember {
    #[serde(default)]
    pub content: String,
}
