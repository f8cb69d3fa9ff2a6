//! Digit input schema
//!
//! An 8x8 grayscale digit image flattened row-major into 64 pixel values.
//! Request bodies are validated in lax mode: numbers, numeric strings and
//! booleans are all accepted as pixel values, and every problem found is
//! reported with its location in the body.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of pixels in a flattened 8x8 digit image
pub const PIXEL_COUNT: usize = 64;

// =============================================================================
// Validation Issues
// =============================================================================

/// One step of the path to an offending value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocItem {
    Index(usize),
    Key(String),
}

impl From<&str> for LocItem {
    fn from(key: &str) -> Self {
        LocItem::Key(key.to_string())
    }
}

impl From<usize> for LocItem {
    fn from(index: usize) -> Self {
        LocItem::Index(index)
    }
}

/// A single request validation problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Where in the request the problem was found, e.g. `["body", "pixels", 3]`
    pub loc: Vec<LocItem>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    pub fn new(loc: Vec<LocItem>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

// =============================================================================
// Digit Input
// =============================================================================

/// Request body accepted by the prediction endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitInput {
    /// Flattened pixel intensities
    pub pixels: Vec<f64>,
}

impl DigitInput {
    /// Create an input from raw pixels without validating it
    pub fn new(pixels: Vec<f64>) -> Self {
        Self { pixels }
    }

    /// Ensure the input holds exactly one 8x8 image
    pub fn validate(&self) -> Result<()> {
        if self.pixels.len() != PIXEL_COUNT {
            return Err(Error::Validation(format!(
                "Input list must contain exactly {} pixel values (8x8 flattened).",
                PIXEL_COUNT
            )));
        }
        Ok(())
    }

    /// The pixels as a single feature row
    pub fn as_row(&self) -> &[f64] {
        &self.pixels
    }

    /// Validate and wrap the pixels as a single-row 2D input
    pub fn into_rows(self) -> Result<Vec<Vec<f64>>> {
        self.validate()?;
        Ok(vec![self.pixels])
    }

    /// Parse and validate a raw JSON request body
    ///
    /// The body is read as JSON whatever content type the client declared.
    pub fn from_body(body: &[u8]) -> std::result::Result<Self, Vec<ValidationIssue>> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(vec![ValidationIssue::new(
                vec!["body".into()],
                "Field required",
                "missing",
            )]);
        }

        let value: Value = serde_json::from_slice(body).map_err(|e| {
            let offset = error_offset(body, e.line(), e.column());
            vec![ValidationIssue::new(
                vec!["body".into(), offset.into()],
                "JSON decode error",
                "json_invalid",
            )]
        })?;

        let object = value.as_object().ok_or_else(|| {
            vec![ValidationIssue::new(
                vec!["body".into()],
                "Input should be a valid dictionary or object to extract fields from",
                "model_attributes_type",
            )]
        })?;

        let field_loc = || -> Vec<LocItem> { vec!["body".into(), "pixels".into()] };

        let items = match object.get("pixels") {
            None => {
                return Err(vec![ValidationIssue::new(
                    field_loc(),
                    "Field required",
                    "missing",
                )])
            }
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(vec![ValidationIssue::new(
                    field_loc(),
                    "Input should be a valid list",
                    "list_type",
                )])
            }
        };

        let mut pixels = Vec::with_capacity(items.len());
        let mut issues = Vec::new();
        for (i, item) in items.iter().enumerate() {
            match lax_float(item) {
                Ok(v) => pixels.push(v),
                Err((msg, kind)) => {
                    let mut loc = field_loc();
                    loc.push(i.into());
                    issues.push(ValidationIssue::new(loc, msg, kind));
                }
            }
        }
        if !issues.is_empty() {
            return Err(issues);
        }

        let input = DigitInput::new(pixels);
        input.validate().map_err(|e| {
            vec![ValidationIssue::new(
                field_loc(),
                format!("Value error, {}", e),
                "value_error",
            )]
        })?;

        Ok(input)
    }
}

/// Coerce one JSON value to a float the way a lax schema would
fn lax_float(value: &Value) -> std::result::Result<f64, (&'static str, &'static str)> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or(("Input should be a valid number", "float_type")),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            (
                "Input should be a valid number, unable to parse string as a number",
                "float_parsing",
            )
        }),
        _ => Err(("Input should be a valid number", "float_type")),
    }
}

/// Byte offset of a serde_json error position (1-based line and column)
fn error_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = body
        .split(|&b| b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(body.len())
}
