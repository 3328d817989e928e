//! Parsing of user-uploaded CSV price tables.
//!
//! The upload must carry a header row with at least the columns Close,
//! High, Low, Open and Volume (case-sensitive, matching the provider's
//! column names). Extra columns are ignored. Rows where any required field
//! fails to parse as a number are dropped; a structurally malformed file is
//! `BadInput`.

use crate::domain::errors::PredictionError;
use crate::domain::types::{FeatureRow, FEATURE_COUNT};
use tracing::debug;

/// Required columns in feature order (close first).
const REQUIRED_COLUMNS: [&str; FEATURE_COUNT] = ["Close", "High", "Low", "Open", "Volume"];

pub fn parse_feature_rows(bytes: &[u8]) -> Result<Vec<FeatureRow>, PredictionError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| PredictionError::BadInput {
            reason: format!("failed to read CSV header: {}", e),
        })?
        .clone();

    let mut indices = [0usize; FEATURE_COUNT];
    let mut missing = Vec::new();
    for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
        match headers.iter().position(|h| h == *name) {
            Some(idx) => indices[slot] = idx,
            None => missing.push(name.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(PredictionError::MissingColumns { columns: missing });
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| PredictionError::BadInput {
            reason: format!("failed to read CSV row: {}", e),
        })?;

        let mut row = [0.0; FEATURE_COUNT];
        let mut valid = true;
        for (slot, &idx) in indices.iter().enumerate() {
            match record.get(idx).map(str::trim).and_then(|v| v.parse::<f64>().ok()) {
                Some(v) if v.is_finite() => row[slot] = v,
                _ => {
                    valid = false;
                    break;
                }
            }
        }
        if valid {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = rows.len(), "Dropped non-numeric CSV rows");
    }
    Ok(rows)
}
