//! Parsing and batch validation for frame records

use crate::error::ProctorError;
use crate::schema::frame_record::*;

/// Adapter for reading frame records from serialized input
pub struct FrameRecordAdapter;

impl FrameRecordAdapter {
    /// Parse a JSON string containing an array of FrameRecords
    pub fn parse_array(json: &str) -> Result<Vec<FrameRecord>, ProctorError> {
        let records: Vec<FrameRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing FrameRecords
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<FrameRecord>, ProctorError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<FrameRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ProctorError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[FrameRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index,
                    timestamp: record.timestamp.to_rfc3339(),
                    error,
                })
            })
            .collect()
    }

    /// Check that records are in non-decreasing timestamp order
    pub fn check_ordering(records: &[FrameRecord]) -> Result<(), ProctorError> {
        for (index, pair) in records.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(ProctorError::ParseError(format!(
                    "Record {} is earlier than the record before it",
                    index + 1
                )));
            }
        }
        Ok(())
    }
}

/// A record that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub timestamp: String,
    pub error: ValidationError,
}
