//! Parser for delimited mutation result files.
//!
//! Format: one header line (discarded without inspection), then one variant per
//! line: `gene,chromosome,type,relevance,comment`. Fields past the fifth are
//! ignored.

use std::io::BufRead;

use thiserror::Error;
use tracing::warn;

use super::PipelineResult;
use crate::config::ShortLinePolicy;
use crate::models::{MutationRecord, RelevanceTier};
use crate::storage::StorageError;

pub const FIELD_DELIMITER: char = ',';
pub const REQUIRED_FIELDS: usize = 5;

/// Why a data line was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    InvalidUtf8,
    UnknownRelevance(String),
    TooFewFields(usize),
}

/// A rejected data line. `line` is 1-based and counts the header.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {}", describe(.kind))]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

fn describe(kind: &ParseErrorKind) -> String {
    match kind {
        ParseErrorKind::InvalidUtf8 => "not valid UTF-8".to_string(),
        ParseErrorKind::UnknownRelevance(token) => format!(
            "unknown relevance tier '{}' (expected LOW, MEDIUM or HIGH)",
            token
        ),
        ParseErrorKind::TooFewFields(found) => format!(
            "expected {} fields, found {}",
            REQUIRED_FIELDS, found
        ),
    }
}

/// Parsed file contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub records: Vec<MutationRecord>,
    /// 1-based line numbers dropped for having too few fields
    pub skipped_lines: Vec<usize>,
}

/// Parse a whole stream. Nothing is returned unless every line is accepted.
///
/// Read failures surface as storage errors; bad lines as [`ParseError`].
pub fn parse_mutations<R: BufRead>(
    mut reader: R,
    policy: ShortLinePolicy,
) -> PipelineResult<ParsedFile> {
    let mut parsed = ParsedFile::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(StorageError::Io)?;
        if read == 0 {
            break;
        }
        line_no += 1;

        // Header
        if line_no == 1 {
            continue;
        }

        let line = std::str::from_utf8(&buf).map_err(|_| ParseError {
            line: line_no,
            kind: ParseErrorKind::InvalidUtf8,
        })?;
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line, line_no)? {
            Some(record) => parsed.records.push(record),
            None => match policy {
                ShortLinePolicy::Skip => {
                    warn!(line = line_no, "skipping result line with too few fields");
                    parsed.skipped_lines.push(line_no);
                }
                ShortLinePolicy::Reject => {
                    return Err(ParseError {
                        line: line_no,
                        kind: ParseErrorKind::TooFewFields(line.split(FIELD_DELIMITER).count()),
                    }
                    .into());
                }
            },
        }
    }

    Ok(parsed)
}

/// Parse one data line. `Ok(None)` means too few fields.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<MutationRecord>, ParseError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
    if fields.len() < REQUIRED_FIELDS {
        return Ok(None);
    }

    let relevance = RelevanceTier::parse(fields[3]).ok_or_else(|| ParseError {
        line: line_no,
        kind: ParseErrorKind::UnknownRelevance(fields[3].to_string()),
    })?;

    Ok(Some(MutationRecord {
        gene: fields[0].to_string(),
        chromosome: fields[1].to_string(),
        mutation_type: fields[2].to_string(),
        relevance,
        comment: fields[4].to_string(),
    }))
}
