//! Storage key generation and validation.

use chrono::{DateTime, Utc};

const MAX_FILE_NAME_LEN: usize = 100;

/// Key for an uploaded result file.
///
/// `result-files/{sample}/{timestamp}-{uuid}-{name}`: the random component
/// keeps keys unguessable and collision-free for identical uploads.
pub fn result_file_key(sample_id: &str, file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "result-files/{}/{}-{}-{}",
        sanitize_segment(sample_id),
        now.format("%Y%m%d%H%M%S"),
        uuid::Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

/// Key for a generated report: `reports/{yyyy}/{mm}/{dd}/{timestamp}-{report}.txt`.
pub fn report_key(report_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "reports/{}/{}-{}.txt",
        now.format("%Y/%m/%d"),
        now.format("%Y%m%d%H%M%S%3f"),
        sanitize_segment(report_id)
    )
}

/// Reduce an uploaded file name to `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    // Browsers may send a full client path
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "upload".to_string();
    }
    cleaned.chars().take(MAX_FILE_NAME_LEN).collect()
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Reject keys that could escape a storage root.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("key is empty".into());
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(format!("key must be a relative '/'-separated path: {}", key));
    }
    if key
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(format!("key has an empty or relative segment: {}", key));
    }
    Ok(())
}
