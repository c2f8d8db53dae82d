use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_INPUT: &str = "%Y-%m-%d %H:%M";

pub fn required(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("is required".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn max_chars(value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("must be at most {max} characters"));
    }
    Ok(())
}

/// Blank input means "not set".
pub fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn int_in_range(value: &str, min: i64, max: i64) -> Result<i64, String> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| "must be a whole number".to_string())?;
    if !(min..=max).contains(&parsed) {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(parsed)
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM` (taken as UTC).
pub fn datetime(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("is required".to_string());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, DATETIME_INPUT)
        .map(|naive| naive.and_utc())
        .map_err(|_| "must look like 2026-03-01 09:00".to_string())
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format(DATETIME_INPUT).to_string()
}

pub fn date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| "must look like 2026-03-01".to_string())
}

pub fn allowed_extension(path: &Path, allowed: &[&str]) -> Result<(), String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if allowed.contains(&extension.as_str()) {
        return Ok(());
    }
    Err(format!(
        "{} has an unsupported type, allowed: {}",
        path.display(),
        allowed.join(", ")
    ))
}

pub fn within_size(path: &Path, size: u64, max_bytes: u64) -> Result<(), String> {
    if size <= max_bytes {
        return Ok(());
    }
    Err(format!(
        "{} is {:.1} MB, the limit is {:.1} MB",
        path.display(),
        size as f64 / 1_048_576.0,
        max_bytes as f64 / 1_048_576.0
    ))
}
