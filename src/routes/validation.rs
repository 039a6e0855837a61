use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Convert Unix timestamp to RFC3339 string, defaulting to now if invalid
pub fn timestamp_to_rfc3339(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

/// Map a JSON body rejection to a 400 with the parser's message
pub fn bad_json(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected JSON body: {}", rejection.body_text());
    AppError::InvalidInput(rejection.body_text())
}

/// Trimmed, non-empty text no longer than `max` characters
pub fn require_text(field: &str, value: Option<&str>, max: usize) -> Result<String, AppError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_rfc3339() {
        assert_eq!(timestamp_to_rfc3339(0), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("name", Some("  Rex "), 10).unwrap(), "Rex");
        assert!(require_text("name", Some("   "), 10).is_err());
        assert!(require_text("name", None, 10).is_err());
        assert!(require_text("name", Some("abcdef"), 3).is_err());
    }
}
