//! Serverless-style handlers mounted under `/functions`.
//!
//! Each accepts one small JSON body and answers with a `{message, ...}`
//! envelope on success or `{error}` on failure. Status codes are limited to
//! 200, 400, 404, 405 and 500.

pub mod report;
pub mod scan;
pub mod subscription;

pub use report::submit_report;
pub use scan::record_scan;
pub use subscription::create_subscription;

use crate::constants::ERR_MISSING_FIELDS;
use crate::error::{AppError, Result};
use crate::geolocation::Coordinates;

/// Fallback for any method other than POST on a function route
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Trimmed value of every required field, or 400 if any is absent or blank
fn required<const N: usize>(fields: [Option<&str>; N]) -> Result<[String; N]> {
    let mut values: [String; N] = std::array::from_fn(|_| String::new());
    for (value, field) in values.iter_mut().zip(fields) {
        match field.map(str::trim) {
            Some(v) if !v.is_empty() => *value = v.to_string(),
            _ => return Err(AppError::InvalidInput(ERR_MISSING_FIELDS.to_string())),
        }
    }
    Ok(values)
}

fn check_location(location: Option<Coordinates>) -> Result<Option<Coordinates>> {
    match location {
        Some(coordinates) if !coordinates.validate() => {
            Err(AppError::InvalidInput("Invalid location".to_string()))
        }
        other => Ok(other),
    }
}
