use serde::{Deserialize, Serialize};

use crate::geolocation::Coordinates;
use crate::routes::timestamp_to_rfc3339;

/// Report record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    /// NFC tag code the finder reported against
    pub nfc_id: String,
    pub details: String,
    pub location: Option<Coordinates>,
    pub created_at: i64,
}

/// Report model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub nfc_id: String,
    pub details: String,
    pub location: Option<Coordinates>,
    pub created_at: String,
}

impl Report {
    pub fn from_record(id: String, record: ReportRecord) -> Self {
        Self {
            id,
            nfc_id: record.nfc_id,
            details: record.details,
            location: record.location,
            created_at: timestamp_to_rfc3339(record.created_at),
        }
    }
}
