use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TAG_CODE_LEN, MIN_TAG_CODE_LEN};
use crate::geolocation::Coordinates;
use crate::routes::timestamp_to_rfc3339;

/// NFC tag record stored in redb, keyed by tag code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NfcTagRecord {
    pub pet_id: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: i64,
    pub linked_at: Option<i64>,
}

impl NfcTagRecord {
    pub fn new(now: i64) -> Self {
        Self {
            pet_id: None,
            owner_id: None,
            created_at: now,
            linked_at: None,
        }
    }

    pub fn unlink(&mut self) {
        self.pet_id = None;
        self.owner_id = None;
        self.linked_at = None;
    }
}

/// Scan record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub tag_code: String,
    pub pet_id: Option<String>,
    pub location: Option<Coordinates>,
    pub scanned_at: i64,
}

/// NFC tag model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NfcTag {
    pub tag_code: String,
    pub pet_id: Option<String>,
    pub created_at: String,
    pub linked_at: Option<String>,
}

impl NfcTag {
    pub fn from_record(tag_code: String, record: NfcTagRecord) -> Self {
        Self {
            tag_code,
            pet_id: record.pet_id,
            created_at: timestamp_to_rfc3339(record.created_at),
            linked_at: record.linked_at.map(timestamp_to_rfc3339),
        }
    }

    /// Normalize a tag code: trimmed and upper-cased
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }

    /// Tag codes are ASCII alphanumerics, `-` and `_`
    pub fn validate_code(code: &str) -> bool {
        (MIN_TAG_CODE_LEN..=MAX_TAG_CODE_LEN).contains(&code.len())
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

/// Scan model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub tag_code: String,
    pub pet_id: Option<String>,
    pub location: Option<Coordinates>,
    pub scanned_at: String,
}

impl Scan {
    pub fn from_record(id: String, record: ScanRecord) -> Self {
        Self {
            id,
            tag_code: record.tag_code,
            pet_id: record.pet_id,
            location: record.location,
            scanned_at: timestamp_to_rfc3339(record.scanned_at),
        }
    }
}
