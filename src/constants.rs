/// Maximum length of a pet name
pub const MAX_PET_NAME_LEN: usize = 100;

/// Maximum length of short free-form text fields (type, breed, color, titles)
pub const MAX_SHORT_TEXT_LEN: usize = 120;

/// Maximum length of long free-form text fields (descriptions, report details)
pub const MAX_LONG_TEXT_LEN: usize = 5_000;

/// Maximum length of an article body
pub const MAX_ARTICLE_BODY_LEN: usize = 100_000;

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 8;

/// NFC tag codes are between these lengths (inclusive)
pub const MIN_TAG_CODE_LEN: usize = 4;
pub const MAX_TAG_CODE_LEN: usize = 64;

/// Maximum tag codes accepted in one admin batch registration
pub const MAX_TAG_BATCH: usize = 500;

/// Maximum quantity of a single product in one order line
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Path the route guard sends unauthenticated callers to
pub const LOGIN_PATH: &str = "/login";

/// Path the route guard sends non-admin callers to
pub const HOME_PATH: &str = "/";

// =============================================================================
// Retry Backoff
// =============================================================================

/// Base delay before the first retry (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;

/// Upper bound on any single retry delay (milliseconds)
pub const RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Upper bound (exclusive) on random jitter added to each delay (milliseconds)
pub const RETRY_MAX_JITTER_MS: u64 = 1_000;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for serverless handler bodies missing required fields
pub const ERR_MISSING_FIELDS: &str = "Missing required fields";

/// Error message for a malformed e-mail address
pub const ERR_INVALID_EMAIL: &str = "Invalid email address";

/// Error message for a malformed NFC tag code
pub const ERR_INVALID_TAG_CODE: &str = "Invalid NFC tag code";

/// Error message for wrong credentials at sign-in
pub const ERR_INVALID_CREDENTIALS: &str = "Invalid email or password";
