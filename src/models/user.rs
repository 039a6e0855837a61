use serde::{Deserialize, Serialize};

use crate::constants::MIN_PASSWORD_LEN;
use crate::models::{Plan, Role};

/// Display theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// User record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Lower-cased e-mail address
    pub email: String,
    /// Argon2id PHC string, keyed with the server pepper
    pub password_hash: String,
    pub role: Role,
    pub plan: Plan,
    /// Preferred locale for notifications
    pub language: String,
    pub theme: Theme,
    /// When the user was created (Unix timestamp)
    pub created_at: i64,
}

/// Session record stored in redb, keyed by the token hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// User model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub plan: Plan,
    pub language: String,
    pub theme: Theme,
    pub created_at: String,
}

impl User {
    pub fn from_record(id: String, record: UserRecord) -> Self {
        Self {
            id,
            email: record.email,
            role: record.role,
            plan: record.plan,
            language: record.language,
            theme: record.theme,
            created_at: crate::routes::timestamp_to_rfc3339(record.created_at),
        }
    }

    /// Normalize an e-mail address for storage and lookup
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Minimal e-mail shape check: one `@`, non-empty local part, dotted domain
    pub fn validate_email(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !email.chars().any(char::is_whitespace)
    }

    pub fn validate_password(password: &str) -> bool {
        password.chars().count() >= MIN_PASSWORD_LEN
    }

    /// Locale tags are short lowercase codes like `en` or `pt-br`
    pub fn validate_language(language: &str) -> bool {
        (2..=10).contains(&language.len())
            && language
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '-')
    }
}
