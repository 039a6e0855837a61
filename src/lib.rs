//! PetTouch Server Library
//!
//! Pet profiles with plan quotas, NFC-tag lost-and-found recovery, a small
//! storefront and the admin back-office, served as a JSON API.

pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod functions;
pub mod geolocation;
pub mod i18n;
pub mod models;
pub mod retry;
pub mod routes;
pub mod security;

pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};
pub use routes::router;

use std::sync::Arc;

use auth::AuthEvents;
use i18n::Translator;
use retry::RetryPolicy;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub i18n: Arc<Translator>,
    pub auth_events: AuthEvents,
}

impl AppState {
    /// Create a new AppState with the given database, configuration and catalogues
    pub fn new(db: Db, config: Config, i18n: Translator) -> Self {
        Self {
            db,
            config,
            i18n: Arc::new(i18n),
            auth_events: AuthEvents::default(),
        }
    }

    /// Backoff policy for retried reads
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.config.retry_max_attempts)
    }
}
