//! Session and role gate.
//!
//! [`AuthGate`] resolves "who is calling and are they an admin" once, caches
//! the answer, and turns it into guard decisions. The session lookup sits
//! behind [`SessionSource`]; the server implementation is [`TokenSession`].

pub mod extract;
pub mod monitor;

pub use extract::{bearer_token, AdminUser, CurrentUser};

use serde::Serialize;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::constants::{HOME_PATH, LOGIN_PATH};
use crate::db::{self, tables, Db, RecordTable};
use crate::error::Result;
use crate::models::{Role, SessionRecord, UserRecord};
use crate::security::hash_token;

/// Cached result of the last session check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub loading: bool,
    pub is_authenticated: bool,
    pub is_admin: bool,
    pub user_id: Option<String>,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            is_authenticated: false,
            is_admin: false,
            user_id: None,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::loading()
        }
    }

    pub fn signed_in(user_id: String, role: Role) -> Self {
        Self {
            loading: false,
            is_authenticated: true,
            is_admin: role.is_admin(),
            user_id: Some(user_id),
        }
    }
}

/// What a guarded route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    RequireAuth,
    RequireAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The check has not completed yet
    Pending,
    Allow,
    /// Send the caller elsewhere; `from` carries the original path when
    /// the caller must log in first
    Redirect {
        to: &'static str,
        from: Option<String>,
    },
}

/// Session-change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
}

/// Broadcast channel for [`AuthEvent`]s
#[derive(Debug, Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Where the gate reads sessions and roles from
pub trait SessionSource {
    /// User id of the active session, if any
    fn current_session(&self) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Role of a user; `None` when the user row does not exist
    fn role_of(&self, user_id: &str) -> impl Future<Output = Result<Option<Role>>> + Send;
}

pub struct AuthGate<S> {
    source: S,
    state: AuthState,
}

impl<S: SessionSource> AuthGate<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: AuthState::loading(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Re-run the session and role lookups
    ///
    /// Any lookup error leaves the caller unauthenticated.
    pub async fn refresh(&mut self) -> &AuthState {
        self.state = match self.check().await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!("Authentication check failed: {}", err);
                AuthState::signed_out()
            }
        };
        &self.state
    }

    async fn check(&self) -> Result<AuthState> {
        let Some(user_id) = self.source.current_session().await? else {
            return Ok(AuthState::signed_out());
        };

        match self.source.role_of(&user_id).await? {
            Some(role) => Ok(AuthState::signed_in(user_id, role)),
            None => {
                tracing::warn!("Session refers to a missing user: {}", user_id);
                Ok(AuthState::signed_out())
            }
        }
    }

    pub fn clear(&mut self) {
        self.state = AuthState::signed_out();
    }

    /// Decide whether `path`, guarded by `access`, may be entered
    pub fn decide(&self, access: Access, path: &str) -> GuardDecision {
        if self.state.loading {
            return GuardDecision::Pending;
        }

        match access {
            Access::Public => GuardDecision::Allow,
            Access::RequireAuth | Access::RequireAdmin if !self.state.is_authenticated => {
                GuardDecision::Redirect {
                    to: LOGIN_PATH,
                    from: Some(path.to_string()),
                }
            }
            Access::RequireAdmin if !self.state.is_admin => GuardDecision::Redirect {
                to: HOME_PATH,
                from: None,
            },
            Access::RequireAuth | Access::RequireAdmin => GuardDecision::Allow,
        }
    }

    /// Follow session changes until the channel closes
    ///
    /// A sign-in re-runs the check; a sign-out of the current user clears
    /// the state.
    pub async fn watch(&mut self, mut events: broadcast::Receiver<AuthEvent>) {
        loop {
            match events.recv().await {
                Ok(AuthEvent::SignedIn { .. }) => {
                    self.refresh().await;
                }
                Ok(AuthEvent::SignedOut { user_id }) => {
                    if self.state.user_id.as_deref() == Some(user_id.as_str()) {
                        self.clear();
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} auth events, re-checking session", skipped);
                    self.refresh().await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Session source backed by the sessions table and a bearer token
///
/// Lookups are never retried: a storage failure leaves the caller signed
/// out straight away.
pub struct TokenSession {
    db: Db,
    token: Option<String>,
}

impl TokenSession {
    pub fn new(db: Db, token: Option<String>) -> Self {
        Self { db, token }
    }
}

impl SessionSource for TokenSession {
    async fn current_session(&self) -> Result<Option<String>> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let token_hash = hash_token(token);

        let key = token_hash.clone();
        let session: Option<SessionRecord> = db::read(&self.db, move |txn| {
            let sessions = txn.open_table(tables::SESSIONS)?;
            db::load(&sessions, &key)
        })
        .await?;

        match session {
            Some(session) if session.is_expired(db::now()) => {
                db::write(&self.db, move |txn| {
                    let mut sessions = txn.open_table(tables::SESSIONS)?;
                    remove_if_expired(&mut sessions, &token_hash, db::now())
                })
                .await?;
                tracing::debug!("Expired session of user {} removed", session.user_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.user_id)),
            None => Ok(None),
        }
    }

    async fn role_of(&self, user_id: &str) -> Result<Option<Role>> {
        let user_id = user_id.to_string();
        db::read(&self.db, move |txn| {
            let users = txn.open_table(tables::USERS)?;
            let user: Option<UserRecord> = db::load(&users, &user_id)?;
            Ok(user.map(|u| u.role))
        })
        .await
    }
}

/// Remove one session row if it has expired by `now`
fn remove_if_expired(sessions: &mut RecordTable<'_>, token_hash: &str, now: i64) -> Result<bool> {
    match db::load::<SessionRecord, _>(&*sessions, token_hash)? {
        Some(session) if session.is_expired(now) => {
            sessions.remove(token_hash)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Delete every session that has expired by `now`; returns how many went
pub fn purge_expired_sessions(txn: &redb::WriteTransaction, now: i64) -> Result<usize> {
    let mut sessions = txn.open_table(tables::SESSIONS)?;
    let expired: Vec<String> = db::scan::<SessionRecord, _>(&sessions)?
        .into_iter()
        .filter(|(_, session)| session.is_expired(now))
        .map(|(token_hash, _)| token_hash)
        .collect();
    for token_hash in &expired {
        sessions.remove(token_hash.as_str())?;
    }
    Ok(expired.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use redb::ReadableDatabase;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeSessions {
        session: Mutex<Option<String>>,
        admin: bool,
        fail: bool,
        lookups: AtomicU32,
    }

    impl SessionSource for &FakeSessions {
        async fn current_session(&self) -> Result<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::NotFound("Session"));
            }
            Ok(self.session.lock().unwrap().clone())
        }

        async fn role_of(&self, _user_id: &str) -> Result<Option<Role>> {
            Ok(Some(if self.admin { Role::Admin } else { Role::User }))
        }
    }

    #[tokio::test]
    async fn test_no_session_redirects_to_login_with_origin() {
        let source = FakeSessions::default();
        let mut gate = AuthGate::new(&source);
        assert_eq!(gate.decide(Access::RequireAuth, "/pets"), GuardDecision::Pending);

        let state = gate.refresh().await.clone();
        assert!(!state.loading);
        assert!(!state.is_authenticated);

        assert_eq!(
            gate.decide(Access::RequireAuth, "/pets/42"),
            GuardDecision::Redirect {
                to: "/login",
                from: Some("/pets/42".to_string())
            }
        );
        assert_eq!(gate.decide(Access::Public, "/store"), GuardDecision::Allow);
    }

    #[tokio::test]
    async fn test_non_admin_redirected_home() {
        let source = FakeSessions {
            session: Mutex::new(Some("u1".into())),
            ..Default::default()
        };
        let mut gate = AuthGate::new(&source);
        gate.refresh().await;

        assert_eq!(gate.decide(Access::RequireAuth, "/pets"), GuardDecision::Allow);
        assert_eq!(
            gate.decide(Access::RequireAdmin, "/admin"),
            GuardDecision::Redirect {
                to: "/",
                from: None
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_error_means_unauthenticated() {
        let source = FakeSessions {
            session: Mutex::new(Some("u1".into())),
            fail: true,
            ..Default::default()
        };
        let mut gate = AuthGate::new(&source);
        assert_eq!(gate.refresh().await, &AuthState::signed_out());
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_session_storage_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        // No tables created, so the sessions lookup errors
        let db: Db = Arc::new(redb::Database::create(temp_dir.path().join("bare.db")).unwrap());

        let started = tokio::time::Instant::now();
        let mut gate = AuthGate::new(TokenSession::new(db, Some("token".into())));
        assert_eq!(gate.refresh().await, &AuthState::signed_out());
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    fn store_session(db: &Db, token: &str, user_id: &str, expires_at: i64) {
        let txn = db.begin_write().unwrap();
        {
            let mut sessions = txn.open_table(tables::SESSIONS).unwrap();
            let record = SessionRecord {
                user_id: user_id.into(),
                created_at: 0,
                expires_at,
            };
            db::store(&mut sessions, &hash_token(token), &record).unwrap();
        }
        txn.commit().unwrap();
    }

    fn session_row(db: &Db, token: &str) -> Option<SessionRecord> {
        let txn = db.begin_read().unwrap();
        let sessions = txn.open_table(tables::SESSIONS).unwrap();
        db::load(&sessions, &hash_token(token)).unwrap()
    }

    #[tokio::test]
    async fn test_expired_token_is_removed_on_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let db = db::open_database(temp_dir.path().join("test.db")).unwrap();
        store_session(&db, "old", "u1", 100);
        store_session(&db, "fresh", "u1", db::now() + 3_600);

        let source = TokenSession::new(db.clone(), Some("old".into()));
        assert_eq!(source.current_session().await.unwrap(), None);
        assert!(session_row(&db, "old").is_none());

        let source = TokenSession::new(db.clone(), Some("fresh".into()));
        assert_eq!(source.current_session().await.unwrap().as_deref(), Some("u1"));
        assert!(session_row(&db, "fresh").is_some());
    }

    #[tokio::test]
    async fn test_watch_follows_sign_in_and_sign_out() {
        let source = FakeSessions {
            admin: true,
            ..Default::default()
        };
        let mut gate = AuthGate::new(&source);
        gate.refresh().await;
        assert!(!gate.state().is_authenticated);

        let events = AuthEvents::default();
        let rx = events.subscribe();
        *source.session.lock().unwrap() = Some("admin-1".into());
        events.publish(AuthEvent::SignedIn {
            user_id: "admin-1".into(),
        });
        drop(events);
        gate.watch(rx).await;
        assert!(gate.state().is_authenticated);
        assert!(gate.state().is_admin);
        assert_eq!(gate.decide(Access::RequireAdmin, "/admin"), GuardDecision::Allow);

        let events = AuthEvents::default();
        let rx = events.subscribe();
        events.publish(AuthEvent::SignedOut {
            user_id: "someone-else".into(),
        });
        events.publish(AuthEvent::SignedOut {
            user_id: "admin-1".into(),
        });
        drop(events);
        gate.watch(rx).await;
        assert_eq!(gate.state(), &AuthState::signed_out());
    }
}
