//! Background consumer of [`AuthEvent`]s.
//!
//! Logs every sign-in and sign-out and sweeps expired sessions from the
//! sessions table, so rows whose token is never presented again do not
//! pile up.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::auth::{purge_expired_sessions, AuthEvent};
use crate::db::{self, Db};

/// Spawn the monitor on the current runtime
pub fn spawn(db: Db, events: broadcast::Receiver<AuthEvent>) -> JoinHandle<()> {
    tokio::spawn(run(db, events))
}

/// Follow auth events until the channel closes
pub async fn run(db: Db, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(AuthEvent::SignedIn { user_id }) => {
                tracing::debug!("Auth event: {} signed in", user_id);
            }
            Ok(AuthEvent::SignedOut { user_id }) => {
                tracing::debug!("Auth event: {} signed out", user_id);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Session monitor missed {} auth events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
        sweep(&db).await;
    }
    tracing::info!("Session monitor stopped");
}

async fn sweep(db: &Db) {
    match db::write(db, |txn| purge_expired_sessions(txn, db::now())).await {
        Ok(0) => {}
        Ok(purged) => tracing::info!("Purged {} expired sessions", purged),
        Err(e) => tracing::warn!("Expired session sweep failed: {}", e),
    }
}
