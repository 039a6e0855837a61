use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{bearer_token, extract::resolve_gate, AuthEvent, AuthState, CurrentUser};
use crate::constants::{ERR_INVALID_EMAIL, ERR_MISSING_FIELDS};
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::models::{Plan, Role, SessionRecord, Theme, User, UserRecord};
use crate::routes::bad_json;
use crate::security::{generate_token, hash_password, hash_token, verify_password};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Preferred locale at sign-up
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    #[serde(flatten)]
    pub auth: AuthState,
    pub user: Option<User>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Preferences {
    pub language: String,
    pub theme: Theme,
}

#[derive(Debug, Deserialize)]
pub struct PreferencesUpdate {
    pub language: Option<String>,
    pub theme: Option<Theme>,
}

fn credentials(payload: &CredentialsRequest) -> Result<(String, String)> {
    let (Some(email), Some(password)) = (&payload.email, &payload.password) else {
        return Err(AppError::InvalidInput(ERR_MISSING_FIELDS.to_string()));
    };
    Ok((User::normalize_email(email), password.clone()))
}

/// Create a session for `user_id` and return its bearer token
fn open_session(txn: &redb::WriteTransaction, user_id: &str, ttl_secs: i64) -> Result<String> {
    let token = generate_token();
    let now = db::now();
    let session = SessionRecord {
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now.saturating_add(ttl_secs),
    };
    let mut sessions = txn.open_table(tables::SESSIONS)?;
    db::store(&mut sessions, &hash_token(&token), &session)?;
    Ok(token)
}

/// Register an account and sign it in
///
/// Returns 409 Conflict if the e-mail is already registered. Addresses
/// listed in `ADMIN_EMAILS` get the admin role.
///
/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let (email, password) = credentials(&payload)?;

    if !User::validate_email(&email) {
        return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
    }
    if !User::validate_password(&password) {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            crate::constants::MIN_PASSWORD_LEN
        )));
    }
    let language = match payload.language.as_deref().map(str::trim) {
        Some(language) if state.i18n.catalog(language).is_some() => language.to_string(),
        Some(language) => {
            return Err(AppError::InvalidInput(format!(
                "Unsupported language: {}",
                language
            )))
        }
        None => state.i18n.default_locale().to_string(),
    };

    let pepper = state.config.password_pepper.clone();
    let password_hash =
        tokio::task::spawn_blocking(move || hash_password(&password, &pepper)).await??;
    let record = UserRecord {
        email: email.clone(),
        password_hash,
        role: if state.config.is_admin_email(&email) {
            Role::Admin
        } else {
            Role::User
        },
        plan: Plan::Free,
        language,
        theme: Theme::System,
        created_at: db::now(),
    };

    let ttl = state.config.session_ttl_secs;
    let (user_id, token, record) = db::write(&state.db, move |txn| {
        let mut emails = txn.open_table(tables::USER_EMAILS)?;
        if emails.get(email.as_str())?.is_some() {
            tracing::info!("Sign-up for an existing e-mail");
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user_id = db::new_id();
        db::store(&mut emails, &email, &user_id)?;
        drop(emails);

        let mut users = txn.open_table(tables::USERS)?;
        db::store(&mut users, &user_id, &record)?;
        drop(users);

        let token = open_session(txn, &user_id, ttl)?;
        Ok((user_id, token, record))
    })
    .await?;

    tracing::info!("New user registered: {} ({:?})", user_id, record.role);
    state.auth_events.publish(AuthEvent::SignedIn {
        user_id: user_id.clone(),
    });

    Ok(Json(SessionResponse {
        token,
        user: User::from_record(user_id, record),
    }))
}

/// Verify credentials and open a session
///
/// POST /api/auth/signin
pub async fn signin(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let (email, password) = credentials(&payload)?;

    let (user_id, record) = db::read(&state.db, move |txn| {
        let user_id: String = {
            let emails = txn.open_table(tables::USER_EMAILS)?;
            db::load(&emails, &email)?.ok_or(AppError::InvalidCredentials)?
        };
        let users = txn.open_table(tables::USERS)?;
        let record: UserRecord =
            db::load(&users, &user_id)?.ok_or(AppError::InvalidCredentials)?;
        Ok((user_id, record))
    })
    .await?;

    let pepper = state.config.password_pepper.clone();
    let stored = record.password_hash.clone();
    let verified =
        tokio::task::spawn_blocking(move || verify_password(&password, &pepper, &stored)).await?;
    if !verified {
        tracing::warn!("Failed sign-in for user {}", user_id);
        return Err(AppError::InvalidCredentials);
    }

    let ttl = state.config.session_ttl_secs;
    let session_user = user_id.clone();
    let token = db::write(&state.db, move |txn| open_session(txn, &session_user, ttl)).await?;

    tracing::info!("User signed in: {}", user_id);
    state.auth_events.publish(AuthEvent::SignedIn {
        user_id: user_id.clone(),
    });

    Ok(Json(SessionResponse {
        token,
        user: User::from_record(user_id, record),
    }))
}

/// End the caller's session
///
/// POST /api/auth/signout
pub async fn signout(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;

    let removed = db::write(&state.db, move |txn| {
        let mut sessions = txn.open_table(tables::SESSIONS)?;
        let removed = sessions.remove(hash_token(&token).as_str())?;
        match removed {
            Some(guard) => Ok(Some(db::decode::<SessionRecord>(guard.value())?)),
            None => Ok(None),
        }
    })
    .await?;

    if let Some(session) = removed {
        tracing::info!("User signed out: {}", session.user_id);
        state.auth_events.publish(AuthEvent::SignedOut {
            user_id: session.user_id,
        });
    }

    Ok(Json(json!({ "message": "Signed out" })))
}

/// Current authentication state of the caller
///
/// Never fails on a missing or expired session; it reports it.
///
/// GET /api/auth/session
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>> {
    let gate = resolve_gate(&headers, &state).await;
    let auth = gate.state().clone();

    let user = match auth.user_id.clone() {
        Some(user_id) => {
            db::read(&state.db, move |txn| {
                let users = txn.open_table(tables::USERS)?;
                Ok(db::load::<UserRecord, _>(&users, &user_id)?
                    .map(|record| User::from_record(user_id, record)))
            })
            .await?
        }
        None => None,
    };

    Ok(Json(SessionStatus { auth, user }))
}

fn load_user(txn: &redb::ReadTransaction, user_id: &str) -> Result<UserRecord> {
    let users = txn.open_table(tables::USERS)?;
    db::load(&users, user_id)?.ok_or(AppError::NotFound("User"))
}

/// GET /api/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<User>> {
    let profile = db::read(&state.db, move |txn| {
        let record = load_user(txn, &user.id)?;
        Ok(User::from_record(user.id, record))
    })
    .await?;

    Ok(Json(profile))
}

/// GET /api/me/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Preferences>> {
    let record = db::read(&state.db, move |txn| load_user(txn, &user.id)).await?;

    Ok(Json(Preferences {
        language: record.language,
        theme: record.theme,
    }))
}

/// PUT /api/me/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: std::result::Result<Json<PreferencesUpdate>, JsonRejection>,
) -> Result<Json<Preferences>> {
    let Json(update) = payload.map_err(bad_json)?;

    if let Some(language) = &update.language {
        if !User::validate_language(language) || state.i18n.catalog(language).is_none() {
            return Err(AppError::InvalidInput(format!(
                "Unsupported language: {}",
                language
            )));
        }
    }

    let record = db::write(&state.db, move |txn| {
        let mut users = txn.open_table(tables::USERS)?;
        let mut record: UserRecord =
            db::load(&users, &user.id)?.ok_or(AppError::NotFound("User"))?;
        if let Some(language) = update.language {
            record.language = language;
        }
        if let Some(theme) = update.theme {
            record.theme = theme;
        }
        db::store(&mut users, &user.id, &record)?;
        Ok(record)
    })
    .await?;

    Ok(Json(Preferences {
        language: record.language,
        theme: record.theme,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ERR_INVALID_CREDENTIALS;

    #[test]
    fn test_credentials_require_both_fields() {
        let missing = CredentialsRequest {
            email: Some("a@b.io".into()),
            password: None,
            language: None,
        };
        assert!(matches!(
            credentials(&missing),
            Err(AppError::InvalidInput(msg)) if msg == ERR_MISSING_FIELDS
        ));

        let complete = CredentialsRequest {
            email: Some(" Ana@PetTouch.App ".into()),
            password: Some("hunter22".into()),
            language: None,
        };
        let (email, _) = credentials(&complete).unwrap();
        assert_eq!(email, "ana@pettouch.app");
    }

    #[test]
    fn test_invalid_credentials_message() {
        assert_eq!(AppError::InvalidCredentials.to_string(), ERR_INVALID_CREDENTIALS);
    }
}
