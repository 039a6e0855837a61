use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::auth::{Access, AuthGate, GuardDecision, TokenSession};
use crate::error::{AppError, Result};
use crate::AppState;

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub is_admin: bool,
}

/// An authenticated caller with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Run the auth gate for this request
pub(crate) async fn resolve_gate(
    headers: &HeaderMap,
    state: &AppState,
) -> AuthGate<TokenSession> {
    let session = TokenSession::new(state.db.clone(), bearer_token(headers));
    let mut gate = AuthGate::new(session);
    gate.refresh().await;
    gate
}

async fn authorize(parts: &Parts, state: &AppState, access: Access) -> Result<CurrentUser> {
    let gate = resolve_gate(&parts.headers, state).await;

    match gate.decide(access, parts.uri.path()) {
        GuardDecision::Allow => {
            let auth = gate.state();
            auth.user_id
                .clone()
                .map(|id| CurrentUser {
                    id,
                    is_admin: auth.is_admin,
                })
                .ok_or(AppError::Unauthorized)
        }
        GuardDecision::Redirect {
            to,
            from: Some(from),
        } => Err(AppError::LoginRequired {
            redirect: to.to_string(),
            from,
        }),
        GuardDecision::Redirect { from: None, .. } => {
            tracing::warn!("Non-admin access attempt on {}", parts.uri.path());
            Err(AppError::Forbidden("Admin access required"))
        }
        GuardDecision::Pending => Err(AppError::Unauthorized),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authorize(parts, state, Access::RequireAuth).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authorize(parts, state, Access::RequireAdmin)
            .await
            .map(AdminUser)
    }
}
