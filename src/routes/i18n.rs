use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::AppState;

/// Loaded locales and the default
///
/// GET /api/i18n
pub async fn list_locales(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "default": state.i18n.default_locale(),
        "locales": state.i18n.locales(),
    }))
}

/// Flattened catalogue of one locale
///
/// GET /api/i18n/:locale
pub async fn get_catalog(
    State(state): State<AppState>,
    Path(locale): Path<String>,
) -> Result<Json<BTreeMap<String, String>>> {
    state
        .i18n
        .catalog(&locale)
        .cloned()
        .map(Json)
        .ok_or(AppError::NotFound("Locale"))
}
