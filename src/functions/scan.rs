use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::functions::{check_location, required};
use crate::geolocation::Coordinates;
use crate::models::{NfcTagRecord, NotificationDetails, PetRecord, ScanRecord};
use crate::routes::bad_json;
use crate::routes::notifications::{notify_user, NotificationText};
use crate::routes::tags::parse_tag_code;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordScanRequest {
    pub tag_code: Option<String>,
    pub location: Option<Coordinates>,
}

fn scan_text(pet_name: String, tag_code: &str, location: Option<Coordinates>) -> NotificationText {
    let text = NotificationText::new("notifications.tag_scanned")
        .arg("pet", pet_name)
        .arg("tag", tag_code);
    match location {
        Some(at) => text
            .message_variant("message_located")
            .arg("latitude", format!("{:.5}", at.latitude))
            .arg("longitude", format!("{:.5}", at.longitude)),
        None => text,
    }
}

/// Log a tag scan and tell the owner where it happened
///
/// POST /functions/record-scan
pub async fn record_scan(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecordScanRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let [tag_code] = required([payload.tag_code.as_deref()])?;
    let tag_code = parse_tag_code(&tag_code)?;
    let location = check_location(payload.location)?;

    let i18n = state.i18n.clone();
    let (scan_id, linked) = db::write(&state.db, move |txn| {
        let tag: NfcTagRecord = {
            let tags = txn.open_table(tables::NFC_TAGS)?;
            db::load(&tags, &tag_code)?.ok_or(AppError::NotFound("Tag"))?
        };

        let scan_id = db::new_id();
        let record = ScanRecord {
            tag_code: tag_code.clone(),
            pet_id: tag.pet_id.clone(),
            location,
            scanned_at: db::now(),
        };
        {
            let mut scans = txn.open_table(tables::NFC_SCANS)?;
            db::store(&mut scans, &scan_id, &record)?;
        }

        let (Some(pet_id), Some(owner_id)) = (tag.pet_id, tag.owner_id) else {
            tracing::debug!("Scan {} of unlinked tag {}", scan_id, tag_code);
            return Ok((scan_id, false));
        };
        let pet_name = {
            let pets = txn.open_table(tables::PETS)?;
            db::load::<PetRecord, _>(&pets, &pet_id)?
                .map(|p| p.name)
                .unwrap_or_default()
        };

        notify_user(
            txn,
            &i18n,
            &owner_id,
            &scan_text(pet_name, &tag_code, location),
            Some(NotificationDetails::TagScan {
                tag_code: tag_code.clone(),
                pet_id: pet_id.clone(),
                location,
            }),
        )?;

        tracing::info!("Tag {} scanned (pet {})", tag_code, pet_id);
        Ok((scan_id, true))
    })
    .await?;

    Ok(Json(json!({
        "message": "Scan recorded",
        "scanId": scan_id,
        "linked": linked,
    })))
}
