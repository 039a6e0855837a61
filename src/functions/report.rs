use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::constants::MAX_LONG_TEXT_LEN;
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::functions::{check_location, required};
use crate::geolocation::Coordinates;
use crate::models::{NfcTagRecord, NotificationDetails, PetRecord, ReportRecord};
use crate::routes::bad_json;
use crate::routes::notifications::{notify_user, NotificationText};
use crate::routes::tags::parse_tag_code;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    pub nfc_id: Option<String>,
    pub details: Option<String>,
    pub location: Option<Coordinates>,
}

/// A finder's report against a scanned tag
///
/// When the tag is linked, the pet's owner is notified.
///
/// POST /functions/submit-report
pub async fn submit_report(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitReportRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let [nfc_id, details] = required([payload.nfc_id.as_deref(), payload.details.as_deref()])?;
    if details.chars().count() > MAX_LONG_TEXT_LEN {
        return Err(AppError::InvalidInput("Report details are too long".to_string()));
    }
    let nfc_id = parse_tag_code(&nfc_id)?;
    let location = check_location(payload.location)?;

    let i18n = state.i18n.clone();
    let (report_id, notified) = db::write(&state.db, move |txn| {
        let tag: NfcTagRecord = {
            let tags = txn.open_table(tables::NFC_TAGS)?;
            db::load(&tags, &nfc_id)?.ok_or(AppError::NotFound("Tag"))?
        };

        let report_id = db::new_id();
        let record = ReportRecord {
            nfc_id: nfc_id.clone(),
            details: details.clone(),
            location,
            created_at: db::now(),
        };
        {
            let mut reports = txn.open_table(tables::REPORTS)?;
            db::store(&mut reports, &report_id, &record)?;
        }

        let (Some(pet_id), Some(owner_id)) = (tag.pet_id, tag.owner_id) else {
            tracing::info!("Report {} filed against unlinked tag {}", report_id, nfc_id);
            return Ok((report_id, false));
        };
        let pet_name = {
            let pets = txn.open_table(tables::PETS)?;
            db::load::<PetRecord, _>(&pets, &pet_id)?
                .map(|p| p.name)
                .unwrap_or_default()
        };

        let text = NotificationText::new("notifications.lost_report")
            .arg("pet", pet_name)
            .arg("details", details);
        notify_user(
            txn,
            &i18n,
            &owner_id,
            &text,
            Some(NotificationDetails::LostReport {
                report_id: report_id.clone(),
                nfc_id: nfc_id.clone(),
            }),
        )?;

        tracing::info!("Report {} filed for pet {}", report_id, pet_id);
        Ok((report_id, true))
    })
    .await?;

    Ok(Json(json!({
        "message": "Report submitted",
        "reportId": report_id,
        "ownerNotified": notified,
    })))
}
