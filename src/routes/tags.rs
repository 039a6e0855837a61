use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::auth::{AdminUser, CurrentUser};
use crate::constants::{ERR_INVALID_TAG_CODE, MAX_TAG_BATCH};
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::models::{NfcTag, NfcTagRecord, PetRecord, PublicPetProfile};
use crate::retry::retry_with_backoff;
use crate::routes::bad_json;
use crate::AppState;

/// What anyone scanning a tag is shown
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagLookupResponse {
    pub tag_code: String,
    pub linked: bool,
    pub pet: Option<PublicPetProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTagRequest {
    pub pet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterTagsRequest {
    pub codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterTagsResponse {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Normalize a tag code from the path or body, rejecting malformed ones
pub fn parse_tag_code(raw: &str) -> Result<String> {
    let code = NfcTag::normalize_code(raw);
    if !NfcTag::validate_code(&code) {
        return Err(AppError::InvalidInput(ERR_INVALID_TAG_CODE.to_string()));
    }
    Ok(code)
}

/// Public profile behind a tag
///
/// Unknown tags are 404; registered tags with no pet report `linked: false`.
/// The read is retried with backoff.
///
/// GET /api/tags/:code
pub async fn lookup_tag(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<TagLookupResponse>> {
    let code = parse_tag_code(&code)?;

    let policy = state.retry_policy();
    let lookup = retry_with_backoff(&policy, || {
        let code = code.clone();
        db::read(&state.db, move |txn| {
            let tags = txn.open_table(tables::NFC_TAGS)?;
            let Some(tag) = db::load::<NfcTagRecord, _>(&tags, &code)? else {
                return Ok(None);
            };
            let pet = match &tag.pet_id {
                Some(pet_id) => {
                    let pets = txn.open_table(tables::PETS)?;
                    db::load::<PetRecord, _>(&pets, pet_id)?
                }
                None => None,
            };
            Ok(Some(pet))
        })
    })
    .await?;

    let pet = lookup.ok_or(AppError::NotFound("Tag"))?;

    Ok(Json(TagLookupResponse {
        tag_code: code,
        linked: pet.is_some(),
        pet: pet.as_ref().map(PublicPetProfile::from_record),
    }))
}

/// Tags linked to the caller's pets
///
/// GET /api/tags
pub async fn list_my_tags(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<NfcTag>>> {
    let tags = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::NFC_TAGS)?;
        Ok(db::scan::<NfcTagRecord, _>(&table)?
            .into_iter()
            .filter(|(_, tag)| tag.owner_id.as_deref() == Some(user.id.as_str()))
            .map(|(code, tag)| NfcTag::from_record(code, tag))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(tags))
}

/// Link a free tag to one of the caller's pets
///
/// Relinking a tag to the pet it already points at is a no-op; a tag held
/// by another pet is a 409.
///
/// PUT /api/tags/:code/link
pub async fn link_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(code): Path<String>,
    payload: std::result::Result<Json<LinkTagRequest>, JsonRejection>,
) -> Result<Json<NfcTag>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let code = parse_tag_code(&code)?;
    let pet_id = payload
        .pet_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput("petId is required".to_string()))?;

    let tag = db::write(&state.db, move |txn| {
        let owner_id = {
            let pets = txn.open_table(tables::PETS)?;
            let pet: PetRecord = db::load(&pets, &pet_id)?
                .filter(|p: &PetRecord| p.owner_id == user.id)
                .ok_or(AppError::NotFound("Pet"))?;
            pet.owner_id
        };

        let mut tags = txn.open_table(tables::NFC_TAGS)?;
        let mut tag: NfcTagRecord = db::load(&tags, &code)?.ok_or(AppError::NotFound("Tag"))?;
        match tag.pet_id.as_deref() {
            Some(current) if current == pet_id => {}
            Some(_) => {
                return Err(AppError::Conflict(
                    "Tag is already linked to another pet".to_string(),
                ))
            }
            None => {
                tag.pet_id = Some(pet_id.clone());
                tag.owner_id = Some(owner_id);
                tag.linked_at = Some(db::now());
                db::store(&mut tags, &code, &tag)?;
                tracing::info!("Tag {} linked to pet {}", code, pet_id);
            }
        }
        Ok(NfcTag::from_record(code, tag))
    })
    .await?;

    Ok(Json(tag))
}

/// Release a tag held by one of the caller's pets (admins may release any)
///
/// DELETE /api/tags/:code/link
pub async fn unlink_tag(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<NfcTag>> {
    let code = parse_tag_code(&code)?;

    let tag = db::write(&state.db, move |txn| {
        let mut tags = txn.open_table(tables::NFC_TAGS)?;
        let mut tag: NfcTagRecord = db::load(&tags, &code)?.ok_or(AppError::NotFound("Tag"))?;
        if tag.owner_id.as_deref() != Some(user.id.as_str()) && !user.is_admin {
            return Err(AppError::NotFound("Tag"));
        }
        tag.unlink();
        db::store(&mut tags, &code, &tag)?;
        tracing::info!("Tag {} unlinked", code);
        Ok(NfcTag::from_record(code, tag))
    })
    .await?;

    Ok(Json(tag))
}

/// Every registered tag
///
/// GET /api/admin/tags
pub async fn list_tags(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<NfcTag>>> {
    let tags = db::read(&state.db, |txn| {
        let table = txn.open_table(tables::NFC_TAGS)?;
        Ok(db::scan::<NfcTagRecord, _>(&table)?
            .into_iter()
            .map(|(code, tag)| NfcTag::from_record(code, tag))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(tags))
}

/// Register a batch of new tag codes
///
/// Codes already registered (or repeated in the batch) are skipped.
///
/// POST /api/admin/tags
pub async fn register_tags(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: std::result::Result<Json<RegisterTagsRequest>, JsonRejection>,
) -> Result<Json<RegisterTagsResponse>> {
    let Json(payload) = payload.map_err(bad_json)?;
    if payload.codes.is_empty() || payload.codes.len() > MAX_TAG_BATCH {
        return Err(AppError::InvalidInput(format!(
            "Provide between 1 and {} tag codes",
            MAX_TAG_BATCH
        )));
    }
    let codes = payload
        .codes
        .iter()
        .map(|code| parse_tag_code(code))
        .collect::<Result<Vec<_>>>()?;

    let response = db::write(&state.db, move |txn| {
        let mut tags = txn.open_table(tables::NFC_TAGS)?;
        let now = db::now();
        let mut created = Vec::new();
        let mut skipped = Vec::new();
        for code in codes {
            if tags.get(code.as_str())?.is_some() {
                skipped.push(code);
                continue;
            }
            db::store(&mut tags, &code, &NfcTagRecord::new(now))?;
            created.push(code);
        }
        Ok(RegisterTagsResponse { created, skipped })
    })
    .await?;

    tracing::info!(
        "Registered {} tags ({} skipped)",
        response.created.len(),
        response.skipped.len()
    );

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_code() {
        assert_eq!(parse_tag_code(" pt-0001 ").unwrap(), "PT-0001");
        assert!(matches!(
            parse_tag_code("x y"),
            Err(AppError::InvalidInput(msg)) if msg == ERR_INVALID_TAG_CODE
        ));
    }
}
