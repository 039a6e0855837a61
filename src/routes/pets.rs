use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use redb::Database;
use serde::Serialize;
use std::fmt::Display;

use crate::auth::CurrentUser;
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::models::{
    NewPet, NfcTagRecord, Pet, PetRecord, PetUpdate, Plan, Report, ReportRecord, Scan, ScanRecord,
    UserRecord,
};
use crate::routes::bad_json;
use crate::AppState;

/// Why a quota-checked pet creation failed
///
/// An unauthenticated caller never reaches this point; the `CurrentUser`
/// extractor rejects it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetCreateError {
    PlanLookupFailed,
    CountFailed,
    QuotaExceeded { plan: Plan, limit: u32 },
    InsertFailed,
}

impl From<PetCreateError> for AppError {
    fn from(err: PetCreateError) -> Self {
        match err {
            PetCreateError::PlanLookupFailed => AppError::PlanLookupFailed,
            PetCreateError::CountFailed => AppError::CountFailed,
            PetCreateError::QuotaExceeded { plan, limit } => AppError::QuotaExceeded { plan, limit },
            PetCreateError::InsertFailed => AppError::InsertFailed,
        }
    }
}

/// Log the underlying error and report the failed step
fn failed_at<E: Display>(step: PetCreateError) -> impl Fn(E) -> PetCreateError {
    move |err| {
        tracing::error!("Pet creation failed ({:?}): {}", step, err);
        step
    }
}

/// Insert a pet if the owner's plan allows another one
///
/// Plan lookup, count and insert share one write transaction. redb admits a
/// single writer at a time, so concurrent creations for the same owner are
/// serialized and cannot both pass the check.
pub fn insert_pet_checked(
    db: &Database,
    owner_id: &str,
    record: PetRecord,
) -> std::result::Result<(String, PetRecord), PetCreateError> {
    let write_txn = db
        .begin_write()
        .map_err(failed_at(PetCreateError::InsertFailed))?;

    let pet_id = db::new_id();
    {
        // 1. Plan lookup
        let users = write_txn
            .open_table(tables::USERS)
            .map_err(failed_at(PetCreateError::PlanLookupFailed))?;
        let plan = db::load::<UserRecord, _>(&users, owner_id)
            .map_err(failed_at(PetCreateError::PlanLookupFailed))?
            .map(|user| user.plan)
            .ok_or_else(|| {
                tracing::error!("Pet creation for unknown user: {}", owner_id);
                PetCreateError::PlanLookupFailed
            })?;

        // 2. Count existing pets
        let mut owner_pets = write_txn
            .open_table(tables::OWNER_PETS)
            .map_err(failed_at(PetCreateError::CountFailed))?;
        let mut pet_ids: Vec<String> = db::load(&owner_pets, owner_id)
            .map_err(failed_at(PetCreateError::CountFailed))?
            .unwrap_or_default();

        // 3. Enforce the plan limit
        if let Some(limit) = plan.pet_limit() {
            let used = u32::try_from(pet_ids.len()).unwrap_or(u32::MAX);
            if used >= limit {
                tracing::info!(
                    "Pet quota reached for user {}: {}/{} ({} plan)",
                    owner_id,
                    used,
                    limit,
                    plan
                );
                return Err(PetCreateError::QuotaExceeded { plan, limit });
            }
        }

        // 4. Insert and index
        let mut pets = write_txn
            .open_table(tables::PETS)
            .map_err(failed_at(PetCreateError::InsertFailed))?;
        db::store(&mut pets, &pet_id, &record).map_err(failed_at(PetCreateError::InsertFailed))?;

        pet_ids.push(pet_id.clone());
        db::store(&mut owner_pets, owner_id, &pet_ids)
            .map_err(failed_at(PetCreateError::InsertFailed))?;
    }
    write_txn
        .commit()
        .map_err(failed_at(PetCreateError::InsertFailed))?;

    Ok((pet_id, record))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub plan: Plan,
    /// `None` when the plan is unbounded
    pub limit: Option<u32>,
    pub used: u32,
    pub remaining: Option<u32>,
}

/// Load a pet the caller may manage (owner or admin)
fn load_owned_pet(
    pets: &impl redb::ReadableTable<&'static str, &'static [u8]>,
    pet_id: &str,
    user: &CurrentUser,
) -> Result<PetRecord> {
    let pet: PetRecord = db::load(pets, pet_id)?.ok_or(AppError::NotFound("Pet"))?;
    if pet.owner_id != user.id && !user.is_admin {
        // Do not reveal other owners' pets
        return Err(AppError::NotFound("Pet"));
    }
    Ok(pet)
}

/// Create a pet, enforcing the caller's plan quota
///
/// POST /api/pets
pub async fn create_pet(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: std::result::Result<Json<NewPet>, JsonRejection>,
) -> Result<Json<Pet>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let record = payload
        .into_record(&user.id, db::now())
        .map_err(AppError::InvalidInput)?;

    let db = state.db.clone();
    let owner_id = user.id.clone();
    let (pet_id, record) =
        tokio::task::spawn_blocking(move || insert_pet_checked(&db, &owner_id, record)).await??;

    tracing::info!("Pet {} created for user {}", pet_id, user.id);

    Ok(Json(Pet::from_record(pet_id, record)))
}

/// List the caller's pets
///
/// GET /api/pets
pub async fn list_pets(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Pet>>> {
    let pets = db::read(&state.db, move |txn| {
        let owner_pets = txn.open_table(tables::OWNER_PETS)?;
        let pet_ids: Vec<String> = db::load(&owner_pets, &user.id)?.unwrap_or_default();

        let pets_table = txn.open_table(tables::PETS)?;
        let mut pets = Vec::with_capacity(pet_ids.len());
        for pet_id in pet_ids {
            if let Some(record) = db::load::<PetRecord, _>(&pets_table, &pet_id)? {
                pets.push(Pet::from_record(pet_id, record));
            }
        }
        Ok(pets)
    })
    .await?;

    Ok(Json(pets))
}

/// GET /api/pets/quota
pub async fn pet_quota(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<QuotaResponse>> {
    let (plan, used) = db::read(&state.db, move |txn| {
        let users = txn.open_table(tables::USERS)?;
        let plan = db::load::<UserRecord, _>(&users, &user.id)?
            .map(|u| u.plan)
            .ok_or(AppError::PlanLookupFailed)?;

        let owner_pets = txn.open_table(tables::OWNER_PETS)?;
        let pet_ids: Vec<String> = db::load(&owner_pets, &user.id)?.unwrap_or_default();
        Ok((plan, u32::try_from(pet_ids.len()).unwrap_or(u32::MAX)))
    })
    .await?;

    let limit = plan.pet_limit();
    Ok(Json(QuotaResponse {
        plan,
        limit,
        used,
        remaining: limit.map(|l| l.saturating_sub(used)),
    }))
}

/// GET /api/pets/:id
pub async fn get_pet(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pet_id): Path<String>,
) -> Result<Json<Pet>> {
    let pet = db::read(&state.db, move |txn| {
        let pets = txn.open_table(tables::PETS)?;
        let record = load_owned_pet(&pets, &pet_id, &user)?;
        Ok(Pet::from_record(pet_id, record))
    })
    .await?;

    Ok(Json(pet))
}

/// PUT /api/pets/:id
pub async fn update_pet(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pet_id): Path<String>,
    payload: std::result::Result<Json<PetUpdate>, JsonRejection>,
) -> Result<Json<Pet>> {
    let Json(update) = payload.map_err(bad_json)?;

    let pet = db::write(&state.db, move |txn| {
        let mut pets = txn.open_table(tables::PETS)?;
        let mut record = load_owned_pet(&pets, &pet_id, &user)?;
        update
            .apply(&mut record, db::now())
            .map_err(AppError::InvalidInput)?;
        db::store(&mut pets, &pet_id, &record)?;
        Ok(Pet::from_record(pet_id, record))
    })
    .await?;

    Ok(Json(pet))
}

/// Delete a pet, free its quota slot and unlink its tags
///
/// DELETE /api/pets/:id
pub async fn delete_pet(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pet_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let unlinked = db::write(&state.db, move |txn| {
        let mut pets = txn.open_table(tables::PETS)?;
        let record = load_owned_pet(&pets, &pet_id, &user)?;
        pets.remove(pet_id.as_str())?;
        drop(pets);

        let mut owner_pets = txn.open_table(tables::OWNER_PETS)?;
        let mut pet_ids: Vec<String> =
            db::load(&owner_pets, &record.owner_id)?.unwrap_or_default();
        pet_ids.retain(|id| *id != pet_id);
        db::store(&mut owner_pets, &record.owner_id, &pet_ids)?;
        drop(owner_pets);

        let mut tags = txn.open_table(tables::NFC_TAGS)?;
        let linked: Vec<(String, NfcTagRecord)> = db::scan::<NfcTagRecord, _>(&tags)?
            .into_iter()
            .filter(|(_, tag)| tag.pet_id.as_deref() == Some(pet_id.as_str()))
            .collect();
        for (code, mut tag) in linked.iter().cloned() {
            tag.unlink();
            db::store(&mut tags, &code, &tag)?;
        }

        tracing::info!("Pet {} deleted, {} tags unlinked", pet_id, linked.len());
        Ok(linked.len())
    })
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Pet deleted",
        "unlinkedTags": unlinked,
    })))
}

/// Scan history of one pet, newest first
///
/// GET /api/pets/:id/scans
pub async fn list_pet_scans(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pet_id): Path<String>,
) -> Result<Json<Vec<Scan>>> {
    let scans = db::read(&state.db, move |txn| {
        let pets = txn.open_table(tables::PETS)?;
        load_owned_pet(&pets, &pet_id, &user)?;

        let scans_table = txn.open_table(tables::NFC_SCANS)?;
        let mut scans: Vec<(String, ScanRecord)> = db::scan::<ScanRecord, _>(&scans_table)?
            .into_iter()
            .filter(|(_, scan)| scan.pet_id.as_deref() == Some(pet_id.as_str()))
            .collect();
        scans.sort_by(|a, b| b.1.scanned_at.cmp(&a.1.scanned_at));
        Ok(scans
            .into_iter()
            .map(|(id, record)| Scan::from_record(id, record))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(scans))
}

/// Finder reports filed against the pet's tags, newest first
///
/// GET /api/pets/:id/reports
pub async fn list_pet_reports(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pet_id): Path<String>,
) -> Result<Json<Vec<Report>>> {
    let reports = db::read(&state.db, move |txn| {
        let pets = txn.open_table(tables::PETS)?;
        load_owned_pet(&pets, &pet_id, &user)?;

        // Reports reference tag codes; resolve which codes point at this pet
        let tags = txn.open_table(tables::NFC_TAGS)?;
        let codes: Vec<String> = db::scan::<NfcTagRecord, _>(&tags)?
            .into_iter()
            .filter(|(_, tag)| tag.pet_id.as_deref() == Some(pet_id.as_str()))
            .map(|(code, _)| code)
            .collect();

        let reports_table = txn.open_table(tables::REPORTS)?;
        let mut reports: Vec<(String, ReportRecord)> =
            db::scan::<ReportRecord, _>(&reports_table)?
                .into_iter()
                .filter(|(_, report)| codes.contains(&report.nfc_id))
                .collect();
        reports.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(reports
            .into_iter()
            .map(|(id, record)| Report::from_record(id, record))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicalInfo, Role, Theme};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn seed_user(db: &Database, user_id: &str, plan: Plan) {
        let write_txn = db.begin_write().unwrap();
        {
            let mut users = write_txn.open_table(tables::USERS).unwrap();
            let record = UserRecord {
                email: format!("{}@pettouch.test", user_id),
                password_hash: String::new(),
                role: Role::User,
                plan,
                language: "en".into(),
                theme: Theme::System,
                created_at: 0,
            };
            db::store(&mut users, user_id, &record).unwrap();
        }
        write_txn.commit().unwrap();
    }

    fn pet(owner_id: &str, name: &str) -> PetRecord {
        NewPet {
            name: name.into(),
            species: "dog".into(),
            breed: None,
            birth_date: None,
            color: None,
            description: None,
            medical: MedicalInfo::default(),
        }
        .into_record(owner_id, 0)
        .unwrap()
    }

    #[test]
    fn test_free_plan_allows_one_pet() {
        let temp_dir = TempDir::new().unwrap();
        let db = db::open_database(temp_dir.path().join("test.db")).unwrap();
        seed_user(&db, "u1", Plan::Free);

        assert!(insert_pet_checked(&db, "u1", pet("u1", "Rex")).is_ok());
        let err = insert_pet_checked(&db, "u1", pet("u1", "Max")).unwrap_err();
        assert_eq!(
            err,
            PetCreateError::QuotaExceeded {
                plan: Plan::Free,
                limit: 1
            }
        );
        assert!(AppError::from(err).to_string().contains("free"));
    }

    #[test]
    fn test_pro_plan_is_unbounded() {
        let temp_dir = TempDir::new().unwrap();
        let db = db::open_database(temp_dir.path().join("test.db")).unwrap();
        seed_user(&db, "u1", Plan::Pro);

        for i in 0..25 {
            assert!(insert_pet_checked(&db, "u1", pet("u1", &format!("Pet {}", i))).is_ok());
        }
    }

    #[test]
    fn test_unknown_owner_fails_plan_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let db = db::open_database(temp_dir.path().join("test.db")).unwrap();

        assert_eq!(
            insert_pet_checked(&db, "ghost", pet("ghost", "Rex")).unwrap_err(),
            PetCreateError::PlanLookupFailed
        );
    }

    #[test]
    fn test_concurrent_creations_respect_quota() {
        let temp_dir = TempDir::new().unwrap();
        let db = db::open_database(temp_dir.path().join("test.db")).unwrap();
        seed_user(&db, "u1", Plan::Premium);

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    insert_pet_checked(&db, "u1", pet("u1", &format!("Pet {}", i))).is_ok()
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(created, 5);
    }
}
