use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::models::{
    Interaction, InteractionRecord, LostFoundPost, LostFoundPostRecord, NewInteraction, NewPost,
    NotificationDetails, PostKind, PostStatus, PostUpdate,
};
use crate::routes::notifications::{notify_user, NotificationText};
use crate::routes::bad_json;
use crate::AppState;

const NOT_AUTHOR: &str = "Only the post author may do this";

#[derive(Debug, Deserialize)]
pub struct PostFilter {
    pub kind: Option<PostKind>,
}

fn load_post(
    posts: &impl redb::ReadableTable<&'static str, &'static [u8]>,
    post_id: &str,
) -> Result<LostFoundPostRecord> {
    db::load(posts, post_id)?.ok_or(AppError::NotFound("Post"))
}

/// Open posts, newest first, optionally filtered by kind
///
/// GET /api/lost-found?kind=lost
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<Vec<LostFoundPost>>> {
    let posts = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::LOST_FOUND_POSTS)?;
        let mut posts: Vec<(String, LostFoundPostRecord)> =
            db::scan::<LostFoundPostRecord, _>(&table)?
                .into_iter()
                .filter(|(_, p)| p.status == PostStatus::Open)
                .filter(|(_, p)| filter.kind.map_or(true, |kind| p.kind == kind))
                .collect();
        posts.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(posts
            .into_iter()
            .map(|(id, record)| LostFoundPost::from_record(id, record))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(posts))
}

/// GET /api/lost-found/:id
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<LostFoundPost>> {
    let post = db::read(&state.db, move |txn| {
        let posts = txn.open_table(tables::LOST_FOUND_POSTS)?;
        let record = load_post(&posts, &post_id)?;
        Ok(LostFoundPost::from_record(post_id, record))
    })
    .await?;

    Ok(Json(post))
}

/// POST /api/lost-found
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: std::result::Result<Json<NewPost>, JsonRejection>,
) -> Result<Json<LostFoundPost>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let record = payload
        .into_record(&user.id, db::now())
        .map_err(AppError::InvalidInput)?;

    let post = db::write(&state.db, move |txn| {
        let mut posts = txn.open_table(tables::LOST_FOUND_POSTS)?;
        let post_id = db::new_id();
        db::store(&mut posts, &post_id, &record)?;
        tracing::info!("Lost & found post {} ({:?}) created", post_id, record.kind);
        Ok(LostFoundPost::from_record(post_id, record))
    })
    .await?;

    Ok(Json(post))
}

/// Edit or resolve a post (author only)
///
/// PUT /api/lost-found/:id
pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    payload: std::result::Result<Json<PostUpdate>, JsonRejection>,
) -> Result<Json<LostFoundPost>> {
    let Json(update) = payload.map_err(bad_json)?;

    let post = db::write(&state.db, move |txn| {
        let mut posts = txn.open_table(tables::LOST_FOUND_POSTS)?;
        let mut record = load_post(&posts, &post_id)?;
        if record.author_id != user.id {
            return Err(AppError::Forbidden(NOT_AUTHOR));
        }
        update
            .apply(&mut record, db::now())
            .map_err(AppError::InvalidInput)?;
        db::store(&mut posts, &post_id, &record)?;
        Ok(LostFoundPost::from_record(post_id, record))
    })
    .await?;

    Ok(Json(post))
}

/// Delete a post and its interactions (author or admin)
///
/// DELETE /api/lost-found/:id
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    db::write(&state.db, move |txn| {
        let mut posts = txn.open_table(tables::LOST_FOUND_POSTS)?;
        let record = load_post(&posts, &post_id)?;
        if record.author_id != user.id && !user.is_admin {
            return Err(AppError::Forbidden(NOT_AUTHOR));
        }
        posts.remove(post_id.as_str())?;

        let mut interactions = txn.open_table(tables::LOST_FOUND_INTERACTIONS)?;
        let stale: Vec<String> = db::scan::<InteractionRecord, _>(&interactions)?
            .into_iter()
            .filter(|(_, i)| i.post_id == post_id)
            .map(|(id, _)| id)
            .collect();
        for id in &stale {
            interactions.remove(id.as_str())?;
        }

        tracing::info!(
            "Lost & found post {} deleted with {} interactions",
            post_id,
            stale.len()
        );
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "message": "Post deleted" })))
}

/// Submit a tip, claim or sighting on an open post
///
/// The post author is notified.
///
/// POST /api/lost-found/:id/interactions
pub async fn create_interaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    payload: std::result::Result<Json<NewInteraction>, JsonRejection>,
) -> Result<Json<Interaction>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let record = payload
        .into_record(&post_id, &user.id, db::now())
        .map_err(AppError::InvalidInput)?;

    let i18n = state.i18n.clone();
    let interaction = db::write(&state.db, move |txn| {
        let author_id = {
            let posts = txn.open_table(tables::LOST_FOUND_POSTS)?;
            let post = load_post(&posts, &post_id)?;
            if post.status != PostStatus::Open {
                return Err(AppError::InvalidInput("Post is resolved".to_string()));
            }
            post.author_id
        };

        let interaction_id = db::new_id();
        {
            let mut interactions = txn.open_table(tables::LOST_FOUND_INTERACTIONS)?;
            db::store(&mut interactions, &interaction_id, &record)?;
        }

        let text = NotificationText::new("notifications.interaction")
            .localized_arg("kind", format!("interactions.kind.{}", record.kind.as_str()))
            .arg("message", record.message.clone());
        notify_user(
            txn,
            &i18n,
            &author_id,
            &text,
            Some(NotificationDetails::Interaction {
                post_id: post_id.clone(),
                interaction_id: interaction_id.clone(),
                kind: record.kind,
            }),
        )?;

        Ok(Interaction::from_record(interaction_id, record))
    })
    .await?;

    Ok(Json(interaction))
}

/// Interactions on a post, visible to its author and admins
///
/// GET /api/lost-found/:id/interactions
pub async fn list_interactions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Interaction>>> {
    let interactions = db::read(&state.db, move |txn| {
        let posts = txn.open_table(tables::LOST_FOUND_POSTS)?;
        let post = load_post(&posts, &post_id)?;
        if post.author_id != user.id && !user.is_admin {
            return Err(AppError::Forbidden(NOT_AUTHOR));
        }

        let table = txn.open_table(tables::LOST_FOUND_INTERACTIONS)?;
        let mut records: Vec<(String, InteractionRecord)> =
            db::scan::<InteractionRecord, _>(&table)?
                .into_iter()
                .filter(|(_, i)| i.post_id == post_id)
                .collect();
        records.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(records
            .into_iter()
            .map(|(id, record)| Interaction::from_record(id, record))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(interactions))
}
