use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::auth::AdminUser;
use crate::db::{self, tables, RecordTable};
use crate::error::{AppError, Result};
use crate::models::{Article, ArticleRecord, ArticleUpdate, NewArticle};
use crate::routes::bad_json;
use crate::AppState;

/// Reject a slug already used by another article
fn ensure_unique_slug(articles: &RecordTable<'_>, slug: &str, except: Option<&str>) -> Result<()> {
    let taken = db::scan::<ArticleRecord, _>(articles)?
        .into_iter()
        .any(|(id, a)| a.slug == slug && Some(id.as_str()) != except);
    if taken {
        return Err(AppError::Conflict(format!(
            "An article with slug '{}' already exists",
            slug
        )));
    }
    Ok(())
}

fn sorted_newest_first(mut articles: Vec<(String, ArticleRecord)>) -> Vec<Article> {
    articles.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
    articles
        .into_iter()
        .map(|(id, record)| Article::from_record(id, record))
        .collect()
}

/// Published articles, newest first
///
/// GET /api/articles
pub async fn list_published(State(state): State<AppState>) -> Result<Json<Vec<Article>>> {
    let articles = db::read(&state.db, |txn| {
        let table = txn.open_table(tables::ARTICLES)?;
        let published = db::scan::<ArticleRecord, _>(&table)?
            .into_iter()
            .filter(|(_, a)| a.published)
            .collect();
        Ok(sorted_newest_first(published))
    })
    .await?;

    Ok(Json(articles))
}

/// GET /api/articles/:slug
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Article>> {
    let article = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::ARTICLES)?;
        db::scan::<ArticleRecord, _>(&table)?
            .into_iter()
            .find(|(_, a)| a.published && a.slug == slug)
            .map(|(id, record)| Article::from_record(id, record))
            .ok_or(AppError::NotFound("Article"))
    })
    .await?;

    Ok(Json(article))
}

/// All articles including drafts
///
/// GET /api/admin/articles
pub async fn list_all(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<Article>>> {
    let articles = db::read(&state.db, |txn| {
        let table = txn.open_table(tables::ARTICLES)?;
        Ok(sorted_newest_first(db::scan::<ArticleRecord, _>(&table)?))
    })
    .await?;

    Ok(Json(articles))
}

/// POST /api/admin/articles
pub async fn create_article(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: std::result::Result<Json<NewArticle>, JsonRejection>,
) -> Result<Json<Article>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let record = payload
        .into_record(&admin.id, db::now())
        .map_err(AppError::InvalidInput)?;

    let article = db::write(&state.db, move |txn| {
        let mut articles = txn.open_table(tables::ARTICLES)?;
        ensure_unique_slug(&articles, &record.slug, None)?;
        let id = db::new_id();
        db::store(&mut articles, &id, &record)?;
        tracing::info!("Article {} created ({})", id, record.slug);
        Ok(Article::from_record(id, record))
    })
    .await?;

    Ok(Json(article))
}

/// PUT /api/admin/articles/:id
pub async fn update_article(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(article_id): Path<String>,
    payload: std::result::Result<Json<ArticleUpdate>, JsonRejection>,
) -> Result<Json<Article>> {
    let Json(update) = payload.map_err(bad_json)?;

    let article = db::write(&state.db, move |txn| {
        let mut articles = txn.open_table(tables::ARTICLES)?;
        let mut record: ArticleRecord =
            db::load(&articles, &article_id)?.ok_or(AppError::NotFound("Article"))?;
        update
            .apply(&mut record, db::now())
            .map_err(AppError::InvalidInput)?;
        ensure_unique_slug(&articles, &record.slug, Some(&article_id))?;
        db::store(&mut articles, &article_id, &record)?;
        Ok(Article::from_record(article_id, record))
    })
    .await?;

    Ok(Json(article))
}

/// DELETE /api/admin/articles/:id
pub async fn delete_article(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(article_id): Path<String>,
) -> Result<Json<Value>> {
    db::write(&state.db, move |txn| {
        let mut articles = txn.open_table(tables::ARTICLES)?;
        if articles.remove(article_id.as_str())?.is_none() {
            return Err(AppError::NotFound("Article"));
        }
        tracing::info!("Article {} deleted", article_id);
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "message": "Article deleted" })))
}
