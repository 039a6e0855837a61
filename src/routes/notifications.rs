use axum::{
    extract::{Path, State},
    Json,
};
use redb::WriteTransaction;
use serde_json::{json, Value};

use crate::auth::{AdminUser, CurrentUser};
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::i18n::Translator;
use crate::models::{
    AdminNotificationKind, AdminNotificationRecord, Notification, NotificationDetails,
    NotificationRecord, UserRecord,
};
use crate::AppState;

/// Title and message of a notification, as catalogue keys plus arguments
///
/// Rendered at insert time in the recipient's locale. Localized arguments
/// are themselves catalogue keys (e.g. `plans.premium`) translated into
/// that same locale before interpolation.
#[derive(Debug, Clone)]
pub struct NotificationText {
    key: String,
    message_key: String,
    args: Vec<(&'static str, String)>,
    localized_args: Vec<(&'static str, String)>,
}

impl NotificationText {
    /// Use `<key>.title` and `<key>.message`
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            message_key: format!("{}.message", key),
            args: Vec::new(),
            localized_args: Vec::new(),
        }
    }

    /// Use `<key>.<name>` as the message instead of `<key>.message`
    pub fn message_variant(mut self, name: &str) -> Self {
        self.message_key = format!("{}.{}", self.key, name);
        self
    }

    pub fn arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    pub fn localized_arg(mut self, name: &'static str, key: impl Into<String>) -> Self {
        self.localized_args.push((name, key.into()));
        self
    }

    pub fn render(&self, i18n: &Translator, locale: &str) -> (String, String) {
        let mut args = self.args.clone();
        for (name, key) in &self.localized_args {
            args.push((*name, i18n.translate(locale, key, &[])));
        }
        let args: Vec<(&str, &str)> = args.iter().map(|(n, v)| (*n, v.as_str())).collect();

        (
            i18n.translate(locale, &format!("{}.title", self.key), &args),
            i18n.translate(locale, &self.message_key, &args),
        )
    }
}

/// Insert a notification for `user_id`, rendered in the user's language
///
/// Opens the users and notifications tables itself; the caller must not hold
/// either open in `txn`.
pub fn notify_user(
    txn: &WriteTransaction,
    i18n: &Translator,
    user_id: &str,
    text: &NotificationText,
    details: Option<NotificationDetails>,
) -> Result<String> {
    let locale = {
        let users = txn.open_table(tables::USERS)?;
        db::load::<UserRecord, _>(&users, user_id)?
            .map(|u| u.language)
            .unwrap_or_else(|| i18n.default_locale().to_string())
    };
    let (title, message) = text.render(i18n, &locale);

    let record = NotificationRecord {
        user_id: user_id.to_string(),
        title,
        message,
        details,
        read: false,
        created_at: db::now(),
    };

    let id = db::new_id();
    let mut notifications = txn.open_table(tables::NOTIFICATIONS)?;
    db::store(&mut notifications, &id, &record)?;

    tracing::debug!("Notification {} ({}) queued for user {}", id, text.key, user_id);
    Ok(id)
}

/// Insert an admin back-office notification, rendered in the default locale
pub fn notify_admins(
    txn: &WriteTransaction,
    i18n: &Translator,
    kind: AdminNotificationKind,
    text: &NotificationText,
    details: Option<NotificationDetails>,
) -> Result<String> {
    let (title, message) = text.render(i18n, i18n.default_locale());
    let record = AdminNotificationRecord {
        kind,
        title,
        message,
        details,
        read: false,
        created_at: db::now(),
    };

    let id = db::new_id();
    let mut notifications = txn.open_table(tables::ADMIN_NOTIFICATIONS)?;
    db::store(&mut notifications, &id, &record)?;

    tracing::info!("Admin notification {} ({:?})", id, kind);
    Ok(id)
}

/// List the caller's notifications, newest first
///
/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Notification>>> {
    let notifications = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::NOTIFICATIONS)?;
        let mut records: Vec<(String, NotificationRecord)> =
            db::scan::<NotificationRecord, _>(&table)?
                .into_iter()
                .filter(|(_, n)| n.user_id == user.id)
                .collect();
        records.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(records
            .into_iter()
            .map(|(id, record)| Notification::from_record(id, record))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(notifications))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Value>> {
    let count = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::NOTIFICATIONS)?;
        Ok(db::scan::<NotificationRecord, _>(&table)?
            .into_iter()
            .filter(|(_, n)| n.user_id == user.id && !n.read)
            .count())
    })
    .await?;

    Ok(Json(json!({ "unread": count })))
}

/// PUT /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>> {
    let notification = db::write(&state.db, move |txn| {
        let mut table = txn.open_table(tables::NOTIFICATIONS)?;
        let mut record: NotificationRecord = db::load(&table, &notification_id)?
            .filter(|n: &NotificationRecord| n.user_id == user.id)
            .ok_or(AppError::NotFound("Notification"))?;
        record.read = true;
        db::store(&mut table, &notification_id, &record)?;
        Ok(Notification::from_record(notification_id, record))
    })
    .await?;

    Ok(Json(notification))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Value>> {
    let updated = db::write(&state.db, move |txn| {
        let mut table = txn.open_table(tables::NOTIFICATIONS)?;
        let unread: Vec<(String, NotificationRecord)> = db::scan::<NotificationRecord, _>(&table)?
            .into_iter()
            .filter(|(_, n)| n.user_id == user.id && !n.read)
            .collect();
        for (id, mut record) in unread.iter().cloned() {
            record.read = true;
            db::store(&mut table, &id, &record)?;
        }
        Ok(unread.len())
    })
    .await?;

    Ok(Json(json!({
        "message": "Notifications marked as read",
        "updated": updated,
    })))
}

/// GET /api/admin/notifications
pub async fn list_admin_notifications(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Notification>>> {
    let notifications = db::read(&state.db, |txn| {
        let table = txn.open_table(tables::ADMIN_NOTIFICATIONS)?;
        let mut records = db::scan::<AdminNotificationRecord, _>(&table)?;
        records.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(records
            .into_iter()
            .map(|(id, record)| Notification::from_admin_record(id, record))
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(notifications))
}

/// PUT /api/admin/notifications/:id/read
pub async fn mark_admin_read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>> {
    let notification = db::write(&state.db, move |txn| {
        let mut table = txn.open_table(tables::ADMIN_NOTIFICATIONS)?;
        let mut record: AdminNotificationRecord = db::load(&table, &notification_id)?
            .ok_or(AppError::NotFound("Notification"))?;
        record.read = true;
        db::store(&mut table, &notification_id, &record)?;
        Ok(Notification::from_admin_record(notification_id, record))
    })
    .await?;

    Ok(Json(notification))
}
