use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::auth::{AdminUser, CurrentUser};
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::models::{
    NotificationDetails, Subscription, SubscriptionRecord, SubscriptionStatus, UserRecord,
};
use crate::routes::notifications::{notify_user, NotificationText};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscriptionFilter {
    pub status: Option<SubscriptionStatus>,
}

fn newest_first(mut subscriptions: Vec<(String, SubscriptionRecord)>) -> Vec<Subscription> {
    subscriptions.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
    subscriptions
        .into_iter()
        .map(|(id, record)| Subscription::from_record(id, record))
        .collect()
}

/// The caller's subscription requests
///
/// GET /api/subscriptions
pub async fn list_my_subscriptions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Subscription>>> {
    let subscriptions = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::SUBSCRIPTIONS)?;
        let mine = db::scan::<SubscriptionRecord, _>(&table)?
            .into_iter()
            .filter(|(_, s)| s.user_id == user.id)
            .collect();
        Ok(newest_first(mine))
    })
    .await?;

    Ok(Json(subscriptions))
}

/// GET /api/admin/subscriptions?status=pending
pub async fn list_subscriptions(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<SubscriptionFilter>,
) -> Result<Json<Vec<Subscription>>> {
    let subscriptions = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::SUBSCRIPTIONS)?;
        let matching = db::scan::<SubscriptionRecord, _>(&table)?
            .into_iter()
            .filter(|(_, s)| filter.status.map_or(true, |status| s.status == status))
            .collect();
        Ok(newest_first(matching))
    })
    .await?;

    Ok(Json(subscriptions))
}

/// Approve or reject a pending request
///
/// Approval activates the subscription and moves the user onto its plan in
/// the same transaction. The user is notified either way.
async fn decide(
    state: AppState,
    subscription_id: String,
    status: SubscriptionStatus,
) -> Result<Subscription> {
    let i18n = state.i18n.clone();
    db::write(&state.db, move |txn| {
        let record = {
            let mut subscriptions = txn.open_table(tables::SUBSCRIPTIONS)?;
            let mut record: SubscriptionRecord = db::load(&subscriptions, &subscription_id)?
                .ok_or(AppError::NotFound("Subscription"))?;
            if record.status != SubscriptionStatus::Pending {
                return Err(AppError::Conflict(format!(
                    "Subscription is already {}",
                    record.status.as_str()
                )));
            }
            record.status = status;
            record.decided_at = Some(db::now());
            db::store(&mut subscriptions, &subscription_id, &record)?;
            record
        };

        let text = if status == SubscriptionStatus::Active {
            let mut users = txn.open_table(tables::USERS)?;
            let mut user: UserRecord =
                db::load(&users, &record.user_id)?.ok_or(AppError::NotFound("User"))?;
            user.plan = record.plan;
            db::store(&mut users, &record.user_id, &user)?;

            NotificationText::new("notifications.subscription_approved")
                .localized_arg("plan", format!("plans.{}", record.plan))
                .arg("end", record.end_date.clone())
        } else {
            NotificationText::new("notifications.subscription_rejected")
                .localized_arg("plan", format!("plans.{}", record.plan))
        };

        notify_user(
            txn,
            &i18n,
            &record.user_id,
            &text,
            Some(NotificationDetails::Subscription {
                subscription_id: subscription_id.clone(),
                plan: record.plan,
                status,
            }),
        )?;

        tracing::info!(
            "Subscription {} for user {} is now {}",
            subscription_id,
            record.user_id,
            status.as_str()
        );
        Ok(Subscription::from_record(subscription_id, record))
    })
    .await
}

/// PUT /api/admin/subscriptions/:id/approve
pub async fn approve_subscription(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(subscription_id): Path<String>,
) -> Result<Json<Subscription>> {
    decide(state, subscription_id, SubscriptionStatus::Active)
        .await
        .map(Json)
}

/// PUT /api/admin/subscriptions/:id/reject
pub async fn reject_subscription(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(subscription_id): Path<String>,
) -> Result<Json<Subscription>> {
    decide(state, subscription_id, SubscriptionStatus::Rejected)
        .await
        .map(Json)
}
