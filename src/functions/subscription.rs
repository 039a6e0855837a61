use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::functions::required;
use crate::models::{
    AdminNotificationKind, NotificationDetails, Plan, Subscription, SubscriptionRecord,
    SubscriptionStatus, UserRecord,
};
use crate::routes::bad_json;
use crate::routes::notifications::{notify_admins, NotificationText};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_id: Option<String>,
    pub plan: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Record a pending plan upgrade and alert the admins
///
/// The plan itself changes only when an admin approves the request.
///
/// POST /functions/create-subscription
pub async fn create_subscription(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let [user_id, plan, start_date, end_date] = required([
        payload.user_id.as_deref(),
        payload.plan.as_deref(),
        payload.start_date.as_deref(),
        payload.end_date.as_deref(),
    ])?;

    let plan: Plan = plan.parse().map_err(AppError::InvalidInput)?;
    if plan == Plan::Free {
        return Err(AppError::InvalidInput(
            "Only paid plans can be requested".to_string(),
        ));
    }
    Subscription::validate_period(&start_date, &end_date).map_err(AppError::InvalidInput)?;

    let i18n = state.i18n.clone();
    let subscription_id = db::write(&state.db, move |txn| {
        let email = {
            let users = txn.open_table(tables::USERS)?;
            db::load::<UserRecord, _>(&users, &user_id)?
                .ok_or(AppError::NotFound("User"))?
                .email
        };

        let subscription_id = db::new_id();
        let record = SubscriptionRecord {
            user_id: user_id.clone(),
            plan,
            start_date: start_date.clone(),
            end_date: end_date.clone(),
            status: SubscriptionStatus::Pending,
            created_at: db::now(),
            decided_at: None,
        };
        {
            let mut subscriptions = txn.open_table(tables::SUBSCRIPTIONS)?;
            db::store(&mut subscriptions, &subscription_id, &record)?;
        }

        let text = NotificationText::new("admin.subscription_request")
            .arg("email", email)
            .localized_arg("plan", format!("plans.{}", plan))
            .arg("start", start_date)
            .arg("end", end_date);
        notify_admins(
            txn,
            &i18n,
            AdminNotificationKind::SubscriptionRequest,
            &text,
            Some(NotificationDetails::Subscription {
                subscription_id: subscription_id.clone(),
                plan,
                status: SubscriptionStatus::Pending,
            }),
        )?;

        tracing::info!(
            "Subscription {} requested by user {} ({} plan)",
            subscription_id,
            user_id,
            plan
        );
        Ok(subscription_id)
    })
    .await?;

    Ok(Json(json!({
        "message": "Subscription request created",
        "subscriptionId": subscription_id,
    })))
}
