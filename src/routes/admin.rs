use axum::{extract::State, Json};
use redb::ReadableTableMetadata;
use serde::Serialize;
use std::fs;

use crate::auth::AdminUser;
use crate::db::{self, tables};
use crate::error::Result;
use crate::models::{
    AdminNotificationRecord, LostFoundPostRecord, NfcTagRecord, OrderRecord, OrderStatus,
    PostStatus, SubscriptionRecord, SubscriptionStatus,
};
use crate::retry::retry_with_backoff;
use crate::AppState;

/// Back-office dashboard counters
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user_count: u64,
    pub pet_count: u64,
    pub linked_tag_count: u64,
    pub scan_count: u64,
    pub open_post_count: u64,
    pub pending_subscription_count: u64,
    pub order_count: u64,
    /// Sum of all non-cancelled order totals
    pub revenue_cents: u64,
    pub unread_admin_notification_count: u64,
    pub database_size_bytes: u64,
    pub database_size_human: String,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn count<T>(records: &[(String, T)], pred: impl Fn(&T) -> bool) -> u64 {
    records.iter().filter(|(_, r)| pred(r)).count() as u64
}

/// Read every counter in one read transaction
fn collect_counts(txn: &redb::ReadTransaction) -> Result<DashboardResponse> {
    let user_count = txn.open_table(tables::USERS)?.len()?;
    let pet_count = txn.open_table(tables::PETS)?.len()?;
    let scan_count = txn.open_table(tables::NFC_SCANS)?.len()?;

    let tags = db::scan::<NfcTagRecord, _>(&txn.open_table(tables::NFC_TAGS)?)?;
    let posts = db::scan::<LostFoundPostRecord, _>(&txn.open_table(tables::LOST_FOUND_POSTS)?)?;
    let subscriptions =
        db::scan::<SubscriptionRecord, _>(&txn.open_table(tables::SUBSCRIPTIONS)?)?;
    let orders = db::scan::<OrderRecord, _>(&txn.open_table(tables::STORE_ORDERS)?)?;
    let admin_notifications =
        db::scan::<AdminNotificationRecord, _>(&txn.open_table(tables::ADMIN_NOTIFICATIONS)?)?;

    let revenue_cents = orders
        .iter()
        .filter(|(_, o)| o.status != OrderStatus::Cancelled)
        .fold(0u64, |sum, (_, o)| sum.saturating_add(o.total_cents));

    Ok(DashboardResponse {
        user_count,
        pet_count,
        linked_tag_count: count(&tags, |t| t.pet_id.is_some()),
        scan_count,
        open_post_count: count(&posts, |p| p.status == PostStatus::Open),
        pending_subscription_count: count(&subscriptions, |s| {
            s.status == SubscriptionStatus::Pending
        }),
        order_count: orders.len() as u64,
        revenue_cents,
        unread_admin_notification_count: count(&admin_notifications, |n| !n.read),
        ..Default::default()
    })
}

/// Admin dashboard
///
/// Counters for the back-office landing page, read through the retry
/// helper.
///
/// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<DashboardResponse>> {
    let policy = state.retry_policy();
    let mut response =
        retry_with_backoff(&policy, || db::read(&state.db, collect_counts)).await?;

    // Get database file size
    response.database_size_bytes = fs::metadata(&state.config.database_path)
        .map(|m| m.len())
        .unwrap_or(0);
    response.database_size_human = format_bytes(response.database_size_bytes);

    tracing::info!(
        "Dashboard requested: {} users, {} pets, {} database",
        response.user_count,
        response.pet_count,
        response.database_size_human
    );

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
