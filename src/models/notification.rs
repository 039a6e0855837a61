use serde::{Deserialize, Serialize};

use crate::geolocation::Coordinates;
use crate::models::{InteractionKind, OrderStatus, Plan, SubscriptionStatus};
use crate::routes::timestamp_to_rfc3339;

/// Structured payload attached to a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationDetails {
    Order {
        order_id: String,
        total_cents: u64,
        status: OrderStatus,
    },
    Subscription {
        subscription_id: String,
        plan: Plan,
        status: SubscriptionStatus,
    },
    TagScan {
        tag_code: String,
        pet_id: String,
        location: Option<Coordinates>,
    },
    LostReport {
        report_id: String,
        nfc_id: String,
    },
    Interaction {
        post_id: String,
        interaction_id: String,
        kind: InteractionKind,
    },
}

/// User notification record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub details: Option<NotificationDetails>,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminNotificationKind {
    SubscriptionRequest,
    NewOrder,
}

/// Admin notification record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminNotificationRecord {
    pub kind: AdminNotificationKind,
    pub title: String,
    pub message: String,
    pub details: Option<NotificationDetails>,
    pub read: bool,
    pub created_at: i64,
}

/// Notification model for API responses (user and admin)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AdminNotificationKind>,
    pub title: String,
    pub message: String,
    pub details: Option<NotificationDetails>,
    pub read: bool,
    pub created_at: String,
}

impl Notification {
    pub fn from_record(id: String, record: NotificationRecord) -> Self {
        Self {
            id,
            kind: None,
            title: record.title,
            message: record.message,
            details: record.details,
            read: record.read,
            created_at: timestamp_to_rfc3339(record.created_at),
        }
    }

    pub fn from_admin_record(id: String, record: AdminNotificationRecord) -> Self {
        Self {
            id,
            kind: Some(record.kind),
            title: record.title,
            message: record.message,
            details: record.details,
            read: record.read,
            created_at: timestamp_to_rfc3339(record.created_at),
        }
    }
}
