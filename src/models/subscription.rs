use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Plan;
use crate::routes::timestamp_to_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Rejected,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Rejected => "rejected",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

/// Subscription record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: String,
    pub plan: Plan,
    /// ISO date (YYYY-MM-DD)
    pub start_date: String,
    /// ISO date (YYYY-MM-DD)
    pub end_date: String,
    pub status: SubscriptionStatus,
    pub created_at: i64,
    /// When an admin approved or rejected the request
    pub decided_at: Option<i64>,
}

/// Subscription model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan: Plan,
    pub start_date: String,
    pub end_date: String,
    pub status: SubscriptionStatus,
    pub created_at: String,
    pub decided_at: Option<String>,
}

impl Subscription {
    pub fn from_record(id: String, record: SubscriptionRecord) -> Self {
        Self {
            id,
            user_id: record.user_id,
            plan: record.plan,
            start_date: record.start_date,
            end_date: record.end_date,
            status: record.status,
            created_at: timestamp_to_rfc3339(record.created_at),
            decided_at: record.decided_at.map(timestamp_to_rfc3339),
        }
    }

    /// Parse and order-check a subscription period
    pub fn validate_period(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), String> {
        let start_date = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
            .map_err(|_| "Invalid startDate (expected YYYY-MM-DD)".to_string())?;
        let end_date = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
            .map_err(|_| "Invalid endDate (expected YYYY-MM-DD)".to_string())?;
        if end_date < start_date {
            return Err("endDate must not be before startDate".to_string());
        }
        Ok((start_date, end_date))
    }
}
