//! Analytics event model and summary rows.

use empathy_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `analytics_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalyticsEvent {
    pub id: DbId,
    pub user_id: DbId,
    pub event_type: String,
    pub properties: serde_json::Value,
    pub occurred_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug)]
pub struct CreateAnalyticsEvent {
    pub user_id: DbId,
    pub event_type: String,
    pub properties: serde_json::Value,
}

/// Per-event-type counts within a summary window.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: i64,
    pub distinct_users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub from: Timestamp,
    pub to: Timestamp,
    pub total_events: i64,
    pub distinct_users: i64,
    pub by_event_type: Vec<EventTypeCount>,
}
