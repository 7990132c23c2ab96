//! Repository for the `analytics_events` table.

use empathy_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::analytics::{
    AnalyticsEvent, AnalyticsSummary, CreateAnalyticsEvent, EventTypeCount,
};

const COLUMNS: &str = "id, user_id, event_type, properties, occurred_at, created_at, updated_at";

pub struct AnalyticsRepo;

impl AnalyticsRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateAnalyticsEvent,
    ) -> Result<AnalyticsEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO analytics_events (user_id, event_type, properties)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnalyticsEvent>(&query)
            .bind(input.user_id)
            .bind(&input.event_type)
            .bind(&input.properties)
            .fetch_one(pool)
            .await
    }

    /// Event counts per type plus overall totals for `[from, to]`.
    pub async fn summary(
        pool: &PgPool,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<AnalyticsSummary, sqlx::Error> {
        let by_event_type = sqlx::query_as::<_, EventTypeCount>(
            "SELECT event_type,
                    COUNT(*)::BIGINT AS count,
                    COUNT(DISTINCT user_id)::BIGINT AS distinct_users
             FROM analytics_events
             WHERE occurred_at >= $1 AND occurred_at <= $2
             GROUP BY event_type
             ORDER BY count DESC, event_type ASC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        let (total_events, distinct_users) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*)::BIGINT, COUNT(DISTINCT user_id)::BIGINT
             FROM analytics_events
             WHERE occurred_at >= $1 AND occurred_at <= $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await?;

        Ok(AnalyticsSummary {
            from,
            to,
            total_events,
            distinct_users,
            by_event_type,
        })
    }
}
