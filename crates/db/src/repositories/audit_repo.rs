//! Repository for the `audit_logs` and `audit_retention_policies` tables.

use chrono::{SubsecRound, Utc};
use empathy_core::audit::{self, ChainFields};
use empathy_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::audit::{
    AuditLog, AuditQuery, AuditRetentionPolicy, CreateAuditLog, UpdateRetentionPolicy,
};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "\
    id, timestamp, user_id, action_type, entity_type, entity_id, outcome, \
    details_json, ip_address, user_agent, request_id, prev_hash, \
    integrity_hash, created_at";

/// Column list for `audit_retention_policies` SELECT queries.
const RETENTION_COLUMNS: &str = "\
    id, log_category, active_retention_days, archive_retention_days, \
    enabled, created_at, updated_at";

/// Advisory lock key serializing chain appends ("AUDITLOG" in ASCII).
const CHAIN_LOCK_KEY: i64 = 0x4155_4449_544C_4F47;

// ---------------------------------------------------------------------------
// AuditLogRepo
// ---------------------------------------------------------------------------

/// Provides append and query operations for audit logs.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append one entry to the hash chain.
    ///
    /// Runs in a transaction holding a transaction-scoped advisory lock, so
    /// concurrent appends read the previous hash and insert one at a time.
    /// The timestamp is generated here, truncated to microseconds to match
    /// what `TIMESTAMPTZ` stores.
    pub async fn append_chained(
        pool: &PgPool,
        entry: &CreateAuditLog,
    ) -> Result<AuditLog, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHAIN_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let prev_hash = sqlx::query_scalar::<_, Option<String>>(
            "SELECT integrity_hash FROM audit_logs
             WHERE integrity_hash IS NOT NULL
             ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?
        .flatten();

        let timestamp = Utc::now().trunc_subsecs(6);
        let canonical = audit::canonical_entry(&ChainFields {
            timestamp,
            user_id: entry.user_id,
            action_type: &entry.action_type,
            entity_type: entry.entity_type.as_deref(),
            entity_id: entry.entity_id,
            outcome: &entry.outcome,
        });
        let integrity_hash = audit::compute_integrity_hash(prev_hash.as_deref(), &canonical);

        let query = format!(
            "INSERT INTO audit_logs
                (timestamp, user_id, action_type, entity_type, entity_id, outcome,
                 details_json, ip_address, user_agent, request_id, prev_hash, integrity_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AuditLog>(&query)
            .bind(timestamp)
            .bind(entry.user_id)
            .bind(&entry.action_type)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(&entry.outcome)
            .bind(&entry.details_json)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(&entry.request_id)
            .bind(&prev_hash)
            .bind(&integrity_hash)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Query audit logs with filtering and pagination.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditLog>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_audit_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {where_clause} \
             ORDER BY timestamp DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let q = bind_audit_values(sqlx::query_as::<_, AuditLog>(&query), &bind_values);
        q.bind(params.limit)
            .bind(params.offset)
            .fetch_all(pool)
            .await
    }

    /// Count audit logs matching the given filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_audit_filter(params);

        let query = format!("SELECT COUNT(*)::BIGINT AS count FROM audit_logs {where_clause}");

        let q = bind_audit_values_scalar(sqlx::query_scalar::<_, i64>(&query), &bind_values);
        q.fetch_one(pool).await
    }

    /// Export audit log entries within an optional time range, oldest first.
    pub async fn export_range(
        pool: &PgPool,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs \
             WHERE ($1::timestamptz IS NULL OR timestamp >= $1) \
               AND ($2::timestamptz IS NULL OR timestamp <= $2) \
             ORDER BY timestamp ASC, id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Fetch every retained entry by ascending id for chain verification.
    pub async fn fetch_for_integrity_check(pool: &PgPool) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audit_logs ORDER BY id ASC");
        sqlx::query_as::<_, AuditLog>(&query).fetch_all(pool).await
    }

    /// Delete entries with one of `action_types` older than `cutoff`.
    /// Returns the number of rows removed.
    pub async fn delete_older_than(
        pool: &PgPool,
        action_types: &[&str],
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        if action_types.is_empty() {
            return Ok(0);
        }
        let actions: Vec<String> = action_types.iter().map(|a| a.to_string()).collect();
        let result = sqlx::query(
            "DELETE FROM audit_logs WHERE action_type = ANY($1) AND timestamp < $2",
        )
        .bind(&actions)
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete entries older than `cutoff` whose action type is not in
    /// `known_actions`. Unknown actions fall into the operations category.
    pub async fn delete_unlisted_older_than(
        pool: &PgPool,
        known_actions: &[&str],
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let actions: Vec<String> = known_actions.iter().map(|a| a.to_string()).collect();
        let result = sqlx::query(
            "DELETE FROM audit_logs WHERE NOT (action_type = ANY($1)) AND timestamp < $2",
        )
        .bind(&actions)
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// AuditRetentionPolicyRepo
// ---------------------------------------------------------------------------

/// Provides read and update operations for audit retention policies.
pub struct AuditRetentionPolicyRepo;

impl AuditRetentionPolicyRepo {
    /// List all retention policies.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<AuditRetentionPolicy>, sqlx::Error> {
        let query = format!(
            "SELECT {RETENTION_COLUMNS} FROM audit_retention_policies ORDER BY log_category"
        );
        sqlx::query_as::<_, AuditRetentionPolicy>(&query)
            .fetch_all(pool)
            .await
    }

    /// Find a retention policy by category name.
    pub async fn find_by_category(
        pool: &PgPool,
        category: &str,
    ) -> Result<Option<AuditRetentionPolicy>, sqlx::Error> {
        let query = format!(
            "SELECT {RETENTION_COLUMNS} FROM audit_retention_policies WHERE log_category = $1"
        );
        sqlx::query_as::<_, AuditRetentionPolicy>(&query)
            .bind(category)
            .fetch_optional(pool)
            .await
    }

    /// Update a retention policy by category.
    pub async fn update(
        pool: &PgPool,
        category: &str,
        dto: &UpdateRetentionPolicy,
    ) -> Result<Option<AuditRetentionPolicy>, sqlx::Error> {
        let mut sets: Vec<String> = Vec::new();
        let mut bind_idx = 2u32; // $1 is category
        let mut bind_values: Vec<RetentionBindValue> = Vec::new();

        if let Some(days) = dto.active_retention_days {
            sets.push(format!("active_retention_days = ${bind_idx}"));
            bind_idx += 1;
            bind_values.push(RetentionBindValue::Int(days));
        }

        if let Some(days) = dto.archive_retention_days {
            sets.push(format!("archive_retention_days = ${bind_idx}"));
            bind_idx += 1;
            bind_values.push(RetentionBindValue::Int(days));
        }

        if let Some(enabled) = dto.enabled {
            sets.push(format!("enabled = ${bind_idx}"));
            bind_values.push(RetentionBindValue::Bool(enabled));
        }

        if sets.is_empty() {
            return Self::find_by_category(pool, category).await;
        }

        let query = format!(
            "UPDATE audit_retention_policies SET {} WHERE log_category = $1 RETURNING {RETENTION_COLUMNS}",
            sets.join(", ")
        );

        let mut q = sqlx::query_as::<_, AuditRetentionPolicy>(&query).bind(category);
        for val in &bind_values {
            match val {
                RetentionBindValue::Int(v) => q = q.bind(*v),
                RetentionBindValue::Bool(v) => q = q.bind(*v),
            }
        }

        q.fetch_optional(pool).await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built audit log queries.
enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

/// Typed bind value for dynamically-built retention policy queries.
enum RetentionBindValue {
    Int(i32),
    Bool(bool),
}

/// Build a WHERE clause and bind values from `AuditQuery` filter parameters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
/// The `where_clause` is empty if no filters are active, or starts with `WHERE `.
fn build_audit_filter(params: &AuditQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    let mut push = |column_expr: &str, value: BindValue| {
        conditions.push(format!("{column_expr} ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(value);
    };

    if let Some(user_id) = params.user_id {
        push("user_id =", BindValue::BigInt(user_id));
    }
    if let Some(ref action_type) = params.action_type {
        push("action_type =", BindValue::Text(action_type.clone()));
    }
    if let Some(ref entity_type) = params.entity_type {
        push("entity_type =", BindValue::Text(entity_type.clone()));
    }
    if let Some(entity_id) = params.entity_id {
        push("entity_id =", BindValue::BigInt(entity_id));
    }
    if let Some(ref outcome) = params.outcome {
        push("outcome =", BindValue::Text(outcome.clone()));
    }
    if let Some(from) = params.from {
        push("timestamp >=", BindValue::Timestamp(from));
    }
    if let Some(to) = params.to {
        push("timestamp <=", BindValue::Timestamp(to));
    }
    if let Some(ref search_text) = params.search_text {
        push(
            "details_json::text ILIKE",
            BindValue::Text(format!("%{search_text}%")),
        );
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_audit_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
fn bind_audit_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (clause, values, next) = build_audit_filter(&AuditQuery::default());
        assert!(clause.is_empty());
        assert!(values.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn filters_are_numbered_in_order() {
        let params = AuditQuery {
            user_id: Some(4),
            outcome: Some("denied".into()),
            search_text: Some("goal".into()),
            ..AuditQuery::default()
        };
        let (clause, values, next) = build_audit_filter(&params);
        assert_eq!(
            clause,
            "WHERE user_id = $1 AND outcome = $2 AND details_json::text ILIKE $3"
        );
        assert_eq!(values.len(), 3);
        assert_eq!(next, 4);
    }
}
