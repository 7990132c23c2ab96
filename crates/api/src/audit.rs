//! Security audit trail.
//!
//! Handlers describe what happened with an [`AuditEvent`] and hand it to the
//! [`AuditLogger`] in [`AppState`](crate::state::AppState). The logger
//! redacts the details and forwards the entry to an [`AuditSink`]. A sink
//! failure is logged and swallowed: the caller's response does not change.

use std::sync::Arc;

use empathy_core::audit::{outcomes, redact_sensitive_fields};
use empathy_core::types::DbId;
use empathy_db::models::audit::CreateAuditLog;
use empathy_db::repositories::AuditLogRepo;
use empathy_db::DbPool;

use crate::middleware::request_meta::RequestMeta;

#[derive(Debug, thiserror::Error)]
pub enum AuditWriteError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

/// Destination for audit entries.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, entry: CreateAuditLog) -> Result<(), AuditWriteError>;
}

/// Appends to the hash-chained `audit_logs` table.
pub struct PgAuditSink {
    pool: DbPool,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditSink for PgAuditSink {
    async fn write(&self, entry: CreateAuditLog) -> Result<(), AuditWriteError> {
        AuditLogRepo::append_chained(&self.pool, &entry).await?;
        Ok(())
    }
}

/// One auditable occurrence, built fluently by handlers.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    action_type: &'static str,
    outcome: &'static str,
    user_id: Option<DbId>,
    entity_type: Option<&'static str>,
    entity_id: Option<DbId>,
    details: Option<serde_json::Value>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    request_id: Option<String>,
}

impl AuditEvent {
    /// A successful `action_type` event.
    pub fn new(action_type: &'static str) -> Self {
        Self {
            action_type,
            outcome: outcomes::SUCCESS,
            user_id: None,
            entity_type: None,
            entity_id: None,
            details: None,
            ip_address: None,
            user_agent: None,
            request_id: None,
        }
    }

    pub fn failure(mut self) -> Self {
        self.outcome = outcomes::FAILURE;
        self
    }

    pub fn denied(mut self) -> Self {
        self.outcome = outcomes::DENIED;
        self
    }

    pub fn actor(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn entity(mut self, entity_type: &'static str, id: DbId) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(id);
        self
    }

    pub fn entity_type(mut self, entity_type: &'static str) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn meta(mut self, meta: &RequestMeta) -> Self {
        self.ip_address.clone_from(&meta.ip_address);
        self.user_agent.clone_from(&meta.user_agent);
        self.request_id.clone_from(&meta.request_id);
        self
    }

    /// Convert into a storable row, redacting sensitive detail keys.
    pub fn into_entry(self) -> CreateAuditLog {
        CreateAuditLog {
            user_id: self.user_id,
            action_type: self.action_type.to_string(),
            entity_type: self.entity_type.map(str::to_string),
            entity_id: self.entity_id,
            outcome: self.outcome.to_string(),
            details_json: self.details.as_ref().map(redact_sensitive_fields),
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            request_id: self.request_id,
        }
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Write `event`. Failures are logged at `error!` and not returned.
    pub async fn record(&self, event: AuditEvent) {
        let entry = event.into_entry();
        let action_type = entry.action_type.clone();
        if let Err(e) = self.sink.write(entry).await {
            tracing::error!(action_type = %action_type, error = %e, "Failed to write audit log entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use empathy_core::audit::action_types;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<CreateAuditLog>>);

    #[async_trait::async_trait]
    impl AuditSink for Capture {
        async fn write(&self, entry: CreateAuditLog) -> Result<(), AuditWriteError> {
            self.0.lock().unwrap().push(entry);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait::async_trait]
    impl AuditSink for Broken {
        async fn write(&self, _entry: CreateAuditLog) -> Result<(), AuditWriteError> {
            Err(AuditWriteError::Other("disk full".into()))
        }
    }

    #[test]
    fn builder_fills_every_column() {
        let meta = RequestMeta {
            ip_address: Some("10.0.0.1".into()),
            user_agent: Some("curl/8".into()),
            request_id: Some("req-1".into()),
        };
        let entry = AuditEvent::new(action_types::LOGIN_FAILED)
            .failure()
            .actor(7)
            .entity("user", 7)
            .details(json!({"username": "jo", "password": "hunter2hunter2"}))
            .meta(&meta)
            .into_entry();

        assert_eq!(entry.action_type, "login_failed");
        assert_eq!(entry.outcome, "failure");
        assert_eq!(entry.user_id, Some(7));
        assert_eq!(entry.entity_type.as_deref(), Some("user"));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(entry.request_id.as_deref(), Some("req-1"));
        let details = entry.details_json.unwrap();
        assert_eq!(details["username"], "jo");
        assert_eq!(details["password"], "[REDACTED]");
    }

    #[tokio::test]
    async fn logger_forwards_to_sink() {
        let sink = Arc::new(Capture::default());
        let logger = AuditLogger::new(sink.clone());
        logger.record(AuditEvent::new(action_types::LOGOUT).actor(3)).await;

        let entries = sink.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, "success");
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let logger = AuditLogger::new(Arc::new(Broken));
        logger.record(AuditEvent::new(action_types::LOGIN)).await;
    }
}
