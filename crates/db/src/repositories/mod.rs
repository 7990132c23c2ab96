//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod analytics_repo;
pub mod audit_repo;
pub mod baa_template_repo;
pub mod conversation_repo;
pub mod deletion_request_repo;
pub mod goal_repo;
pub mod message_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;

pub use analytics_repo::AnalyticsRepo;
pub use audit_repo::{AuditLogRepo, AuditRetentionPolicyRepo};
pub use baa_template_repo::BaaTemplateRepo;
pub use conversation_repo::ConversationRepo;
pub use deletion_request_repo::DeletionRequestRepo;
pub use goal_repo::GoalRepo;
pub use message_repo::MessageRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
