//! Repository integration tests against a real database.
//!
//! - Unique constraint names surface for conflict mapping
//! - Audit chain appends verify end to end
//! - Deletion approval erases user data in one transaction
//! - BAA template versions bump only on body changes

use empathy_core::audit::{self, action_types, outcomes};
use empathy_core::deletion;
use empathy_db::models::audit::{AuditQuery, CreateAuditLog};
use empathy_db::models::baa_template::{CreateBaaTemplate, UpdateBaaTemplate};
use empathy_db::models::conversation::{CreateConversation, CreateMessage};
use empathy_db::models::goal::CreateGoal;
use empathy_db::models::user::{CreateUser, User};
use empathy_db::repositories::{
    AuditLogRepo, BaaTemplateRepo, ConversationRepo, DeletionRequestRepo, GoalRepo, MessageRepo,
    UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &PgPool, name: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "$argon2id$placeholder".to_string(),
            role_id: empathy_core::roles::PATIENT_ROLE_ID,
        },
    )
    .await
    .unwrap()
}

fn audit_entry(user_id: i64, action: &str) -> CreateAuditLog {
    CreateAuditLog {
        user_id: Some(user_id),
        action_type: action.to_string(),
        outcome: outcomes::SUCCESS.to_string(),
        ..CreateAuditLog::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn duplicate_username_reports_named_constraint(pool: PgPool) {
    new_user(&pool, "alice").await;
    let err = UserRepo::create(
        &pool,
        &CreateUser {
            username: "alice".into(),
            email: "other@example.com".into(),
            password_hash: "x".into(),
            role_id: 3,
        },
    )
    .await
    .unwrap_err();

    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.code().as_deref(), Some("23505"));
    assert_eq!(db_err.constraint(), Some("uq_users_username"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn audit_chain_appends_verify(pool: PgPool) {
    let user = new_user(&pool, "bob").await;
    for action in [action_types::LOGIN, action_types::ENTITY_CREATE, action_types::LOGOUT] {
        AuditLogRepo::append_chained(&pool, &audit_entry(user.id, action))
            .await
            .unwrap();
    }

    let rows = AuditLogRepo::fetch_for_integrity_check(&pool).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].prev_hash.is_none());

    let result = audit::verify_chain(rows.iter().map(|r| audit::ChainRow {
        id: r.id,
        entry_data: audit::canonical_entry(&r.chain_fields()),
        prev_hash: r.prev_hash.as_deref(),
        integrity_hash: r.integrity_hash.as_deref(),
    }));
    assert_eq!(result.verified_entries, 3);
    assert_eq!(result.first_break, None);

    let params = AuditQuery {
        action_type: Some(action_types::LOGIN.into()),
        limit: 50,
        ..AuditQuery::default()
    };
    assert_eq!(AuditLogRepo::count(&pool, &params).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn second_pending_deletion_request_conflicts(pool: PgPool) {
    let user = new_user(&pool, "carol").await;
    DeletionRequestRepo::create(&pool, user.id, None).await.unwrap();
    let err = DeletionRequestRepo::create(&pool, user.id, Some("again"))
        .await
        .unwrap_err();
    assert_eq!(
        err.as_database_error().and_then(|e| e.constraint()),
        Some("uq_deletion_requests_pending_user")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn approval_erases_user_data(pool: PgPool) {
    let user = new_user(&pool, "dave").await;
    let admin = new_user(&pool, "admin_erin").await;

    let convo = ConversationRepo::create(
        &pool,
        &CreateConversation {
            user_id: user.id,
            title: "Week 1".into(),
        },
    )
    .await
    .unwrap();
    MessageRepo::create(
        &pool,
        &CreateMessage {
            conversation_id: convo.id,
            role: "user".into(),
            content: "hello".into(),
        },
    )
    .await
    .unwrap();
    GoalRepo::create(
        &pool,
        &CreateGoal {
            user_id: user.id,
            created_by: user.id,
            title: "Sleep".into(),
            description: None,
            category: "physical".into(),
            progress: 0,
            target_date: None,
        },
    )
    .await
    .unwrap();

    let request = DeletionRequestRepo::create(&pool, user.id, None).await.unwrap();
    let (completed, summary) =
        DeletionRequestRepo::approve_and_erase(&pool, request.id, admin.id, None)
            .await
            .unwrap()
            .expect("pending request");

    assert_eq!(completed.status, deletion::STATUS_COMPLETED);
    assert_eq!(summary.conversations_deleted, 1);
    assert_eq!(summary.goals_deleted, 1);

    let erased = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(!erased.is_active);
    assert_eq!(erased.username, deletion::anonymized_username(user.id));
    assert!(MessageRepo::list_for_conversation(&pool, convo.id)
        .await
        .unwrap()
        .is_empty());

    // A processed request cannot be approved again.
    assert!(DeletionRequestRepo::approve_and_erase(&pool, request.id, admin.id, None)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn baa_version_bumps_on_body_change_only(pool: PgPool) {
    let admin = new_user(&pool, "frank").await;
    let template = BaaTemplateRepo::create(
        &pool,
        &CreateBaaTemplate {
            name: "Standard".into(),
            description: None,
            body: "Between {{a}}".into(),
            required_variables: vec!["a".into()],
            created_by: admin.id,
        },
    )
    .await
    .unwrap();
    assert_eq!(template.version, 1);

    let renamed = BaaTemplateRepo::update(
        &pool,
        template.id,
        &UpdateBaaTemplate {
            description: Some("v1 text".into()),
            ..UpdateBaaTemplate::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(renamed.version, 1);

    let rewritten = BaaTemplateRepo::update(
        &pool,
        template.id,
        &UpdateBaaTemplate {
            body: Some("Between {{a}} and {{b}}".into()),
            required_variables: Some(vec!["a".into(), "b".into()]),
            ..UpdateBaaTemplate::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(rewritten.version, 2);
    assert_eq!(rewritten.required_variables, vec!["a", "b"]);
}
