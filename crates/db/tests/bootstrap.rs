use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify seed data.
#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_full_bootstrap(pool: PgPool) {
    empathy_db::health_check(&pool).await.unwrap();

    let roles: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM roles ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    let names: Vec<&str> = roles.iter().map(|(_, n)| n.as_str()).collect();
    assert_eq!(names, vec!["admin", "therapist", "patient"]);
    assert_eq!(roles[2].0, empathy_core::roles::PATIENT_ROLE_ID);
}

/// Every audit category has a seeded retention policy.
#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_retention_policies_seeded(pool: PgPool) {
    let categories: Vec<(String,)> =
        sqlx::query_as("SELECT log_category FROM audit_retention_policies")
            .fetch_all(&pool)
            .await
            .unwrap();
    for category in empathy_core::audit::ALL_CATEGORIES {
        assert!(
            categories.iter().any(|(c,)| c == category),
            "missing retention policy for {category}"
        );
    }
}
