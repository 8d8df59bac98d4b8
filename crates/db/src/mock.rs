pub mod store;

/// Connects to the database named by `TEST_DATABASE_URL` and creates the
/// schema. Returns `None` when the variable is unset so database tests can
/// skip on machines without PostgreSQL.
pub async fn create_test_pool() -> eyre::Result<Option<crate::DbPool>> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        return Ok(None);
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&database_url)
        .await?;

    // Initialize test schema
    crate::schema::initialize_database(&pool).await?;

    Ok(Some(pool))
}
