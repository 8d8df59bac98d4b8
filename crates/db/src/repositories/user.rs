use crate::models::DbUser;
use chrono::Utc;
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

pub async fn create_user(
    pool: &Pool<Postgres>,
    name: &str,
    email: &str,
    role: &str,
) -> Result<DbUser> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!("Creating user: id={}, role={}", id, role);

    let user = sqlx::query_as::<_, DbUser>(
        r#"
        INSERT INTO users (id, name, email, role, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, email, role, created_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(role)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, name, email, role, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn list_users(pool: &Pool<Postgres>, role: Option<&str>) -> Result<Vec<DbUser>> {
    let users = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, name, email, role, created_at
        FROM users
        WHERE ($1::VARCHAR IS NULL OR role = $1)
        ORDER BY name ASC
        "#,
    )
    .bind(role)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Applies whichever fields are provided; `None` leaves a column unchanged.
pub async fn update_user(
    pool: &Pool<Postgres>,
    id: Uuid,
    name: Option<&str>,
    email: Option<&str>,
    role: Option<&str>,
) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            role = COALESCE($4, role)
        WHERE id = $1
        RETURNING id, name, email, role, created_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn delete_user(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Holds a `FOR KEY SHARE` lock on the user until the transaction ends, so
/// the row cannot be deleted while a booking that references it is written.
/// Returns false when the user does not exist.
pub async fn share_lock_user(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let found = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM users
        WHERE id = $1
        FOR KEY SHARE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}

/// Row-locks the user for deletion. Waits for in-flight bookings holding a
/// key-share lock on the same row.
pub async fn lock_user(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let found = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM users
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}
