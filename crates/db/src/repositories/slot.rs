use crate::models::DbSlot;
use chrono::Utc;
use eyre::Result;
use slotbook_core::store::NewSlot;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

pub async fn create_slot(pool: &Pool<Postgres>, slot: &NewSlot) -> Result<DbSlot> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        INSERT INTO slots (id, owner_id, title, date, start_time, end_time, max_bookings, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, owner_id, title, date, start_time, end_time, max_bookings, created_at
        "#,
    )
    .bind(id)
    .bind(slot.owner_id)
    .bind(&slot.title)
    .bind(&slot.date)
    .bind(&slot.start_time)
    .bind(&slot.end_time)
    .bind(slot.max_bookings)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(slot)
}

pub async fn get_slot_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, owner_id, title, date, start_time, end_time, max_bookings, created_at
        FROM slots
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

/// Row-locks the slot until the surrounding transaction ends.
pub async fn lock_slot(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, owner_id, title, date, start_time, end_time, max_bookings, created_at
        FROM slots
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(slot)
}

pub async fn list_slots(pool: &Pool<Postgres>) -> Result<Vec<DbSlot>> {
    let slots = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, owner_id, title, date, start_time, end_time, max_bookings, created_at
        FROM slots
        ORDER BY date ASC, start_time ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(slots)
}

pub async fn list_slot_ids_by_owner(pool: &Pool<Postgres>, owner_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM slots
        WHERE owner_id = $1
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

pub async fn delete_slot(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM slots
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_slots_by_owner(conn: &mut PgConnection, owner_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM slots
        WHERE owner_id = $1
        "#,
    )
    .bind(owner_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Row-locks every slot owned by `owner_id` until the transaction ends.
pub async fn lock_slots_by_owner(conn: &mut PgConnection, owner_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM slots
        WHERE owner_id = $1
        FOR UPDATE
        "#,
    )
    .bind(owner_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}
