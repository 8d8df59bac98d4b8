use crate::models::DbAppointment;
use chrono::Utc;
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

pub async fn get_appointment_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, student_id, slot_id, status, created_at
        FROM appointments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

/// Newest first. `owner_id` restricts to appointments on that user's slots.
pub async fn list_appointments(
    pool: &Pool<Postgres>,
    student_id: Option<Uuid>,
    owner_id: Option<Uuid>,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT a.id, a.student_id, a.slot_id, a.status, a.created_at
        FROM appointments a
        JOIN slots s ON s.id = a.slot_id
        WHERE ($1::UUID IS NULL OR a.student_id = $1)
          AND ($2::UUID IS NULL OR s.owner_id = $2)
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(student_id)
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn count_booked(conn: &mut PgConnection, slot_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM appointments
        WHERE slot_id = $1 AND status = 'booked'
        "#,
    )
    .bind(slot_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

pub async fn find_booked(
    pool: &Pool<Postgres>,
    student_id: Uuid,
    slot_id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, student_id, slot_id, status, created_at
        FROM appointments
        WHERE student_id = $1 AND slot_id = $2 AND status = 'booked'
        "#,
    )
    .bind(student_id)
    .bind(slot_id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn insert_booked(
    conn: &mut PgConnection,
    student_id: Uuid,
    slot_id: Uuid,
) -> Result<DbAppointment> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        INSERT INTO appointments (id, student_id, slot_id, status, created_at)
        VALUES ($1, $2, $3, 'booked', $4)
        RETURNING id, student_id, slot_id, status, created_at
        "#,
    )
    .bind(id)
    .bind(student_id)
    .bind(slot_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(appointment)
}

/// Only rows that are still booked are touched.
pub async fn cancel_appointment(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        UPDATE appointments
        SET status = 'cancelled'
        WHERE id = $1 AND status = 'booked'
        RETURNING id, student_id, slot_id, status, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn set_student(
    conn: &mut PgConnection,
    id: Uuid,
    student_id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        UPDATE appointments
        SET student_id = $2
        WHERE id = $1
        RETURNING id, student_id, slot_id, status, created_at
        "#,
    )
    .bind(id)
    .bind(student_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(appointment)
}

pub async fn delete_appointment(pool: &Pool<Postgres>, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM appointments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_appointments_by_slot(conn: &mut PgConnection, slot_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM appointments
        WHERE slot_id = $1
        "#,
    )
    .bind(slot_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_appointments_by_student(conn: &mut PgConnection, student_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM appointments
        WHERE student_id = $1
        "#,
    )
    .bind(student_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Removes every appointment on slots owned by `owner_id`.
pub async fn delete_appointments_by_owner(conn: &mut PgConnection, owner_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM appointments
        WHERE slot_id IN (SELECT id FROM slots WHERE owner_id = $1)
        "#,
    )
    .bind(owner_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
