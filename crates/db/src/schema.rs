use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL UNIQUE,
            role VARCHAR(16) NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_role CHECK (role IN ('student', 'staff', 'admin'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create slots table. Date and times are opaque display strings.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS slots (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            owner_id UUID NOT NULL REFERENCES users(id),
            title VARCHAR(255) NOT NULL,
            date VARCHAR(64) NOT NULL,
            start_time VARCHAR(64) NOT NULL,
            end_time VARCHAR(64) NOT NULL,
            max_bookings INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT positive_capacity CHECK (max_bookings >= 1)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create appointments table. No ON DELETE CASCADE: the ledger removes
    // dependent rows explicitly and in order.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            student_id UUID NOT NULL REFERENCES users(id),
            slot_id UUID NOT NULL REFERENCES slots(id),
            status VARCHAR(16) NOT NULL DEFAULT 'booked',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_status CHECK (status IN ('booked', 'cancelled'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // At most one active booking per student and slot
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_booking
        ON appointments(student_id, slot_id)
        WHERE status = 'booked';
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_slots_owner_id ON slots(owner_id);",
        "CREATE INDEX IF NOT EXISTS idx_appointments_slot_id ON appointments(slot_id);",
        "CREATE INDEX IF NOT EXISTS idx_appointments_student_id ON appointments(student_id);",
        "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
