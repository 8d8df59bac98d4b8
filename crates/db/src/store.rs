//! PostgreSQL implementation of [`LedgerStore`].
//!
//! The booking insert and both cascades run inside a transaction that holds
//! `FOR UPDATE` row locks on the affected slots, so they stay atomic even
//! when several API processes share the database. The partial unique index
//! on `(student_id, slot_id) WHERE status = 'booked'` is the last line for
//! duplicate bookings; its violations surface as `Conflict`. Bookings hold a
//! key-share lock on the student row, and user deletion locks that row
//! first, so a booking never outlives the student it references.

use async_trait::async_trait;
use slotbook_core::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::Appointment,
        slot::Slot,
        user::{Role, User},
    },
    store::{AppointmentFilter, CascadeSummary, LedgerStore, NewSlot, NewUser, UserChanges, reasons},
};
use uuid::Uuid;

use crate::{
    DbPool,
    repositories::{appointment, slot, user},
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn database_error(err: &eyre::Report) -> Option<&dyn sqlx::error::DatabaseError> {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
}

/// Unique violations become `Conflict(reason)` and foreign key violations
/// `NotFound`; anything else is a database failure.
fn write_error(reason: &'static str) -> impl Fn(eyre::Report) -> BookingError {
    move |err| match database_error(&err) {
        Some(db) if db.is_unique_violation() => BookingError::Conflict(reason.to_string()),
        Some(db) if db.is_foreign_key_violation() => {
            BookingError::NotFound("Referenced record no longer exists".to_string())
        }
        _ => BookingError::Database(err),
    }
}

fn student_not_found(student_id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Student with ID {} not found", student_id))
}

fn sqlx_error(err: sqlx::Error) -> BookingError {
    BookingError::Database(err.into())
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn get_user(&self, id: Uuid) -> BookingResult<Option<User>> {
        user::get_user_by_id(&self.pool, id)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self, role: Option<Role>) -> BookingResult<Vec<User>> {
        user::list_users(&self.pool, role.as_ref().map(Role::as_str))
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn create_user(&self, new_user: NewUser) -> BookingResult<User> {
        let row = user::create_user(
            &self.pool,
            &new_user.name,
            &new_user.email,
            new_user.role.as_str(),
        )
        .await
        .map_err(write_error(reasons::EMAIL_IN_USE))?;

        User::try_from(row)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> BookingResult<Option<User>> {
        user::update_user(
            &self.pool,
            id,
            changes.name.as_deref(),
            changes.email.as_deref(),
            changes.role.as_ref().map(Role::as_str),
        )
        .await
        .map_err(write_error(reasons::EMAIL_IN_USE))?
        .map(User::try_from)
        .transpose()
    }

    async fn delete_user_cascade(&self, id: Uuid) -> BookingResult<CascadeSummary> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        // Waits for bookings that already reference the user, and keeps new
        // ones out until the cascade commits.
        user::lock_user(&mut tx, id).await?;

        // Block bookings on the user's slots until the cascade commits.
        let owned = slot::lock_slots_by_owner(&mut tx, id).await?;
        tracing::debug!("Cascading delete of user {} with {} slots", id, owned.len());

        let as_student = appointment::delete_appointments_by_student(&mut tx, id).await?;
        let on_owned_slots = appointment::delete_appointments_by_owner(&mut tx, id).await?;
        let slots_removed = slot::delete_slots_by_owner(&mut tx, id).await?;
        let user_removed = user::delete_user(&mut tx, id).await?;

        tx.commit().await.map_err(sqlx_error)?;

        Ok(CascadeSummary {
            appointments_removed: as_student + on_owned_slots,
            slots_removed,
            user_removed,
        })
    }

    async fn get_slot(&self, id: Uuid) -> BookingResult<Option<Slot>> {
        Ok(slot::get_slot_by_id(&self.pool, id).await?.map(Slot::from))
    }

    async fn list_slots(&self) -> BookingResult<Vec<Slot>> {
        Ok(slot::list_slots(&self.pool)
            .await?
            .into_iter()
            .map(Slot::from)
            .collect())
    }

    async fn list_slot_ids_by_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Uuid>> {
        Ok(slot::list_slot_ids_by_owner(&self.pool, owner_id).await?)
    }

    async fn create_slot(&self, new_slot: NewSlot) -> BookingResult<Slot> {
        Ok(slot::create_slot(&self.pool, &new_slot).await?.into())
    }

    async fn delete_slot_cascade(&self, id: Uuid) -> BookingResult<Option<u64>> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        if slot::lock_slot(&mut tx, id).await?.is_none() {
            return Ok(None);
        }

        let removed = appointment::delete_appointments_by_slot(&mut tx, id).await?;
        slot::delete_slot(&mut tx, id).await?;

        tx.commit().await.map_err(sqlx_error)?;
        Ok(Some(removed))
    }

    async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>> {
        appointment::get_appointment_by_id(&self.pool, id)
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> BookingResult<Vec<Appointment>> {
        appointment::list_appointments(&self.pool, filter.student_id, filter.owner_id)
            .await?
            .into_iter()
            .map(Appointment::try_from)
            .collect()
    }

    async fn count_booked(&self, slot_id: Uuid) -> BookingResult<i64> {
        let mut conn = self.pool.acquire().await.map_err(sqlx_error)?;
        Ok(appointment::count_booked(&mut conn, slot_id).await?)
    }

    async fn find_booked(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Option<Appointment>> {
        appointment::find_booked(&self.pool, student_id, slot_id)
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn insert_booking(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Appointment> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        let locked = slot::lock_slot(&mut tx, slot_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Slot with ID {} not found", slot_id)))?;

        if !user::share_lock_user(&mut tx, student_id).await? {
            return Err(student_not_found(student_id));
        }

        let booked = appointment::count_booked(&mut tx, slot_id).await?;
        if booked >= i64::from(locked.max_bookings) {
            return Err(BookingError::Conflict(reasons::SLOT_FULL.to_string()));
        }

        let row = appointment::insert_booked(&mut tx, student_id, slot_id)
            .await
            .map_err(write_error(reasons::ALREADY_BOOKED))?;

        tx.commit().await.map_err(sqlx_error)?;
        Appointment::try_from(row)
    }

    async fn cancel_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>> {
        appointment::cancel_appointment(&self.pool, id)
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn set_appointment_student(
        &self,
        id: Uuid,
        student_id: Uuid,
    ) -> BookingResult<Option<Appointment>> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error)?;

        if !user::share_lock_user(&mut tx, student_id).await? {
            return Err(student_not_found(student_id));
        }

        let row = appointment::set_student(&mut tx, id, student_id)
            .await
            .map_err(write_error(reasons::STUDENT_ALREADY_BOOKED))?;

        tx.commit().await.map_err(sqlx_error)?;
        row.map(Appointment::try_from).transpose()
    }

    async fn delete_appointment(&self, id: Uuid) -> BookingResult<bool> {
        Ok(appointment::delete_appointment(&self.pool, id).await?)
    }
}
