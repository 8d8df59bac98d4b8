//! Persistence seam for the booking ledger.
//!
//! Implementations live in `slotbook-db`. Apart from the plain lookups, three
//! methods carry atomicity requirements that every backend must honour:
//!
//! - [`LedgerStore::insert_booking`] is a conditional insert: it must refuse
//!   to write when the slot is gone, when the student already holds a booked
//!   appointment on the slot, or when the slot is at capacity.
//! - [`LedgerStore::delete_slot_cascade`] and
//!   [`LedgerStore::delete_user_cascade`] remove appointments before the
//!   slots they reference, and either complete entirely or not at all.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    errors::BookingResult,
    models::{
        appointment::Appointment,
        slot::Slot,
        user::{Role, User},
    },
};

/// Conflict reasons shared by the ledger and the stores.
pub mod reasons {
    pub const ALREADY_BOOKED: &str = "already booked";
    pub const SLOT_FULL: &str = "slot full";
    pub const ALREADY_CANCELLED: &str = "already cancelled";
    pub const STUDENT_ALREADY_BOOKED: &str = "student already booked on this slot";
    pub const EMAIL_IN_USE: &str = "email already in use";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlot {
    pub owner_id: Uuid,
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub max_bookings: i32,
}

/// Narrows an appointment listing. Both filters apply when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub student_id: Option<Uuid>,
    /// Only appointments on slots owned by this user.
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub appointments_removed: u64,
    pub slots_removed: u64,
    pub user_removed: bool,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> BookingResult<Option<User>>;

    async fn list_users(&self, role: Option<Role>) -> BookingResult<Vec<User>>;

    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> BookingResult<User>;

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> BookingResult<Option<User>>;

    /// Deletes the user's own appointments, every appointment on slots the
    /// user owns, those slots, and finally the user, as one unit.
    async fn delete_user_cascade(&self, id: Uuid) -> BookingResult<CascadeSummary>;

    async fn get_slot(&self, id: Uuid) -> BookingResult<Option<Slot>>;

    async fn list_slots(&self) -> BookingResult<Vec<Slot>>;

    async fn list_slot_ids_by_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Uuid>>;

    async fn create_slot(&self, slot: NewSlot) -> BookingResult<Slot>;

    /// Deletes the slot's appointments and then the slot, as one unit.
    /// Returns `None` if the slot did not exist.
    async fn delete_slot_cascade(&self, id: Uuid) -> BookingResult<Option<u64>>;

    async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>>;

    async fn list_appointments(&self, filter: AppointmentFilter) -> BookingResult<Vec<Appointment>>;

    async fn count_booked(&self, slot_id: Uuid) -> BookingResult<i64>;

    async fn find_booked(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Option<Appointment>>;

    /// Conditional insert of a booked appointment; see the module docs.
    async fn insert_booking(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Appointment>;

    /// Flips a booked appointment to cancelled. Returns `None` when the
    /// appointment is missing or no longer booked.
    async fn cancel_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>>;

    async fn set_appointment_student(
        &self,
        id: Uuid,
        student_id: Uuid,
    ) -> BookingResult<Option<Appointment>>;

    async fn delete_appointment(&self, id: Uuid) -> BookingResult<bool>;
}
