//! # Booking Ledger
//!
//! The ledger is the only writer of slots, appointments and users. It keeps
//! three invariants across every mutating operation:
//!
//! 1. **Capacity**: a slot never holds more booked appointments than its
//!    `max_bookings`.
//! 2. **No duplicate booking**: a student holds at most one booked
//!    appointment per slot.
//! 3. **Referential integrity**: appointments only reference existing slots;
//!    deleting a slot or a user removes every dependent appointment first.
//!
//! Book, AdminAssign, Reassign and DeleteSlot run their check-and-write under
//! the slot's entry in [`SlotLocks`], which serializes them per slot while
//! leaving other slots untouched. The store's own conditional insert backs
//! this up when several processes share one database.

mod locks;

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

pub use locks::{SlotGuard, SlotLocks};

use crate::{
    errors::{BookingError, BookingResult},
    identity::Caller,
    models::{
        appointment::{Appointment, AppointmentView},
        slot::{CreateSlotRequest, DEFAULT_MAX_BOOKINGS, DeleteSlotResponse, Slot, SlotView},
        user::{CreateUserRequest, DeleteUserResponse, Role, UpdateUserRequest, User, UserSummary},
    },
    store::{AppointmentFilter, CascadeSummary, LedgerStore, NewSlot, NewUser, UserChanges, reasons},
};

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    locks: Arc<SlotLocks>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: Arc::new(SlotLocks::new()),
        }
    }

    pub fn locks(&self) -> &SlotLocks {
        &self.locks
    }

    pub async fn list_slots(&self) -> BookingResult<Vec<SlotView>> {
        let slots = self.store.list_slots().await?;

        let mut views = Vec::with_capacity(slots.len());
        for slot in slots {
            views.push(self.slot_view(slot).await?);
        }
        Ok(views)
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> BookingResult<SlotView> {
        let slot = self.require_slot(slot_id).await?;
        self.slot_view(slot).await
    }

    pub async fn create_slot(&self, caller: &Caller, request: CreateSlotRequest) -> BookingResult<SlotView> {
        caller.require_role(&[Role::Staff, Role::Admin])?;

        let title = required("title", &request.title)?;
        let date = required("date", &request.date)?;
        let start_time = required("start_time", &request.start_time)?;
        let end_time = required("end_time", &request.end_time)?;

        let max_bookings = match request.max_bookings {
            None => DEFAULT_MAX_BOOKINGS,
            Some(n) if n >= 1 => n,
            Some(n) => {
                return Err(BookingError::Validation(format!(
                    "max_bookings must be at least 1, got {}",
                    n
                )));
            }
        };

        let owner_id = match request.owner_id {
            Some(owner_id) if owner_id != caller.user_id => {
                if !caller.is_admin() {
                    return Err(BookingError::Authorization(
                        "Only admins may create slots for another user".to_string(),
                    ));
                }
                let owner = self.require_user(owner_id).await?;
                if !owner.role.can_own_slots() {
                    return Err(BookingError::Validation(format!(
                        "User {} cannot own slots",
                        owner_id
                    )));
                }
                owner_id
            }
            _ => caller.user_id,
        };

        let slot = self
            .store
            .create_slot(NewSlot {
                owner_id,
                title,
                date,
                start_time,
                end_time,
                max_bookings,
            })
            .await?;

        info!(
            "Slot created: id={}, owner_id={}, max_bookings={}",
            slot.id, slot.owner_id, slot.max_bookings
        );
        self.slot_view(slot).await
    }

    /// Removes a slot and every appointment referencing it.
    pub async fn delete_slot(&self, caller: &Caller, slot_id: Uuid) -> BookingResult<DeleteSlotResponse> {
        caller.require_role(&[Role::Staff, Role::Admin])?;

        let _guard = self.locks.acquire(slot_id).await;

        let slot = self.require_slot(slot_id).await?;
        if !caller.is_admin() && slot.owner_id != caller.user_id {
            return Err(BookingError::Authorization(
                "Staff may only delete their own slots".to_string(),
            ));
        }

        let appointments_removed = self
            .store
            .delete_slot_cascade(slot_id)
            .await?
            .ok_or_else(|| slot_not_found(slot_id))?;

        info!(
            "Slot deleted: id={}, appointments_removed={}",
            slot_id, appointments_removed
        );
        Ok(DeleteSlotResponse {
            id: slot_id,
            appointments_removed,
        })
    }

    pub async fn list_appointments(
        &self,
        caller: &Caller,
        student_id: Option<Uuid>,
    ) -> BookingResult<Vec<AppointmentView>> {
        let filter = match caller.role {
            Role::Admin => AppointmentFilter {
                student_id,
                owner_id: None,
            },
            Role::Staff | Role::Student if student_id.is_some_and(|id| id != caller.user_id) => {
                return Err(BookingError::Authorization(
                    "Only admins may view another student's appointments".to_string(),
                ));
            }
            Role::Staff => AppointmentFilter {
                student_id: None,
                owner_id: Some(caller.user_id),
            },
            Role::Student => AppointmentFilter {
                student_id: Some(caller.user_id),
                owner_id: None,
            },
        };

        let appointments = self.store.list_appointments(filter).await?;

        let mut views = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            views.push(self.appointment_view(appointment).await?);
        }
        Ok(views)
    }

    /// A student books one unit of a slot's capacity for themselves.
    pub async fn book(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<AppointmentView> {
        let appointment = self.claim(student_id, slot_id).await?;
        self.appointment_view(appointment).await
    }

    /// An admin books a slot on behalf of a student.
    pub async fn admin_assign(
        &self,
        caller: &Caller,
        slot_id: Uuid,
        student_id: Uuid,
    ) -> BookingResult<AppointmentView> {
        caller.require_admin()?;

        let appointment = self.claim(student_id, slot_id).await?;
        info!(
            "Appointment assigned by admin: id={}, admin_id={}",
            appointment.id, caller.user_id
        );
        self.appointment_view(appointment).await
    }

    pub async fn cancel(&self, caller: &Caller, appointment_id: Uuid) -> BookingResult<AppointmentView> {
        let appointment = self.require_appointment(appointment_id).await?;

        if caller.role == Role::Student && appointment.student_id != caller.user_id {
            return Err(BookingError::Authorization(
                "Students may only cancel their own appointments".to_string(),
            ));
        }
        if !appointment.is_booked() {
            return Err(BookingError::Conflict(reasons::ALREADY_CANCELLED.to_string()));
        }

        // The store only flips rows that are still booked, so a concurrent
        // cancel of the same appointment loses here.
        let cancelled = self
            .store
            .cancel_appointment(appointment_id)
            .await?
            .ok_or_else(|| BookingError::Conflict(reasons::ALREADY_CANCELLED.to_string()))?;

        info!(
            "Appointment cancelled: id={}, by={}",
            appointment_id, caller.user_id
        );
        self.appointment_view(cancelled).await
    }

    /// Moves an appointment to another student without touching its slot or
    /// status. Occupancy is unchanged, so capacity is not re-checked.
    pub async fn reassign(
        &self,
        caller: &Caller,
        appointment_id: Uuid,
        new_student_id: Uuid,
    ) -> BookingResult<AppointmentView> {
        caller.require_admin()?;

        let slot_id = self.require_appointment(appointment_id).await?.slot_id;
        let updated = {
            let _guard = self.locks.acquire(slot_id).await;

            // Re-read under the lock; a concurrent delete may have won.
            let appointment = self.require_appointment(appointment_id).await?;
            self.require_student(new_student_id).await?;

            let collision = self
                .store
                .find_booked(new_student_id, appointment.slot_id)
                .await?
                .is_some_and(|other| other.id != appointment.id);
            if collision {
                warn!(
                    "Reassign rejected: appointment_id={}, student_id={} already booked",
                    appointment_id, new_student_id
                );
                return Err(BookingError::Conflict(
                    reasons::STUDENT_ALREADY_BOOKED.to_string(),
                ));
            }

            self.store
                .set_appointment_student(appointment_id, new_student_id)
                .await?
                .ok_or_else(|| appointment_not_found(appointment_id))?
        };

        info!(
            "Appointment reassigned: id={}, student_id={}",
            appointment_id, new_student_id
        );
        self.appointment_view(updated).await
    }

    /// Permanently removes an appointment. Admins may delete any; staff only
    /// those on slots they own.
    pub async fn delete_appointment(&self, caller: &Caller, appointment_id: Uuid) -> BookingResult<bool> {
        caller.require_role(&[Role::Staff, Role::Admin])?;

        let appointment = self.require_appointment(appointment_id).await?;

        if !caller.is_admin() {
            let owns_slot = self
                .store
                .get_slot(appointment.slot_id)
                .await?
                .is_some_and(|slot| slot.owner_id == caller.user_id);
            if !owns_slot {
                return Err(BookingError::Authorization(
                    "Staff may only delete appointments on their own slots".to_string(),
                ));
            }
        }

        let deleted = self.store.delete_appointment(appointment_id).await?;
        if !deleted {
            return Err(appointment_not_found(appointment_id));
        }

        info!(
            "Appointment deleted: id={}, by={}",
            appointment_id, caller.user_id
        );
        Ok(deleted)
    }

    pub async fn list_users(&self, caller: &Caller, role: Option<Role>) -> BookingResult<Vec<User>> {
        caller.require_admin()?;
        self.store.list_users(role).await
    }

    pub async fn create_user(&self, caller: &Caller, request: CreateUserRequest) -> BookingResult<User> {
        caller.require_admin()?;

        let name = required("name", &request.name)?;
        let email = valid_email(&request.email)?;

        let user = self
            .store
            .create_user(NewUser {
                name,
                email,
                role: request.role.unwrap_or(Role::Student),
            })
            .await?;

        info!("User created: id={}, role={}", user.id, user.role);
        Ok(user)
    }

    pub async fn update_user(
        &self,
        caller: &Caller,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> BookingResult<User> {
        caller.require_admin()?;

        let changes = UserChanges {
            name: request.name.as_deref().map(|name| required("name", name)).transpose()?,
            email: request.email.as_deref().map(valid_email).transpose()?,
            role: request.role,
        };

        let user = self
            .store
            .update_user(user_id, changes)
            .await?
            .ok_or_else(|| user_not_found(user_id))?;

        info!("User updated: id={}, role={}", user.id, user.role);
        Ok(user)
    }

    /// Admin-facing account removal; see [`Ledger::delete_owner`].
    pub async fn delete_user(&self, caller: &Caller, user_id: Uuid) -> BookingResult<DeleteUserResponse> {
        caller.require_admin()?;

        if caller.user_id == user_id {
            return Err(BookingError::Validation(
                "Admins cannot delete their own account".to_string(),
            ));
        }
        self.require_user(user_id).await?;

        let summary = self.delete_owner(user_id).await?;
        Ok(DeleteUserResponse {
            id: user_id,
            appointments_removed: summary.appointments_removed,
            slots_removed: summary.slots_removed,
        })
    }

    /// Removes everything a user is attached to: their own appointments, the
    /// appointments on slots they own, those slots, and the user record.
    /// All of the user's slots stay locked until the cascade completes.
    pub async fn delete_owner(&self, user_id: Uuid) -> BookingResult<CascadeSummary> {
        let owned = self.store.list_slot_ids_by_owner(user_id).await?;
        debug!("Locking {} slots owned by user {}", owned.len(), user_id);

        let _guards = self.locks.acquire_many(owned).await;
        let summary = self.store.delete_user_cascade(user_id).await?;

        info!(
            "User removed: id={}, appointments_removed={}, slots_removed={}",
            user_id, summary.appointments_removed, summary.slots_removed
        );
        Ok(summary)
    }

    /// The serialized check-and-insert shared by Book and AdminAssign.
    async fn claim(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Appointment> {
        let _guard = self.locks.acquire(slot_id).await;

        let slot = self.require_slot(slot_id).await?;
        self.require_student(student_id).await?;

        if self.store.find_booked(student_id, slot_id).await?.is_some() {
            warn!(
                "Booking rejected: slot_id={}, student_id={} already booked",
                slot_id, student_id
            );
            return Err(BookingError::Conflict(reasons::ALREADY_BOOKED.to_string()));
        }

        let booked = self.store.count_booked(slot_id).await?;
        if booked >= i64::from(slot.max_bookings) {
            warn!(
                "Booking rejected: slot_id={} full ({}/{})",
                slot_id, booked, slot.max_bookings
            );
            return Err(BookingError::Conflict(reasons::SLOT_FULL.to_string()));
        }

        let appointment = self.store.insert_booking(student_id, slot_id).await?;
        info!(
            "Appointment booked: id={}, slot_id={}, student_id={}",
            appointment.id, slot_id, student_id
        );
        Ok(appointment)
    }

    async fn require_slot(&self, slot_id: Uuid) -> BookingResult<Slot> {
        self.store
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| slot_not_found(slot_id))
    }

    async fn require_appointment(&self, appointment_id: Uuid) -> BookingResult<Appointment> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| appointment_not_found(appointment_id))
    }

    async fn require_user(&self, user_id: Uuid) -> BookingResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn require_student(&self, student_id: Uuid) -> BookingResult<User> {
        let user = self
            .store
            .get_user(student_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Student with ID {} not found", student_id)))?;

        if user.role != Role::Student {
            return Err(BookingError::Validation(format!(
                "User {} is not a student",
                student_id
            )));
        }
        Ok(user)
    }

    async fn user_summary(&self, user_id: Uuid) -> BookingResult<Option<UserSummary>> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .as_ref()
            .map(UserSummary::from))
    }

    async fn slot_view(&self, slot: Slot) -> BookingResult<SlotView> {
        let current_bookings = self.store.count_booked(slot.id).await?;
        let owner = self.user_summary(slot.owner_id).await?;
        Ok(SlotView::new(slot, current_bookings, owner))
    }

    async fn appointment_view(&self, appointment: Appointment) -> BookingResult<AppointmentView> {
        let student = self.user_summary(appointment.student_id).await?;
        let slot = match self.store.get_slot(appointment.slot_id).await? {
            Some(slot) => Some(self.slot_view(slot).await?),
            None => None,
        };
        Ok(AppointmentView::new(appointment, student, slot))
    }
}

fn required(field: &str, value: &str) -> BookingResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookingError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn valid_email(email: &str) -> BookingResult<String> {
    let email = required("email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_lowercase()),
        _ => Err(BookingError::Validation(format!("Invalid email address: {}", email))),
    }
}

fn slot_not_found(slot_id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Slot with ID {} not found", slot_id))
}

fn appointment_not_found(appointment_id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Appointment with ID {} not found", appointment_id))
}

fn user_not_found(user_id: Uuid) -> BookingError {
    BookingError::NotFound(format!("User with ID {} not found", user_id))
}
