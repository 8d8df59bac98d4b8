//! In-process [`LedgerStore`] backed by hash maps.
//!
//! Every method works on the tables under a single mutex, which gives the
//! conditional insert and the cascades the same all-or-nothing behaviour as
//! the PostgreSQL transactions in [`crate::store::PgStore`]. Lookups yield to
//! the scheduler first so concurrent ledger calls interleave between steps
//! the way they would against a real database.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use slotbook_core::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::{Appointment, AppointmentStatus},
        slot::Slot,
        user::{Role, User},
    },
    store::{AppointmentFilter, CascadeSummary, LedgerStore, NewSlot, NewUser, UserChanges, reasons},
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    slots: HashMap<Uuid, Slot>,
    appointments: HashMap<Uuid, Appointment>,
}

impl Tables {
    fn booked_on(&self, slot_id: Uuid) -> impl Iterator<Item = &Appointment> {
        self.appointments
            .values()
            .filter(move |a| a.slot_id == slot_id && a.is_booked())
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

fn student_not_found(student_id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Student with ID {} not found", student_id))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_user(&self, id: Uuid) -> BookingResult<Option<User>> {
        tokio::task::yield_now().await;
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> BookingResult<Vec<User>> {
        let mut users: Vec<User> = self
            .tables()
            .users
            .values()
            .filter(|u| role.is_none_or(|role| u.role == role))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn create_user(&self, new_user: NewUser) -> BookingResult<User> {
        let mut tables = self.tables();
        if tables.email_taken(&new_user.email, None) {
            return Err(BookingError::Conflict(reasons::EMAIL_IN_USE.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> BookingResult<Option<User>> {
        let mut tables = self.tables();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(BookingError::Conflict(reasons::EMAIL_IN_USE.to_string()));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user_cascade(&self, id: Uuid) -> BookingResult<CascadeSummary> {
        let mut tables = self.tables();

        let owned: Vec<Uuid> = tables
            .slots
            .values()
            .filter(|s| s.owner_id == id)
            .map(|s| s.id)
            .collect();

        let before = tables.appointments.len();
        tables.appointments.retain(|_, a| a.student_id != id);
        tables.appointments.retain(|_, a| !owned.contains(&a.slot_id));
        let appointments_removed = (before - tables.appointments.len()) as u64;

        for slot_id in &owned {
            tables.slots.remove(slot_id);
        }
        let user_removed = tables.users.remove(&id).is_some();

        Ok(CascadeSummary {
            appointments_removed,
            slots_removed: owned.len() as u64,
            user_removed,
        })
    }

    async fn get_slot(&self, id: Uuid) -> BookingResult<Option<Slot>> {
        tokio::task::yield_now().await;
        Ok(self.tables().slots.get(&id).cloned())
    }

    async fn list_slots(&self) -> BookingResult<Vec<Slot>> {
        let mut slots: Vec<Slot> = self.tables().slots.values().cloned().collect();
        slots.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
        Ok(slots)
    }

    async fn list_slot_ids_by_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Uuid>> {
        Ok(self
            .tables()
            .slots
            .values()
            .filter(|s| s.owner_id == owner_id)
            .map(|s| s.id)
            .collect())
    }

    async fn create_slot(&self, new_slot: NewSlot) -> BookingResult<Slot> {
        let mut tables = self.tables();
        if !tables.users.contains_key(&new_slot.owner_id) {
            return Err(BookingError::NotFound(format!(
                "User with ID {} not found",
                new_slot.owner_id
            )));
        }

        let slot = Slot {
            id: Uuid::new_v4(),
            owner_id: new_slot.owner_id,
            title: new_slot.title,
            date: new_slot.date,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            max_bookings: new_slot.max_bookings,
            created_at: Utc::now(),
        };
        tables.slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn delete_slot_cascade(&self, id: Uuid) -> BookingResult<Option<u64>> {
        let mut tables = self.tables();
        if !tables.slots.contains_key(&id) {
            return Ok(None);
        }

        let before = tables.appointments.len();
        tables.appointments.retain(|_, a| a.slot_id != id);
        let removed = (before - tables.appointments.len()) as u64;

        tables.slots.remove(&id);
        Ok(Some(removed))
    }

    async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>> {
        tokio::task::yield_now().await;
        Ok(self.tables().appointments.get(&id).cloned())
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> BookingResult<Vec<Appointment>> {
        let tables = self.tables();
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| filter.student_id.is_none_or(|id| a.student_id == id))
            .filter(|a| {
                filter.owner_id.is_none_or(|owner_id| {
                    tables
                        .slots
                        .get(&a.slot_id)
                        .is_some_and(|s| s.owner_id == owner_id)
                })
            })
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    async fn count_booked(&self, slot_id: Uuid) -> BookingResult<i64> {
        tokio::task::yield_now().await;
        Ok(self.tables().booked_on(slot_id).count() as i64)
    }

    async fn find_booked(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Option<Appointment>> {
        tokio::task::yield_now().await;
        Ok(self
            .tables()
            .booked_on(slot_id)
            .find(|a| a.student_id == student_id)
            .cloned())
    }

    async fn insert_booking(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Appointment> {
        let mut tables = self.tables();

        let slot = tables
            .slots
            .get(&slot_id)
            .ok_or_else(|| BookingError::NotFound(format!("Slot with ID {} not found", slot_id)))?;
        let max_bookings = i64::from(slot.max_bookings);

        // The student may have been removed since the ledger looked them up.
        if !tables.users.contains_key(&student_id) {
            return Err(student_not_found(student_id));
        }
        if tables.booked_on(slot_id).any(|a| a.student_id == student_id) {
            return Err(BookingError::Conflict(reasons::ALREADY_BOOKED.to_string()));
        }
        if tables.booked_on(slot_id).count() as i64 >= max_bookings {
            return Err(BookingError::Conflict(reasons::SLOT_FULL.to_string()));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            student_id,
            slot_id,
            status: AppointmentStatus::Booked,
            created_at: Utc::now(),
        };
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn cancel_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>> {
        let mut tables = self.tables();
        match tables.appointments.get_mut(&id) {
            Some(appointment) if appointment.is_booked() => {
                appointment.status = AppointmentStatus::Cancelled;
                Ok(Some(appointment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_appointment_student(
        &self,
        id: Uuid,
        student_id: Uuid,
    ) -> BookingResult<Option<Appointment>> {
        let mut tables = self.tables();

        let Some(current) = tables.appointments.get(&id).cloned() else {
            return Ok(None);
        };
        if !tables.users.contains_key(&student_id) {
            return Err(student_not_found(student_id));
        }
        if current.is_booked()
            && tables
                .booked_on(current.slot_id)
                .any(|a| a.student_id == student_id && a.id != id)
        {
            return Err(BookingError::Conflict(
                reasons::STUDENT_ALREADY_BOOKED.to_string(),
            ));
        }

        let appointment = tables
            .appointments
            .get_mut(&id)
            .map(|a| {
                a.student_id = student_id;
                a.clone()
            });
        Ok(appointment)
    }

    async fn delete_appointment(&self, id: Uuid) -> BookingResult<bool> {
        Ok(self.tables().appointments.remove(&id).is_some())
    }
}
