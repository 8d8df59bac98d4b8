use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotbook_core::{
    errors::BookingError,
    models::{appointment::Appointment, slot::Slot, user::User},
};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSlot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub max_bookings: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub slot_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = BookingError;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

impl From<DbSlot> for Slot {
    fn from(row: DbSlot) -> Self {
        Slot {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            max_bookings: row.max_bookings,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = BookingError;

    fn try_from(row: DbAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            student_id: row.student_id,
            slot_id: row.slot_id,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}
