use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;

/// Capacity used when a slot is created without `max_bookings`.
pub const DEFAULT_MAX_BOOKINGS: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub max_bookings: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub max_bookings: Option<i32>,
    /// Admins may publish a slot on behalf of a staff member.
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub max_bookings: i32,
    pub current_bookings: i64,
    pub owner: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl SlotView {
    pub fn new(slot: Slot, current_bookings: i64, owner: Option<UserSummary>) -> Self {
        Self {
            id: slot.id,
            owner_id: slot.owner_id,
            title: slot.title,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            max_bookings: slot.max_bookings,
            current_bookings,
            owner,
            created_at: slot.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSlotResponse {
    pub id: Uuid,
    pub appointments_removed: u64,
}
