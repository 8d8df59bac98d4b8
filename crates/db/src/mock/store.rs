use async_trait::async_trait;
use mockall::mock;
use slotbook_core::{
    errors::BookingResult,
    models::{
        appointment::Appointment,
        slot::Slot,
        user::{Role, User},
    },
    store::{AppointmentFilter, CascadeSummary, LedgerStore, NewSlot, NewUser, UserChanges},
};
use uuid::Uuid;

// Mock store for testing ledger behaviour around store failures
mock! {
    pub Store {}

    #[async_trait]
    impl LedgerStore for Store {
        async fn get_user(&self, id: Uuid) -> BookingResult<Option<User>>;

        async fn list_users(&self, role: Option<Role>) -> BookingResult<Vec<User>>;

        async fn create_user(&self, user: NewUser) -> BookingResult<User>;

        async fn update_user(&self, id: Uuid, changes: UserChanges) -> BookingResult<Option<User>>;

        async fn delete_user_cascade(&self, id: Uuid) -> BookingResult<CascadeSummary>;

        async fn get_slot(&self, id: Uuid) -> BookingResult<Option<Slot>>;

        async fn list_slots(&self) -> BookingResult<Vec<Slot>>;

        async fn list_slot_ids_by_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Uuid>>;

        async fn create_slot(&self, slot: NewSlot) -> BookingResult<Slot>;

        async fn delete_slot_cascade(&self, id: Uuid) -> BookingResult<Option<u64>>;

        async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>>;

        async fn list_appointments(&self, filter: AppointmentFilter) -> BookingResult<Vec<Appointment>>;

        async fn count_booked(&self, slot_id: Uuid) -> BookingResult<i64>;

        async fn find_booked(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Option<Appointment>>;

        async fn insert_booking(&self, student_id: Uuid, slot_id: Uuid) -> BookingResult<Appointment>;

        async fn cancel_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>>;

        async fn set_appointment_student(&self, id: Uuid, student_id: Uuid) -> BookingResult<Option<Appointment>>;

        async fn delete_appointment(&self, id: Uuid) -> BookingResult<bool>;
    }
}
