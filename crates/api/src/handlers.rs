pub mod appointments;
pub mod slots;
pub mod users;
