//! # Slotbook Core
//!
//! Domain types, the error taxonomy and the booking ledger shared by the
//! database and API crates.

pub mod errors;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod store;
