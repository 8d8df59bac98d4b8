#[path = "../test_utils.rs"]
mod test_utils;

mod appointments_test;
mod middleware_test;
mod slots_test;
mod users_test;
