//! API endpoint handlers, one module per resource.

pub mod appointments;
pub mod health;
pub mod patients;
pub mod physicians;
pub mod users;
