pub mod appointment;
pub mod enums;
pub mod patient;
pub mod physician;

pub use appointment::*;
pub use patient::*;
pub use physician::*;
