// Utility functions

pub mod logger;
pub mod password;

pub use logger::*;
pub use password::*;
