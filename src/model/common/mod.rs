//! Types and logic shared between the database and API representations.

pub mod date;
pub mod election;
