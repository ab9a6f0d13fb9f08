//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings, in the organisation's local time
//!   where they are shown to people.

pub mod admin;
pub mod auth;
pub mod election;
pub mod id;
pub mod member;
pub mod session;
