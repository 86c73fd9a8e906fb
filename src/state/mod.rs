//! Session state: the authoritative service and its reactive mirror.

pub mod auth;
pub mod session;
