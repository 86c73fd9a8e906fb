//! Networking modules for the auth endpoints.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles REST calls and `types` defines the auth wire schema and the
//! normalized identity model shared by every other module.

pub mod api;
pub mod types;
