//! Reusable UI component modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Components read the session mirror from Leptos context and never talk to
//! storage or the network directly.

pub mod require_auth;
