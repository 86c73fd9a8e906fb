//! Utility helpers shared across the session layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate browser/environment concerns (storage, timers,
//! token decoding) from the session and view logic so both stay testable
//! off-browser.

pub mod guard;
pub mod storage;
pub mod timer;
pub mod token;
