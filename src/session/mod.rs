//! Session management module.
//!
//! This module provides caller identity, the in-memory session registry,
//! and the background reaper for idle sessions.

mod id;
mod reaper;
mod store;

pub use id::{session_name, session_name_at, CallerId};
pub use reaper::{IdleReaper, DEFAULT_REAP_INTERVAL};
pub use store::{Session, SessionStore};
