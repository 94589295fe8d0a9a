//! Command safety filtering.
//!
//! Commands are screened against a fixed denylist before anything reaches
//! the shell. The denylist is advisory hardening and not an isolation
//! boundary.
//!
//! ## Example
//!
//! ```rust
//! use tmux_relay::security::{is_safe, SafetyFilter};
//!
//! assert!(is_safe("ls -la"));
//! assert!(!is_safe("sudo reboot"));
//!
//! let filter = SafetyFilter::with_patterns(["mkfs"]).unwrap();
//! assert!(filter.check("mkfs /dev/sda").is_err());
//! ```

pub mod denylist;

pub use denylist::{is_safe, sanitize_for_display, BlockReason, DenyRule, SafetyFilter};
