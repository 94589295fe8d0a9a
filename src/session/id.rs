//! Caller identity and backend session naming.

use std::fmt;

use chrono::{Local, NaiveDateTime};

/// Opaque identity of the user driving a session.
///
/// Whatever the chat transport uses to identify a sender; one caller owns
/// at most one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id with every character tmux dislikes in a target name
    /// replaced by `_`.
    pub fn backend_safe(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name a new backend session for `caller`, stamped with the local time.
pub fn session_name(prefix: &str, caller: &CallerId) -> String {
    session_name_at(prefix, caller, Local::now().naive_local())
}

/// Name a backend session as `<prefix>_<caller>_<YYYYmmddHHMMSS>`.
pub fn session_name_at(prefix: &str, caller: &CallerId, at: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        caller.backend_safe(),
        at.format("%Y%m%d%H%M%S")
    )
}
