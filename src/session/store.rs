//! Session storage.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::CallerId;
use crate::error::TerminalError;
use crate::Result;

/// One caller's persistent shell.
#[derive(Debug, Clone)]
pub struct Session {
    /// Owner of the session.
    pub caller: CallerId,
    /// Backend handle, unique across the process lifetime.
    pub name: String,
    /// Time when session was created.
    pub created_at: Instant,
    /// Time of the last dispatched command.
    pub last_active: Instant,
}

impl Session {
    /// Create a new session, active as of now.
    pub fn new(caller: CallerId, name: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            caller,
            name: name.into(),
            created_at: now,
            last_active: now,
        }
    }

    /// Update the last activity timestamp.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Get the idle duration since last activity.
    pub fn idle_duration(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Whether the session has been idle longer than `timeout` at `now`.
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_active) > timeout
    }
}

/// Thread-safe registry of sessions keyed by caller.
///
/// The single source of truth for whether a caller has a session.
pub struct SessionStore {
    sessions: RwLock<HashMap<CallerId, Session>>,
}

impl SessionStore {
    /// Create a new empty session store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get a clone of the caller's session.
    pub fn get(&self, caller: &CallerId) -> Result<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TerminalError::LockPoisoned)?;
        Ok(sessions.get(caller).cloned())
    }

    /// Check if the caller has a session.
    pub fn contains(&self, caller: &CallerId) -> Result<bool> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TerminalError::LockPoisoned)?;
        Ok(sessions.contains_key(caller))
    }

    /// Register a session.
    ///
    /// Fails with `AlreadyActive` if the caller already has one; the
    /// existing session is left untouched.
    pub fn insert(&self, session: Session) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TerminalError::LockPoisoned)?;

        if sessions.contains_key(&session.caller) {
            return Err(TerminalError::AlreadyActive(session.caller.to_string()));
        }
        sessions.insert(session.caller.clone(), session);
        Ok(())
    }

    /// Update a session using a closure.
    ///
    /// Returns `NoActiveSession` if the caller has none.
    pub fn update<F>(&self, caller: &CallerId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TerminalError::LockPoisoned)?;

        let session = sessions
            .get_mut(caller)
            .ok_or_else(|| TerminalError::NoActiveSession(caller.to_string()))?;

        f(session);
        Ok(())
    }

    /// Mark the caller's session as active now, returning its backend name.
    pub fn touch(&self, caller: &CallerId) -> Result<String> {
        let mut name = String::new();
        self.update(caller, |s| {
            s.touch();
            name = s.name.clone();
        })?;
        Ok(name)
    }

    /// Remove the caller's session.
    ///
    /// Returns the removed session, or None if it didn't exist.
    pub fn remove(&self, caller: &CallerId) -> Result<Option<Session>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TerminalError::LockPoisoned)?;
        Ok(sessions.remove(caller))
    }

    /// Callers whose sessions have been idle longer than `timeout`.
    pub fn list_expired(&self, now: Instant, timeout: Duration) -> Result<Vec<CallerId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TerminalError::LockPoisoned)?;
        Ok(sessions
            .values()
            .filter(|s| s.is_expired(now, timeout))
            .map(|s| s.caller.clone())
            .collect())
    }

    /// Remove and return every session.
    pub fn drain(&self) -> Result<Vec<Session>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| TerminalError::LockPoisoned)?;
        Ok(sessions.drain().map(|(_, s)| s).collect())
    }

    /// Get the number of sessions in the store.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// List all callers with a session.
    pub fn callers(&self) -> Result<Vec<CallerId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TerminalError::LockPoisoned)?;
        Ok(sessions.keys().cloned().collect())
    }

    /// Backend names of every stored session.
    pub fn session_names(&self) -> Result<Vec<String>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| TerminalError::LockPoisoned)?;
        Ok(sessions.values().map(|s| s.name.clone()).collect())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(caller: &str) -> Session {
        Session::new(CallerId::from(caller), format!("relay_{}", caller))
    }

    #[test]
    fn test_insert_and_get() {
        let store = SessionStore::new();
        store.insert(session("u1")).unwrap();

        let got = store.get(&CallerId::from("u1")).unwrap().unwrap();
        assert_eq!(got.name, "relay_u1");
        assert!(store.contains(&CallerId::from("u1")).unwrap());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let store = SessionStore::new();
        assert!(store.get(&CallerId::from("ghost")).unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_keeps_original() {
        let store = SessionStore::new();
        store.insert(session("u1")).unwrap();

        let dup = Session::new(CallerId::from("u1"), "other");
        let err = store.insert(dup).unwrap_err();
        assert!(matches!(err, TerminalError::AlreadyActive(_)));

        let got = store.get(&CallerId::from("u1")).unwrap().unwrap();
        assert_eq!(got.name, "relay_u1");
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_touch_returns_name() {
        let store = SessionStore::new();
        store.insert(session("u1")).unwrap();
        let caller = CallerId::from("u1");

        let before = store.get(&caller).unwrap().unwrap().last_active;
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.touch(&caller).unwrap(), "relay_u1");
        let after = store.get(&caller).unwrap().unwrap().last_active;
        assert!(after > before);
    }

    #[test]
    fn test_touch_nonexistent() {
        let store = SessionStore::new();
        let err = store.touch(&CallerId::from("ghost")).unwrap_err();
        assert!(matches!(err, TerminalError::NoActiveSession(_)));
    }

    #[test]
    fn test_remove_session() {
        let store = SessionStore::new();
        store.insert(session("u1")).unwrap();

        let removed = store.remove(&CallerId::from("u1")).unwrap();
        assert_eq!(removed.unwrap().name, "relay_u1");
        assert!(store.remove(&CallerId::from("u1")).unwrap().is_none());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_list_expired() {
        let store = SessionStore::new();
        store.insert(session("old")).unwrap();
        store.insert(session("fresh")).unwrap();

        let later = Instant::now() + Duration::from_secs(31 * 60);
        let timeout = Duration::from_secs(30 * 60);
        store
            .update(&CallerId::from("fresh"), |s| s.last_active = later)
            .unwrap();

        let expired = store.list_expired(later, timeout).unwrap();
        assert_eq!(expired, vec![CallerId::from("old")]);
    }

    #[test]
    fn test_is_expired_boundary() {
        let s = session("u1");
        let timeout = Duration::from_secs(60);
        assert!(!s.is_expired(s.last_active + timeout, timeout));
        assert!(s.is_expired(s.last_active + timeout + Duration::from_millis(1), timeout));
        // a `now` earlier than last_active never counts as expired
        assert!(!s.is_expired(s.created_at, Duration::ZERO));
    }

    #[test]
    fn test_drain() {
        let store = SessionStore::new();
        store.insert(session("a")).unwrap();
        store.insert(session("b")).unwrap();

        let mut names: Vec<_> = store.drain().unwrap().into_iter().map(|s| s.name).collect();
        names.sort();
        assert_eq!(names, vec!["relay_a", "relay_b"]);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_callers_and_names() {
        let store = SessionStore::new();
        store.insert(session("a")).unwrap();
        store.insert(session("b")).unwrap();

        let mut callers = store.callers().unwrap();
        callers.sort();
        assert_eq!(callers, vec![CallerId::from("a"), CallerId::from("b")]);
        assert_eq!(store.session_names().unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_same_caller() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .insert(Session::new(CallerId::from("shared"), format!("s{}", i)))
                        .is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(store.count(), 1);
    }
}
