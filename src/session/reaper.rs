//! Background reclamation of idle sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::manager::SessionManager;

/// Default time between scans.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Periodically tears down sessions idle past the manager's timeout.
///
/// Nothing runs until [`start`](IdleReaper::start) is called, so a manager
/// can be exercised without a live background loop.
pub struct IdleReaper {
    manager: Arc<SessionManager>,
    interval: Duration,
    task: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl IdleReaper {
    pub fn new(manager: Arc<SessionManager>, interval: Duration) -> Self {
        Self {
            manager,
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|(_, handle)| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the scan loop. The first scan happens one interval from now.
    ///
    /// Calling `start` on a running reaper does nothing.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let manager = Arc::clone(&self.manager);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match manager.reap_expired(Instant::now()).await {
                            Ok(reaped) if !reaped.is_empty() => {
                                info!(count = reaped.len(), "idle sessions reclaimed");
                            }
                            Ok(_) => debug!("reaper tick: nothing idle"),
                            Err(e) => error!(error = %e, "reaper tick failed"),
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("reaper stopped");
        });

        debug!(interval_secs = period.as_secs(), "reaper started");
        self.task = Some((stop_tx, handle));
    }

    /// Signal the loop to stop and wait for it.
    ///
    /// A scan already in progress finishes first.
    pub async fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.task.take() {
            let _ = stop_tx.send(true);
            if let Err(e) = handle.await {
                error!(error = %e, "reaper task panicked");
            }
        }
    }
}

impl Drop for IdleReaper {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerConfig;
    use crate::multiplexer::{Geometry, Multiplexer};
    use crate::session::{CallerId, Session};
    use crate::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct KillLog(Mutex<Vec<String>>);

    #[async_trait]
    impl Multiplexer for KillLog {
        async fn create_session(&self, _: &str, _: Geometry, _: &str) -> Result<()> {
            Ok(())
        }

        async fn send_line(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn kill_session(&self, name: &str) -> Result<()> {
            self.0.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn list_sessions(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn manager(mux: Arc<KillLog>, timeout: Duration) -> Arc<SessionManager> {
        let config = ManagerConfig {
            idle_timeout: timeout,
            ..ManagerConfig::default()
        };
        Arc::new(SessionManager::new(mux, config))
    }

    #[tokio::test]
    async fn test_not_running_until_started() {
        let mux = Arc::new(KillLog::default());
        let mut reaper = IdleReaper::new(manager(mux, Duration::from_secs(60)), DEFAULT_REAP_INTERVAL);
        assert!(!reaper.is_running());
        reaper.start();
        assert!(reaper.is_running());
        reaper.stop().await;
        assert!(!reaper.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mux = Arc::new(KillLog::default());
        let mut reaper = IdleReaper::new(manager(mux, Duration::from_secs(60)), DEFAULT_REAP_INTERVAL);
        reaper.stop().await;
        assert!(!reaper.is_running());
    }

    #[tokio::test]
    async fn test_tick_reaps_expired_sessions() {
        let mux = Arc::new(KillLog::default());
        let manager = manager(mux.clone(), Duration::from_millis(20));
        manager
            .store()
            .insert(Session::new(CallerId::from("idle"), "relay_terminal_idle_1"))
            .unwrap();

        let mut reaper = IdleReaper::new(Arc::clone(&manager), Duration::from_millis(50));
        reaper.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        reaper.stop().await;

        assert_eq!(manager.active_sessions(), 0);
        assert_eq!(*mux.0.lock().unwrap(), vec!["relay_terminal_idle_1"]);
    }

    #[tokio::test]
    async fn test_tick_leaves_fresh_sessions() {
        let mux = Arc::new(KillLog::default());
        let manager = manager(mux.clone(), Duration::from_secs(3600));
        manager
            .store()
            .insert(Session::new(CallerId::from("busy"), "relay_terminal_busy_1"))
            .unwrap();

        let mut reaper = IdleReaper::new(Arc::clone(&manager), Duration::from_millis(20));
        reaper.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        reaper.stop().await;

        assert_eq!(manager.active_sessions(), 1);
        assert!(mux.0.lock().unwrap().is_empty());
    }
}
