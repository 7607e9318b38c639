//! Readiness polling.
//!
//! A fixed-interval, deadline-bounded loop over a check. The first check
//! runs immediately; later checks run every `interval` until a terminal
//! state is reached or the deadline passes. The last check lands on the
//! deadline itself.
//!
//! ```text
//!            ┌──────────── Pending ◄───┐
//!            │     │      │     │      │ check again
//!            ▼     ▼      ▼     ▼      │
//!         Ready  Absent Failed TimedOut
//! ```

use crate::backend::{ClusterInfo, ClusterManager, ClusterState};
use crate::runtime::options::PollOptions;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// State of one wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Ready,
    Absent,
    TimedOut,
    Failed(String),
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Pending)
    }

    /// Only `Pending` moves; terminal states are final.
    pub fn can_transition_to(&self, next: &PollState) -> bool {
        matches!(self, PollState::Pending) || self == next
    }
}

/// What the wait is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Until the object reports ready. Disappearing ends the wait as `Absent`.
    UntilReady,
    /// Until the object is gone. Success is `Absent`.
    UntilAbsent,
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Ready,
    Pending,
    Absent,
    Failed(String),
}

impl Observation {
    fn into_state(self, mode: PollMode) -> PollState {
        match (mode, self) {
            (_, Observation::Failed(reason)) => PollState::Failed(reason),
            (_, Observation::Absent) => PollState::Absent,
            (PollMode::UntilReady, Observation::Ready) => PollState::Ready,
            (PollMode::UntilReady, Observation::Pending)
            | (PollMode::UntilAbsent, Observation::Ready | Observation::Pending) => {
                PollState::Pending
            }
        }
    }
}

/// Map a cluster lookup onto a check observation.
pub fn observe_cluster(info: Option<&ClusterInfo>) -> Observation {
    match info.map(|c| &c.state) {
        None => Observation::Absent,
        Some(ClusterState::Ready) => Observation::Ready,
        Some(ClusterState::Error) => Observation::Failed("cluster is in error state".to_string()),
        Some(_) => Observation::Pending,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoller {
    interval: Duration,
    timeout: Duration,
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::from_options(&PollOptions::default())
    }
}

impl ReadinessPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_options(options: &PollOptions) -> Self {
        Self::new(options.interval, options.timeout)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll until a terminal state.
    ///
    /// A check error is `Absent` when it is a not-found error and `Failed`
    /// otherwise. Never returns `Pending`.
    pub async fn poll<F, Fut>(&self, resource: &str, mode: PollMode, mut check: F) -> PollState
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ForgeResult<Observation>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut state = PollState::Pending;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let observed = match check().await {
                Ok(observation) => observation,
                Err(e) if e.is_not_found() => Observation::Absent,
                Err(e) => Observation::Failed(e.to_string()),
            };

            let next = observed.into_state(mode);
            debug_assert!(state.can_transition_to(&next));
            if next != state {
                tracing::debug!(resource, ?mode, from = ?state, to = ?next, "poll state changed");
            }
            state = next;

            if state.is_terminal() {
                tracing::info!(resource, ?mode, state = ?state, attempts, "poll finished");
                return state;
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    resource,
                    ?mode,
                    timeout = ?self.timeout,
                    attempts,
                    "poll timed out"
                );
                return PollState::TimedOut;
            }
            tokio::time::sleep_until((now + self.interval).min(deadline)).await;
        }
    }

    /// Wait for a cluster to become ready.
    pub async fn wait_cluster_ready(
        &self,
        manager: &dyn ClusterManager,
        cluster_id: &str,
    ) -> ForgeResult<()> {
        let resource = format!("cluster {cluster_id}");
        let state = self
            .poll(&resource, PollMode::UntilReady, move || async move {
                let info = manager.get_cluster(cluster_id).await?;
                Ok(observe_cluster(info.as_ref()))
            })
            .await;
        self.finish(resource, PollMode::UntilReady, state)
    }

    /// Wait for a cluster to disappear from the backend.
    pub async fn wait_cluster_absent(
        &self,
        manager: &dyn ClusterManager,
        cluster_id: &str,
    ) -> ForgeResult<()> {
        let resource = format!("cluster {cluster_id}");
        let state = self
            .poll(&resource, PollMode::UntilAbsent, move || async move {
                let info = manager.get_cluster(cluster_id).await?;
                // Anything still listed, error state included, is not gone yet.
                Ok(match info {
                    None => Observation::Absent,
                    Some(_) => Observation::Pending,
                })
            })
            .await;
        self.finish(resource, PollMode::UntilAbsent, state)
    }

    fn finish(&self, resource: String, mode: PollMode, state: PollState) -> ForgeResult<()> {
        match (mode, state) {
            (PollMode::UntilReady, PollState::Ready)
            | (PollMode::UntilAbsent, PollState::Absent) => Ok(()),
            (PollMode::UntilReady, PollState::Absent) => Err(ForgeError::NotFound(resource)),
            (_, PollState::TimedOut) => Err(ForgeError::ReadinessTimeout {
                resource,
                timeout: self.timeout,
            }),
            (_, PollState::Failed(reason)) => {
                Err(ForgeError::Backend(format!("{resource}: {reason}")))
            }
            (_, other) => Err(ForgeError::Internal(format!(
                "{resource}: poll ended in {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockClusterManager;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn poller() -> ReadinessPoller {
        ReadinessPoller::new(Duration::from_secs(30), Duration::from_secs(100))
    }

    #[test]
    fn terminal_states_do_not_move() {
        assert!(PollState::Pending.can_transition_to(&PollState::Ready));
        assert!(PollState::Pending.can_transition_to(&PollState::TimedOut));
        assert!(!PollState::Ready.can_transition_to(&PollState::Pending));
        assert!(!PollState::Absent.can_transition_to(&PollState::Ready));
        assert!(PollState::Failed("x".into()).is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_first_check_returns_immediately() {
        let start = Instant::now();
        let state = poller()
            .poll("cluster a", PollMode::UntilReady, || async { Ok(Observation::Ready) })
            .await;
        assert_eq!(state, PollState::Ready);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_the_deadline() {
        let checks = Arc::new(Mutex::new(0u32));
        let start = Instant::now();
        let counter = Arc::clone(&checks);
        let state = poller()
            .poll("cluster a", PollMode::UntilReady, move || {
                let counter = Arc::clone(&counter);
                async move {
                    *counter.lock() += 1;
                    Ok(Observation::Pending)
                }
            })
            .await;

        assert_eq!(state, PollState::TimedOut);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(100));
        assert!(elapsed <= Duration::from_secs(130));
        // 0s, 30s, 60s, 90s, then the deadline.
        assert_eq!(*checks.lock(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn becomes_ready_after_some_checks() {
        let checks = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&checks);
        let start = Instant::now();
        let state = poller()
            .poll("cluster a", PollMode::UntilReady, move || {
                let counter = Arc::clone(&counter);
                async move {
                    let mut n = counter.lock();
                    *n += 1;
                    Ok(if *n == 3 { Observation::Ready } else { Observation::Pending })
                }
            })
            .await;
        assert_eq!(state, PollState::Ready);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_fail_and_not_found_is_absent() {
        let failed = poller()
            .poll("cluster a", PollMode::UntilReady, || async {
                Err(ForgeError::Backend("HTTP 500".into()))
            })
            .await;
        assert!(matches!(failed, PollState::Failed(msg) if msg.contains("HTTP 500")));

        let absent = poller()
            .poll("cluster a", PollMode::UntilReady, || async {
                Err(ForgeError::NotFound("cluster a".into()))
            })
            .await;
        assert_eq!(absent, PollState::Absent);
    }

    #[tokio::test(start_paused = true)]
    async fn until_absent_waits_through_existing_states() {
        let checks = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&checks);
        let state = poller()
            .poll("cluster a", PollMode::UntilAbsent, move || {
                let counter = Arc::clone(&counter);
                async move {
                    let mut n = counter.lock();
                    *n += 1;
                    Ok(if *n < 3 { Observation::Ready } else { Observation::Absent })
                }
            })
            .await;
        assert_eq!(state, PollState::Absent);
        assert_eq!(*checks.lock(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_cluster_while_waiting_for_ready_is_not_found() {
        let mut manager = MockClusterManager::new();
        manager.expect_get_cluster().returning(|_| Ok(None));
        let err = poller().wait_cluster_ready(&manager, "abc").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn cluster_timeout_surfaces_readiness_timeout() {
        let mut manager = MockClusterManager::new();
        manager.expect_get_cluster().returning(|id| {
            Ok(Some(ClusterInfo {
                id: id.to_string(),
                name: "rhcs-sts".into(),
                state: ClusterState::Installing,
            }))
        });
        let err = poller().wait_cluster_ready(&manager, "abc").await.unwrap_err();
        assert!(err.is_readiness_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn cluster_error_state_fails_the_wait() {
        let mut manager = MockClusterManager::new();
        manager.expect_get_cluster().returning(|id| {
            Ok(Some(ClusterInfo {
                id: id.to_string(),
                name: "rhcs-sts".into(),
                state: ClusterState::Error,
            }))
        });
        let err = poller().wait_cluster_ready(&manager, "abc").await.unwrap_err();
        assert!(matches!(err, ForgeError::Backend(_)));
    }
}
