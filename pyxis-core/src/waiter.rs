//! Poll-until-state primitive
//!
//! `wait_for_state` drives a remote object from a set of pending lifecycle
//! states into a set of target states by probing on a fixed cadence: one
//! probe immediately, a longer initial delay before the second, then a
//! constant minimum interval between the rest. The cadence matches what the
//! remote provisioning APIs expect and keeps the request rate predictable.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::status::LifecycleState;

/// One observation of a remote object.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    /// The remote reported a status.
    Status(LifecycleState),
    /// The remote reported a fatal condition alongside the status
    /// (e.g. an instance in ERROR with a fault message). Fails the wait
    /// immediately, whatever the pending/target sets say.
    Fault {
        state: LifecycleState,
        message: String,
    },
    /// The object was not found. Succeeds immediately when `Deleted` is a
    /// target state; otherwise keeps the poll alive (an object probed by
    /// scanning a parent's listing may simply not have materialized yet).
    Absent,
}

/// Parameters for one poll loop.
///
/// Invariant: `pending` and `target` are disjoint.
#[derive(Debug, Clone)]
pub struct PollSpec {
    /// States that keep the poll alive.
    pub pending: Vec<LifecycleState>,
    /// States that end the poll successfully.
    pub target: Vec<LifecycleState>,
    /// Sleep between the first and second probe.
    pub delay: Duration,
    /// Sleep between all subsequent probes.
    pub min_interval: Duration,
    /// Total wall-clock budget for the wait.
    pub timeout: Duration,
}

impl PollSpec {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(3);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    /// Create a spec with the default cadence (10s delay, 3s interval,
    /// 10 minute timeout).
    pub fn new(pending: Vec<LifecycleState>, target: Vec<LifecycleState>) -> Self {
        Self {
            pending,
            target,
            delay: Self::DEFAULT_DELAY,
            min_interval: Self::DEFAULT_MIN_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cadence(mut self, delay: Duration, min_interval: Duration) -> Self {
        self.delay = delay;
        self.min_interval = min_interval;
        self
    }
}

/// Ways a wait can fail.
#[derive(Debug, Error)]
pub enum WaitError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The timeout elapsed before a terminal state was observed.
    ///
    /// `last` is the most recent pending state, or `None` if the object was
    /// never observed at all (a scanned child that never appeared).
    #[error(
        "timed out after {}s waiting for target state (last observed: {})",
        elapsed.as_secs(),
        last.as_ref().map(|s| s.as_str()).unwrap_or("absent")
    )]
    Timeout {
        elapsed: Duration,
        last: Option<LifecycleState>,
    },

    /// The probe reported a state outside both the pending and target sets.
    #[error("unexpected state {state}{}", details.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    UnexpectedState {
        state: LifecycleState,
        details: Option<String>,
    },

    /// The probe itself failed.
    #[error("status probe failed: {0}")]
    Probe(#[source] E),
}

/// Poll `probe` until it reports a state in `spec.target`.
///
/// The probe is invoked immediately; a target state observed on the first
/// tick succeeds without any sleep. Pending states keep the loop alive.
/// Anything else fails fast: there is no retrying out of an error state.
pub async fn wait_for_state<F, Fut, E>(
    spec: &PollSpec,
    mut probe: F,
) -> Result<LifecycleState, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let started = Instant::now();
    let mut interval = spec.delay;
    let mut last: Option<LifecycleState> = None;

    loop {
        match probe().await.map_err(WaitError::Probe)? {
            Probe::Status(state) => {
                if spec.target.contains(&state) {
                    debug!(state = %state, "target state reached");
                    return Ok(state);
                }
                if !spec.pending.contains(&state) {
                    return Err(WaitError::UnexpectedState {
                        state,
                        details: None,
                    });
                }
                debug!(state = %state, elapsed = ?started.elapsed(), "still waiting");
                last = Some(state);
            }
            Probe::Fault { state, message } => {
                return Err(WaitError::UnexpectedState {
                    state,
                    details: Some(message),
                });
            }
            Probe::Absent => {
                if spec.target.contains(&LifecycleState::Deleted) {
                    debug!("object absent, treating as deleted");
                    return Ok(LifecycleState::Deleted);
                }
                debug!(elapsed = ?started.elapsed(), "object not observed yet, still waiting");
                last = None;
            }
        }

        tokio::time::sleep(interval).await;
        interval = spec.min_interval;

        let elapsed = started.elapsed();
        if elapsed >= spec.timeout {
            return Err(WaitError::Timeout { elapsed, last });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Error)]
    #[error("probe exploded")]
    struct ProbeFailed;

    fn spec(pending: &[LifecycleState], target: &[LifecycleState]) -> PollSpec {
        PollSpec::new(pending.to_vec(), target.to_vec())
    }

    /// Builds a probe that replays the given observations in order and
    /// panics if polled past the end of the script.
    fn scripted(
        observations: Vec<Probe>,
        polls: &Cell<usize>,
    ) -> impl FnMut() -> std::future::Ready<Result<Probe, ProbeFailed>> + '_ {
        let mut queue = observations.into_iter();
        move || {
            polls.set(polls.get() + 1);
            let next = queue.next().expect("probe called past end of script");
            std::future::ready(Ok(next))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target_after_pending_states() {
        let polls = Cell::new(0);
        let probe = scripted(
            vec![
                Probe::Status(LifecycleState::Build),
                Probe::Status(LifecycleState::Build),
                Probe::Status(LifecycleState::Active),
            ],
            &polls,
        );

        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active]);
        let state = wait_for_state(&spec, probe).await.unwrap();

        assert_eq!(state, LifecycleState::Active);
        assert_eq!(polls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn target_on_first_probe_succeeds_without_sleeping() {
        let polls = Cell::new(0);
        let probe = scripted(vec![Probe::Status(LifecycleState::Active)], &polls);

        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active]);
        let started = Instant::now();
        let state = wait_for_state(&spec, probe).await.unwrap();

        assert_eq!(state, LifecycleState::Active);
        assert_eq!(polls.get(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_state_always_polls_again() {
        let polls = Cell::new(0);
        let probe = scripted(
            vec![
                Probe::Status(LifecycleState::Build),
                Probe::Status(LifecycleState::Active),
            ],
            &polls,
        );

        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active]);
        wait_for_state(&spec, probe).await.unwrap();

        assert!(polls.get() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_stuck_in_pending() {
        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active])
            .with_timeout(Duration::from_secs(30));

        let result = wait_for_state(&spec, || {
            std::future::ready(Ok::<_, ProbeFailed>(Probe::Status(LifecycleState::Build)))
        })
        .await;

        match result {
            Err(WaitError::Timeout { elapsed, last }) => {
                assert!(elapsed >= Duration::from_secs(30));
                assert_eq!(last, Some(LifecycleState::Build));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn absent_succeeds_immediately_when_deleted_is_target() {
        let polls = Cell::new(0);
        let probe = scripted(vec![Probe::Absent], &polls);

        let spec = spec(
            &[LifecycleState::Active, LifecycleState::Shutoff],
            &[LifecycleState::Deleted],
        );
        let state = wait_for_state(&spec, probe).await.unwrap();

        assert_eq!(state, LifecycleState::Deleted);
        assert_eq!(polls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn absent_keeps_polling_when_deleted_not_target() {
        let polls = Cell::new(0);
        let probe = scripted(
            vec![Probe::Absent, Probe::Status(LifecycleState::Active)],
            &polls,
        );

        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active]);
        let state = wait_for_state(&spec, probe).await.unwrap();

        assert_eq!(state, LifecycleState::Active);
        assert_eq!(polls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn object_never_observed_times_out_with_absent_marker() {
        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active])
            .with_timeout(Duration::from_secs(20));

        let result =
            wait_for_state(&spec, || std::future::ready(Ok::<_, ProbeFailed>(Probe::Absent))).await;

        match result {
            Err(WaitError::Timeout { last: None, .. }) => {}
            other => panic!("expected timeout with no observation, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_state_fails_without_further_polling() {
        let polls = Cell::new(0);
        let probe = scripted(vec![Probe::Status(LifecycleState::Shutoff)], &polls);

        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active]);
        let result = wait_for_state(&spec, probe).await;

        match result {
            Err(WaitError::UnexpectedState { state, .. }) => {
                assert_eq!(state, LifecycleState::Shutoff);
            }
            other => panic!("expected unexpected-state error, got {other:?}"),
        }
        assert_eq!(polls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fault_fails_immediately_with_message() {
        let polls = Cell::new(0);
        let probe = scripted(
            vec![Probe::Fault {
                state: LifecycleState::Error,
                message: "quota exceeded".to_string(),
            }],
            &polls,
        );

        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active]);
        let result = wait_for_state(&spec, probe).await;

        match result {
            Err(WaitError::UnexpectedState { state, details }) => {
                assert_eq!(state, LifecycleState::Error);
                assert_eq!(details.as_deref(), Some("quota exceeded"));
            }
            other => panic!("expected fault to fail the wait, got {other:?}"),
        }
        assert_eq!(polls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_error_propagates() {
        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active]);
        let result =
            wait_for_state(&spec, || std::future::ready(Err::<Probe, _>(ProbeFailed))).await;

        assert!(matches!(result, Err(WaitError::Probe(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_uses_delay_then_min_interval() {
        let spec = spec(&[LifecycleState::Build], &[LifecycleState::Active])
            .with_cadence(Duration::from_secs(10), Duration::from_secs(3));

        let polls = Cell::new(0);
        let probe = scripted(
            vec![
                Probe::Status(LifecycleState::Build),
                Probe::Status(LifecycleState::Build),
                Probe::Status(LifecycleState::Active),
            ],
            &polls,
        );

        let started = Instant::now();
        wait_for_state(&spec, probe).await.unwrap();

        // first sleep is the delay (10s), second is the min interval (3s)
        assert_eq!(started.elapsed(), Duration::from_secs(13));
    }
}
