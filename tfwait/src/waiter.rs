//! The status poll loop
//!
//! [`wait_for_state`] drives a status prober until the observed state lands
//! in the target set, the failure set, or the timeout elapses. The probe and
//! the inter-poll sleep are both raced against the context's cancellation
//! signal and the overall deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

use crate::context::Context;
use crate::error::{ProbeError, WaitError};
use crate::refresh::{Probe, WaitOutcome};
use crate::state::{Classification, NotFoundPolicy, WaitSpec};

/// Last observation, kept for diagnostics
struct Observed<T> {
    state: Option<String>,
    resource: Option<T>,
}

impl<T> Observed<T> {
    fn timeout(self, spec: &WaitSpec, elapsed: Duration) -> WaitError<T> {
        tracing::warn!(
            timeout = ?spec.timeout,
            last_state = self.state.as_deref().unwrap_or(""),
            "timed out waiting for target state"
        );
        WaitError::Timeout {
            timeout: spec.timeout,
            elapsed,
            target: spec.target.clone(),
            last_state: self.state,
            last: self.resource,
            last_error: None,
        }
    }

    fn cancelled(self, ctx: &Context, elapsed: Duration) -> WaitError<T> {
        tracing::debug!(elapsed = ?elapsed, "wait cancelled");
        WaitError::Cancelled {
            elapsed,
            deadline_exceeded: ctx.deadline_exceeded(),
            last_state: self.state,
            last: self.resource,
        }
    }
}

/// Poll `refresh` until the resource reaches a state in `spec.target`.
///
/// Returns the last observed resource on success. Every way the wait can
/// stop short of the target is a distinct [`WaitError`] variant.
pub async fn wait_for_state<T, F, Fut>(
    ctx: &Context,
    spec: &WaitSpec,
    mut refresh: F,
) -> Result<WaitOutcome<T>, WaitError<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, ProbeError>>,
{
    spec.validate().map_err(WaitError::InvalidSpec)?;

    let started = Instant::now();
    let deadline = started + spec.timeout;

    let mut observed: Observed<T> = Observed {
        state: None,
        resource: None,
    };
    let mut probes = 0u32;
    let mut not_found_ticks = 0u32;
    let mut target_occurrences = 0u32;
    let mut interval: Option<Duration> = None;

    if !spec.delay.is_zero() {
        tracing::debug!(delay = ?spec.delay, "delaying first status probe");
        let delay = spec.delay.min(deadline.saturating_duration_since(started));
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(observed.cancelled(ctx, started.elapsed())),
            _ = time::sleep(delay) => {}
        }
    }

    loop {
        if ctx.is_cancelled() {
            return Err(observed.cancelled(ctx, started.elapsed()));
        }
        if Instant::now() >= deadline {
            return Err(observed.timeout(spec, started.elapsed()));
        }

        probes += 1;
        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(observed.cancelled(ctx, started.elapsed())),
            _ = time::sleep_until(deadline) => return Err(observed.timeout(spec, started.elapsed())),
            result = refresh() => result,
        };

        match result {
            Err(error) => {
                tracing::debug!(attempt = probes, error = %error, "status probe failed");
                return Err(WaitError::Probe {
                    error,
                    elapsed: started.elapsed(),
                    last_state: observed.state,
                    last: observed.resource,
                });
            }
            Ok(Probe::NotFound) => {
                target_occurrences = 0;
                not_found_ticks += 1;
                tracing::debug!(attempt = probes, "resource not found");

                match spec.not_found {
                    NotFoundPolicy::Success => {
                        tracing::info!(
                            probes,
                            elapsed = ?started.elapsed(),
                            "resource is gone"
                        );
                        return Ok(WaitOutcome {
                            resource: None,
                            state: None,
                            probes,
                            not_found_checks: not_found_ticks,
                            elapsed: started.elapsed(),
                        });
                    }
                    NotFoundPolicy::Retry(checks) if not_found_ticks <= checks => {}
                    NotFoundPolicy::Retry(_) | NotFoundPolicy::Fail => {
                        tracing::warn!(
                            checks = not_found_ticks,
                            last_state = observed.state.as_deref().unwrap_or(""),
                            "resource not found"
                        );
                        return Err(WaitError::NotFound {
                            checks: not_found_ticks,
                            elapsed: started.elapsed(),
                            last_state: observed.state,
                            last: observed.resource,
                        });
                    }
                }
            }
            Ok(Probe::Found { resource, status }) => {
                not_found_ticks = 0;
                tracing::debug!(attempt = probes, state = %status, "observed resource state");

                match spec.classify(&status) {
                    Classification::Target => {
                        target_occurrences += 1;
                        if target_occurrences >= spec.continuous_target_occurrence {
                            tracing::info!(
                                state = %status,
                                probes,
                                elapsed = ?started.elapsed(),
                                "resource reached target state"
                            );
                            return Ok(WaitOutcome {
                                resource: Some(resource),
                                state: Some(status),
                                probes,
                                not_found_checks: 0,
                                elapsed: started.elapsed(),
                            });
                        }
                    }
                    Classification::Pending => {
                        target_occurrences = 0;
                    }
                    Classification::Failure => {
                        tracing::warn!(state = %status, "resource reached failure state");
                        return Err(WaitError::FailureState {
                            state: status,
                            elapsed: started.elapsed(),
                            last: Some(resource),
                            last_error: None,
                        });
                    }
                    Classification::Unexpected => {
                        tracing::warn!(state = %status, "resource reached unexpected state");
                        return Err(WaitError::UnexpectedState {
                            state: status,
                            target: spec.target.clone(),
                            elapsed: started.elapsed(),
                            last: Some(resource),
                            last_error: None,
                        });
                    }
                }

                observed = Observed {
                    state: Some(status),
                    resource: Some(resource),
                };
            }
        }

        let wait = spec.next_interval(interval);
        interval = Some(wait);

        if ctx.is_cancelled() {
            return Err(observed.cancelled(ctx, started.elapsed()));
        }

        let sleep_for = wait.min(deadline.saturating_duration_since(Instant::now()));
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(observed.cancelled(ctx, started.elapsed())),
            _ = time::sleep(sleep_for) => {}
        }
    }
}

impl WaitSpec {
    /// Run the poll loop for this spec
    pub async fn wait<T, F, Fut>(
        &self,
        ctx: &Context,
        refresh: F,
    ) -> Result<WaitOutcome<T>, WaitError<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Probe<T>, ProbeError>>,
    {
        wait_for_state(ctx, self, refresh).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn spec() -> WaitSpec {
        WaitSpec::new(Duration::from_secs(60))
            .with_pending(["creating"])
            .with_target(["available"])
            .with_poll_interval(Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_spec_is_rejected_before_probing() {
        let calls = Cell::new(0);
        let spec = spec().with_failure(["available"]);

        let result = wait_for_state(&Context::new(), &spec, || {
            calls.set(calls.get() + 1);
            async { Ok(Probe::found((), "available")) }
        })
        .await;

        assert!(matches!(result, Err(WaitError::InvalidSpec(_))));
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_target_occurrence_requires_consecutive_targets() {
        let states = ["available", "creating", "available", "available"];
        let calls = Cell::new(0usize);
        let spec = spec().with_continuous_target_occurrence(2);

        let outcome = wait_for_state(&Context::new(), &spec, || {
            let state = states[calls.get()];
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move { Ok(Probe::found(attempt, state)) }
        })
        .await
        .unwrap();

        assert_eq!(outcome.probes, 4);
        assert_eq!(outcome.state.as_deref(), Some("available"));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_retry_gives_up_after_configured_checks() {
        let calls = Cell::new(0u32);
        let spec = spec().with_not_found(NotFoundPolicy::Retry(3));

        let err = wait_for_state::<(), _, _>(&Context::new(), &spec, || {
            calls.set(calls.get() + 1);
            async { Ok(Probe::NotFound) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::NotFound { checks: 4, .. }));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_retry_recovers_when_resource_appears() {
        let calls = Cell::new(0u32);
        let spec = spec().with_not_found(NotFoundPolicy::Retry(2));

        let outcome = wait_for_state(&Context::new(), &spec, || {
            calls.set(calls.get() + 1);
            let probe = if calls.get() < 3 {
                Probe::NotFound
            } else {
                Probe::found("env", "available")
            };
            async move { Ok(probe) }
        })
        .await
        .unwrap();

        assert_eq!(outcome.resource, Some("env"));
        assert_eq!(outcome.probes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_error_keeps_state_seen_before_disappearing() {
        let calls = Cell::new(0u32);
        let spec = spec().with_not_found(NotFoundPolicy::Retry(2));

        let err = wait_for_state(&Context::new(), &spec, || {
            calls.set(calls.get() + 1);
            let probe = if calls.get() == 1 {
                Probe::found(42, "creating")
            } else {
                Probe::NotFound
            };
            async move { Ok(probe) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::NotFound { checks: 3, .. }));
        assert_eq!(err.last_state(), Some("creating"));
        assert_eq!(err.last_resource(), Some(&42));
        assert_eq!(err.elapsed(), Some(Duration::from_secs(3)));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_fail_stops_on_first_miss() {
        let spec = spec().with_not_found(NotFoundPolicy::Fail);

        let err = wait_for_state::<(), _, _>(&Context::new(), &spec, || async {
            Ok(Probe::NotFound)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::NotFound { checks: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_error_is_propagated_with_last_observation() {
        let calls = Cell::new(0u32);

        let err = wait_for_state(&Context::new(), &spec(), || {
            calls.set(calls.get() + 1);
            let result: Result<Probe<u32>, ProbeError> = if calls.get() == 1 {
                Ok(Probe::found(1, "creating"))
            } else {
                Err("throttled".into())
            };
            async move { result }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Probe { .. }));
        assert_eq!(err.last_state(), Some("creating"));
        assert_eq!(err.last_resource(), Some(&1));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_delay_happens_before_first_probe() {
        let spec = spec().with_delay(Duration::from_secs(30));
        let started = Instant::now();
        let first_probe_at = Cell::new(None);

        wait_for_state(&Context::new(), &spec, || {
            if first_probe_at.get().is_none() {
                first_probe_at.set(Some(started.elapsed()));
            }
            async { Ok(Probe::found((), "available")) }
        })
        .await
        .unwrap();

        assert_eq!(first_probe_at.get(), Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_longer_than_timeout_times_out() {
        let spec = spec()
            .with_delay(Duration::from_secs(120))
            .with_poll_interval(Duration::from_secs(1));
        let calls = Cell::new(0u32);

        let err = wait_for_state(&Context::new(), &spec, || {
            calls.set(calls.get() + 1);
            async { Ok(Probe::found((), "creating")) }
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_probe_is_cut_off_at_the_deadline() {
        let spec = WaitSpec::new(Duration::from_secs(5))
            .with_pending(["creating"])
            .with_target(["available"]);
        let started = Instant::now();

        let err = wait_for_state(&Context::new(), &spec, || async {
            time::sleep(Duration::from_secs(3600)).await;
            Ok(Probe::found((), "available"))
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_context_never_probes() {
        let ctx = Context::new();
        ctx.cancel();
        let calls = Cell::new(0u32);

        let err = wait_for_state(&ctx, &spec(), || {
            calls.set(calls.get() + 1);
            async { Ok(Probe::found((), "creating")) }
        })
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.get(), 0);
    }
}
