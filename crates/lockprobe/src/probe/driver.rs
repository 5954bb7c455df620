//! # Probe Driver
//!
//! Orchestrates one busy-lock scenario.
//!
//! ## State Machine
//!
//! ```text
//!   Idle ──inflate?──> PreconditionApplied ──spawn──> ActorStarted
//!        ──measure──> MeasurementDone ──join──> Joined ──> Reported
//!
//!   any error ──────────────────────────────────────────> Reported (FAIL)
//! ```
//!
//! Single-shot: [`ContentionProbe::run`] consumes the probe. A rerun needs a
//! fresh probe, which brings a fresh monitor and rendezvous.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::probe::actor::ContendingActor;
use crate::probe::inflation::InflationHook;
use crate::probe::measured::{MeasuredOperation, SharedCounter};
use crate::report::{OutcomeReporter, ProbeOutcome, ProbeReport};
use crate::sync::{LockEvent, LockEventKind, Monitor, Owner, Rendezvous};

/// Parties in the probe rendezvous: the actor and the measured operation.
pub const RENDEZVOUS_PARTIES: usize = 2;

/// Rendezvous rounds per run: start gate and held signal.
pub const RENDEZVOUS_ROUNDS: u64 = 2;

/// Driver progress through a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProbeStage {
    /// Nothing has happened yet.
    Idle,
    /// The inflation hook ran, or was skipped.
    PreconditionApplied,
    /// The contending actor's thread is running.
    ActorStarted,
    /// The measured operation returned successfully.
    MeasurementDone,
    /// The actor's thread was joined successfully.
    Joined,
    /// The outcome was built.
    Reported,
}

impl ProbeStage {
    fn advance(&mut self, next: Self) {
        tracing::debug!(from = ?self, to = ?next, "probe stage");
        *self = next;
    }
}

/// Cancels a probe's rendezvous from any thread.
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<Rendezvous>);

impl CancelHandle {
    /// Breaks the rendezvous; every waiting party fails with a synchronization error.
    pub fn cancel(&self) {
        self.0.cancel();
    }
}

/// One deterministic contention scenario.
///
/// ## Usage
///
/// ```rust,ignore
/// let probe = ContentionProbe::new(ProbeConfig::new(true, 50))?;
/// let outcome = probe.run(&ParkingInflation::default());
/// assert!(outcome.is_pass());
/// ```
#[derive(Debug)]
pub struct ContentionProbe {
    config: ProbeConfig,
    monitor: Arc<Monitor>,
    rendezvous: Arc<Rendezvous>,
    counter: Arc<SharedCounter>,
}

impl ContentionProbe {
    /// Creates a probe over a fresh monitor.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Configuration`] if `config` is invalid.
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        Self::with_monitor(config, Arc::new(Monitor::new()))
    }

    /// Creates a probe over a caller-supplied monitor.
    ///
    /// Lets a harness pre-hold or inspect the monitor.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Configuration`] if `config` is invalid.
    pub fn with_monitor(config: ProbeConfig, monitor: Arc<Monitor>) -> ProbeResult<Self> {
        config.validate()?;
        let rendezvous = Rendezvous::new(RENDEZVOUS_PARTIES, config.rendezvous_timeout())
            .with_round_limit(RENDEZVOUS_ROUNDS);
        Ok(Self {
            config,
            monitor,
            rendezvous: Arc::new(rendezvous),
            counter: Arc::new(SharedCounter::new()),
        })
    }

    /// The run's configuration.
    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// The monitor under test.
    #[must_use]
    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// The counter mutated by the measured operation.
    #[must_use]
    pub fn counter(&self) -> &Arc<SharedCounter> {
        &self.counter
    }

    /// A handle that cancels this probe's rendezvous.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.rendezvous))
    }

    /// Runs the scenario and returns its outcome.
    ///
    /// `hook` is applied only if `inflate_monitor` is set.
    #[must_use]
    pub fn run(self, hook: &dyn InflationHook) -> ProbeOutcome {
        let span = tracing::info_span!(
            "contention_probe",
            hold_ms = self.config.hold_ms,
            inflate = self.config.inflate_monitor
        );
        let _entered = span.enter();

        let mut stage = ProbeStage::Idle;
        let outcome = match self.execute(hook, &mut stage) {
            Ok(report) => ProbeOutcome::Pass(report),
            Err(error) => ProbeOutcome::failed(stage, error),
        };
        stage.advance(ProbeStage::Reported);
        outcome
    }

    /// Runs the scenario and hands the outcome to `reporter`.
    #[must_use]
    pub fn run_and_report(
        self,
        hook: &dyn InflationHook,
        reporter: &dyn OutcomeReporter,
    ) -> ProbeOutcome {
        let outcome = self.run(hook);
        reporter.report(&outcome);
        outcome
    }

    fn execute(&self, hook: &dyn InflationHook, stage: &mut ProbeStage) -> ProbeResult<ProbeReport> {
        if self.config.inflate_monitor {
            hook.inflate(&self.monitor)?;
        }
        stage.advance(ProbeStage::PreconditionApplied);

        let baseline = self.monitor.events().len();
        let started = Instant::now();

        let actor = ContendingActor::new(
            Arc::clone(&self.monitor),
            Arc::clone(&self.rendezvous),
            self.config.hold(),
        )
        .spawn()?;
        stage.advance(ProbeStage::ActorStarted);

        let measured = MeasuredOperation::new(
            Arc::clone(&self.monitor),
            Arc::clone(&self.rendezvous),
            Arc::clone(&self.counter),
        )
        .run();
        if measured.is_ok() {
            stage.advance(ProbeStage::MeasurementDone);
        }

        // The actor is always joined, even when the measurement failed.
        let joined = join_actor(actor);
        let elapsed = started.elapsed();

        let (held, measurement) = match (joined, measured) {
            (Ok(held), Ok(measurement)) => (held, measurement),
            (Err(actor_err), Err(measured_err)) if actor_err.is_secondary() => {
                return Err(measured_err)
            }
            (Err(actor_err), _) => return Err(actor_err),
            (Ok(_), Err(measured_err)) => return Err(measured_err),
        };
        stage.advance(ProbeStage::Joined);

        let events = self.monitor.events();
        verify_ordering(events.get(baseline..).unwrap_or_default())?;

        let counter = self.counter.get();
        if counter != 1 {
            return Err(ProbeError::InvariantViolation(format!(
                "critical section ran {counter} times, expected exactly once"
            )));
        }

        Ok(ProbeReport {
            counter,
            elapsed,
            held,
            waited: measurement.waited,
            contended: measurement.contended,
            inflated: self.monitor.is_inflated(),
        })
    }
}

fn join_actor(handle: JoinHandle<ProbeResult<Duration>>) -> ProbeResult<Duration> {
    handle.join().unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Err(ProbeError::ActorPanicked(message))
    })
}

/// Checks the journal of one run: the actor acquired first, and the measured
/// acquisition came after the actor's release.
fn verify_ordering(events: &[LockEvent]) -> ProbeResult<()> {
    let first = events.iter().find(|event| event.is_acquisition()).map(|event| event.owner);
    if first != Some(Owner::ContendingActor) {
        return Err(ProbeError::InvariantViolation(format!(
            "first acquisition by {first:?}, expected the contending actor"
        )));
    }

    let actor_release = events
        .iter()
        .find(|event| event.owner == Owner::ContendingActor && event.kind == LockEventKind::Released)
        .map(|event| event.sequence);
    let measured_acquire = events
        .iter()
        .find(|event| event.owner == Owner::MeasuredOperation && event.is_acquisition())
        .map(|event| event.sequence);

    match (actor_release, measured_acquire) {
        (Some(release), Some(acquire)) if release < acquire => Ok(()),
        _ => Err(ProbeError::InvariantViolation(
            "measured acquisition did not follow the contending actor's release".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::inflation::NoInflation;

    #[test]
    fn test_invalid_config_rejected_before_run() {
        let config = ProbeConfig::new(false, 0).with_rendezvous_timeout_ms(0);
        assert!(matches!(
            ContentionProbe::new(config),
            Err(ProbeError::Configuration(_))
        ));
    }

    #[test]
    fn test_hook_failure_stops_at_idle() {
        let probe = ContentionProbe::new(ProbeConfig::new(true, 0)).unwrap();
        let monitor = Arc::clone(probe.monitor());
        let hook = |_: &Monitor| -> ProbeResult<()> {
            Err(ProbeError::InvariantViolation("hook refused".into()))
        };

        let outcome = probe.run(&hook);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.stage, ProbeStage::Idle);
        assert!(monitor.events().is_empty());
    }

    #[test]
    fn test_skipped_hook_is_not_called() {
        let probe = ContentionProbe::new(ProbeConfig::new(false, 0)).unwrap();
        let hook = |_: &Monitor| -> ProbeResult<()> {
            Err(ProbeError::InvariantViolation("must not run".into()))
        };
        assert!(probe.run(&hook).is_pass());

        let probe = ContentionProbe::new(ProbeConfig::new(false, 0)).unwrap();
        assert!(probe.run(&NoInflation).is_pass());
    }

    #[test]
    fn test_verify_ordering_rejects_measured_first() {
        let monitor = Monitor::new();
        drop(monitor.enter(Owner::MeasuredOperation));
        drop(monitor.enter(Owner::ContendingActor));
        assert!(matches!(
            verify_ordering(&monitor.events()),
            Err(ProbeError::InvariantViolation(_))
        ));

        let monitor = Monitor::new();
        drop(monitor.enter(Owner::ContendingActor));
        drop(monitor.enter(Owner::MeasuredOperation));
        assert!(verify_ordering(&monitor.events()).is_ok());
    }

    #[test]
    fn test_panicking_actor_payload_is_reported() {
        let handle = std::thread::spawn(|| -> ProbeResult<Duration> { panic!("boom") });
        assert_eq!(
            join_actor(handle),
            Err(ProbeError::ActorPanicked("boom".into()))
        );
    }
}
