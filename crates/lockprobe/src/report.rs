//! # Probe Outcome & Reporting
//!
//! A run ends in exactly one [`ProbeOutcome`]: a pass with its report, or a
//! failure with the last stage reached and the error that ended it. There is
//! no partial success.
//!
//! Reporters consume the outcome:
//! - [`TracingReporter`] logs it
//! - [`ChannelReporter`] hands it to another thread

use std::fmt;
use std::process::ExitCode;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::error::ProbeError;
use crate::probe::ProbeStage;

/// Exit status for a failed run.
pub const EXIT_FAILURE: u8 = 1;

/// Exit status for a configuration error (no run attempted).
pub const EXIT_CONFIGURATION: u8 = 2;

/// What a passing run observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeReport {
    /// Shared counter after the run. Exactly 1 for a passing run.
    pub counter: u64,
    /// Wall time from actor spawn to actor join.
    pub elapsed: Duration,
    /// How long the contending actor held the monitor.
    pub held: Duration,
    /// How long the measured acquisition waited.
    pub waited: Duration,
    /// Whether the measured acquisition took the contended slow path.
    pub contended: bool,
    /// Whether the inflation hook ran.
    pub inflated: bool,
}

/// Why a run failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeFailure {
    /// Last stage the driver reached before the error.
    pub stage: ProbeStage,
    /// The error that ended the run.
    pub error: ProbeError,
}

/// Final result of one probe run. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Contention scenario executed and verified.
    Pass(ProbeReport),
    /// Any stage failed.
    Fail(ProbeFailure),
}

impl ProbeOutcome {
    /// Builds a failed outcome.
    #[must_use]
    pub fn failed(stage: ProbeStage, error: ProbeError) -> Self {
        Self::Fail(ProbeFailure { stage, error })
    }

    /// Returns true for a pass.
    #[inline]
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }

    /// The report of a passing run.
    #[must_use]
    pub fn report(&self) -> Option<&ProbeReport> {
        match self {
            Self::Pass(report) => Some(report),
            Self::Fail(_) => None,
        }
    }

    /// The failure of a failed run.
    #[must_use]
    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            Self::Pass(_) => None,
            Self::Fail(failure) => Some(failure),
        }
    }

    /// The error of a failed run.
    #[must_use]
    pub fn error(&self) -> Option<&ProbeError> {
        self.failure().map(|failure| &failure.error)
    }

    /// Diagnostic message. Only failures carry one.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.failure().map(|failure| {
            format!(
                "{} after stage {:?}: {}",
                failure.error.kind(),
                failure.stage,
                failure.error
            )
        })
    }

    /// Process exit status: 0 for pass, [`EXIT_CONFIGURATION`] for a
    /// configuration error, [`EXIT_FAILURE`] otherwise.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        match self.error() {
            None => 0,
            Some(ProbeError::Configuration(_)) => EXIT_CONFIGURATION,
            Some(_) => EXIT_FAILURE,
        }
    }

    /// [`ProbeOutcome::exit_status`] as an `ExitCode`.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(report) => write!(
                f,
                "PASS counter={} contended={} waited={:?} held={:?} elapsed={:?} inflated={}",
                report.counter,
                report.contended,
                report.waited,
                report.held,
                report.elapsed,
                report.inflated
            ),
            Self::Fail(_) => write!(f, "FAIL {}", self.message().unwrap_or_default()),
        }
    }
}

/// Consumer of probe outcomes.
pub trait OutcomeReporter {
    /// Receives the final outcome of a run.
    fn report(&self, outcome: &ProbeOutcome);
}

/// Logs the outcome through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl OutcomeReporter for TracingReporter {
    fn report(&self, outcome: &ProbeOutcome) {
        match outcome {
            ProbeOutcome::Pass(report) => tracing::info!(
                counter = report.counter,
                contended = report.contended,
                waited = ?report.waited,
                elapsed = ?report.elapsed,
                inflated = report.inflated,
                "contention probe passed"
            ),
            ProbeOutcome::Fail(failure) => tracing::error!(
                kind = failure.error.kind(),
                stage = ?failure.stage,
                error = %failure.error,
                "contention probe failed"
            ),
        }
    }
}

/// Sends each outcome over a channel to a consumer thread.
#[derive(Clone, Debug)]
pub struct ChannelReporter {
    tx: Sender<ProbeOutcome>,
}

impl ChannelReporter {
    /// Creates a reporter and the receiving end.
    #[must_use]
    pub fn channel() -> (Self, Receiver<ProbeOutcome>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl OutcomeReporter for ChannelReporter {
    fn report(&self, outcome: &ProbeOutcome) {
        if self.tx.send(outcome.clone()).is_err() {
            tracing::warn!("outcome receiver dropped, outcome discarded");
        }
    }
}
