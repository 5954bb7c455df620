//! # Probe Error Types
//!
//! All errors that can occur during a contention probe run.
//!
//! Nothing here is recoverable. Every error ends the run and becomes the
//! failure half of its [`ProbeOutcome`](crate::ProbeOutcome).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Why a rendezvous was broken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakCause {
    /// A party cancelled instead of arriving.
    Cancelled,
    /// A party waited longer than the rendezvous bound.
    TimedOut,
    /// A party arrived after the final permitted round.
    Exhausted,
}

impl fmt::Display for BreakCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("a party cancelled"),
            Self::TimedOut => f.write_str("a party timed out"),
            Self::Exhausted => f.write_str("a party arrived after the last round"),
        }
    }
}

/// Errors raised by [`Rendezvous::arrive`](crate::Rendezvous::arrive).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousError {
    /// The barrier was broken by another party, either before or during the wait.
    #[error("rendezvous broken: {cause}")]
    Broken {
        /// What broke it.
        cause: BreakCause,
    },

    /// This party gave up waiting and broke the barrier for everyone else.
    #[error("rendezvous timed out after {waited:?}")]
    TimedOut {
        /// The bound that was exceeded.
        waited: Duration,
    },

    /// All permitted rounds were already completed.
    #[error("rendezvous exhausted: all {limit} rounds already completed")]
    Exhausted {
        /// Number of rounds the barrier permits.
        limit: u64,
    },
}

/// The two matched rendezvous points of a probe run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendezvousPoint {
    /// Point A: both parties are ready, precondition setup is complete.
    StartGate,
    /// Point B: the contending actor holds the monitor.
    HeldSignal,
}

impl fmt::Display for RendezvousPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartGate => f.write_str("start gate"),
            Self::HeldSignal => f.write_str("held signal"),
        }
    }
}

/// Errors that end a probe run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// A rendezvous failed (cancelled, broken, timed out or exhausted).
    #[error("synchronization error at {point}: {source}")]
    Synchronization {
        /// Which rendezvous point failed.
        point: RendezvousPoint,
        /// The underlying barrier failure.
        #[source]
        source: RendezvousError,
    },

    /// The contending actor could not become the first owner of the monitor.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Malformed input parameters, reported before any thread starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The contending actor's thread panicked.
    #[error("contending actor panicked: {0}")]
    ActorPanicked(String),

    /// The contending actor's thread could not be spawned.
    #[error("failed to spawn contending actor: {0}")]
    Spawn(String),
}

impl ProbeError {
    /// Wraps a rendezvous failure at the given point.
    #[must_use]
    pub fn sync(point: RendezvousPoint, source: RendezvousError) -> Self {
        Self::Synchronization { point, source }
    }

    /// Returns true if this error only reports that the *other* party broke
    /// the rendezvous, so a sibling error holds the real cause.
    #[must_use]
    pub fn is_secondary(&self) -> bool {
        matches!(
            self,
            Self::Synchronization {
                source: RendezvousError::Broken { .. },
                ..
            }
        )
    }

    /// Short classification used in reports and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Synchronization { .. } => "SynchronizationError",
            Self::InvariantViolation(_) => "InvariantViolation",
            Self::Configuration(_) => "ConfigurationError",
            Self::ActorPanicked(_) => "ActorPanicked",
            Self::Spawn(_) => "SpawnError",
        }
    }
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;
