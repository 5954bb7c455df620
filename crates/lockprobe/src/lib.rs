//! # LOCKPROBE
//!
//! Deterministic lock-contention probe.
//!
//! Forces two threads to race for one monitor in a fixed order so the
//! measured acquisition always takes the contended slow path:
//! - the contending actor acquires first
//! - the measured operation attempts acquisition only after that
//! - the actor releases only after the measured side is blocked on it
//!
//! Ordering comes from two rendezvous points, never from sleeps. The hold
//! time only widens the window in which the blocked acquisition is visible.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lockprobe::{ContentionProbe, ParkingInflation, ProbeConfig};
//!
//! let probe = ContentionProbe::new(ProbeConfig::new(true, 50))?;
//! let outcome = probe.run(&ParkingInflation::default());
//! assert_eq!(outcome.report().map(|r| r.counter), Some(1));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod probe;
pub mod report;
pub mod sync;

pub use config::ProbeConfig;
pub use error::{BreakCause, ProbeError, ProbeResult, RendezvousError, RendezvousPoint};
pub use probe::{
    CancelHandle, ContendingActor, ContentionProbe, InflationHook, MeasuredOperation,
    Measurement, NoInflation, ParkingInflation, ProbeStage, SharedCounter,
};
pub use report::{
    ChannelReporter, OutcomeReporter, ProbeFailure, ProbeOutcome, ProbeReport, TracingReporter,
};
pub use sync::{LockEvent, LockEventKind, Monitor, MonitorGuard, Owner, Rendezvous};
