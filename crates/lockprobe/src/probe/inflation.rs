//! # Inflation Hooks
//!
//! The pre-condition seam: something that changes the monitor's internal
//! representation before any probe thread touches it.
//!
//! ```text
//!   Driver ── inflate(&monitor) ── spawn actor ── ...
//!             └── must return before the actor exists
//! ```
//!
//! The driver skips the hook entirely when `inflate_monitor` is false.

use std::thread;
use std::time::Duration;

use crate::error::{ProbeError, ProbeResult};
use crate::sync::Monitor;

/// A pre-condition step applied to the monitor before the probe starts.
pub trait InflationHook: Sync {
    /// Applies the hook. Must not leave the monitor held or any thread running.
    ///
    /// # Errors
    ///
    /// Any error aborts the run before the actor is spawned.
    fn inflate(&self, monitor: &Monitor) -> ProbeResult<()>;
}

impl<F> InflationHook for F
where
    F: Fn(&Monitor) -> ProbeResult<()> + Sync,
{
    fn inflate(&self, monitor: &Monitor) -> ProbeResult<()> {
        self(monitor)
    }
}

/// Leaves the monitor untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInflation;

impl InflationHook for NoInflation {
    fn inflate(&self, _monitor: &Monitor) -> ProbeResult<()> {
        Ok(())
    }
}

/// Drives the monitor's lock through its parked slow path once.
///
/// The driver thread holds the lock while a scoped helper thread waits on it
/// with `try_lock_for`, which parks and then times out. The helper is joined
/// before the hook returns, so no thread outlives the precondition step.
#[derive(Clone, Copy, Debug)]
pub struct ParkingInflation {
    /// How long the helper stays parked.
    pub window: Duration,
}

impl Default for ParkingInflation {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(10),
        }
    }
}

impl InflationHook for ParkingInflation {
    fn inflate(&self, monitor: &Monitor) -> ProbeResult<()> {
        let raw = monitor.raw();

        let Some(held) = raw.try_lock_for(self.window) else {
            return Err(ProbeError::InvariantViolation(
                "monitor already held before inflation".into(),
            ));
        };

        let helper = thread::scope(|scope| {
            scope
                .spawn(|| raw.try_lock_for(self.window).is_some())
                .join()
        });
        drop(held);

        match helper {
            Ok(false) => {
                monitor.mark_inflated();
                tracing::debug!(window = ?self.window, "monitor inflated");
                Ok(())
            }
            Ok(true) => Err(ProbeError::InvariantViolation(
                "inflation helper entered a held monitor".into(),
            )),
            Err(_) => Err(ProbeError::ActorPanicked("inflation helper panicked".into())),
        }
    }
}
