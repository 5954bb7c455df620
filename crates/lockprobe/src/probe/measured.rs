//! # Measured Operation
//!
//! The code path under test. Runs on the driver's thread, waits for the
//! contending actor's held signal, then takes the monitor through the
//! contended slow path and bumps the shared counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ProbeError, ProbeResult, RendezvousPoint};
use crate::sync::{Monitor, Owner, Rendezvous};

/// Integer mutated inside the measured critical section.
///
/// Intentionally separate from the lock identity so a test harness can
/// verify the critical section executed. Only written while the [`Monitor`]
/// is held; the monitor (and the final thread join) provide the ordering,
/// so the atomic itself is relaxed.
#[derive(Debug, Default)]
pub struct SharedCounter(AtomicU64);

impl SharedCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Adds one, returning the new value.
    #[inline]
    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// What the measured acquisition observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Measurement {
    /// Whether the acquisition had to wait for the actor's release.
    pub contended: bool,
    /// Time spent in the acquisition call.
    pub waited: Duration,
    /// Counter value after the increment.
    pub counter: u64,
}

/// The operation that must experience the monitor as held.
#[derive(Debug)]
pub struct MeasuredOperation {
    monitor: Arc<Monitor>,
    rendezvous: Arc<Rendezvous>,
    counter: Arc<SharedCounter>,
}

impl MeasuredOperation {
    /// Creates the operation over the shared monitor, rendezvous and counter.
    #[must_use]
    pub fn new(
        monitor: Arc<Monitor>,
        rendezvous: Arc<Rendezvous>,
        counter: Arc<SharedCounter>,
    ) -> Self {
        Self {
            monitor,
            rendezvous,
            counter,
        }
    }

    /// Runs the measured protocol on the calling thread.
    ///
    /// 1. arrive at the start gate
    /// 2. arrive at the held signal (the actor now owns the monitor)
    /// 3. blocking `enter`, the measured slow path
    /// 4. counter += 1 under ownership
    /// 5. release
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Synchronization`] if either rendezvous fails. The
    /// rendezvous is cancelled on the way out so the actor is released too.
    pub fn run(&self) -> ProbeResult<Measurement> {
        let cancel = self.rendezvous.cancel_on_drop();

        self.rendezvous
            .arrive()
            .map_err(|e| ProbeError::sync(RendezvousPoint::StartGate, e))?;
        self.rendezvous
            .arrive()
            .map_err(|e| ProbeError::sync(RendezvousPoint::HeldSignal, e))?;
        cancel.disarm();

        let started = Instant::now();
        let guard = self.monitor.enter(Owner::MeasuredOperation);
        let waited = started.elapsed();

        let counter = self.counter.increment();
        let contended = guard.contended();
        drop(guard);

        tracing::debug!(contended, ?waited, counter, "measured acquisition complete");

        Ok(Measurement {
            contended,
            waited,
            counter,
        })
    }
}
