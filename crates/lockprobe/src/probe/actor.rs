//! # Contending Actor
//!
//! Becomes the first owner of the monitor and holds it long enough for the
//! measured operation to be observed blocking.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{ProbeError, ProbeResult, RendezvousPoint};
use crate::sync::{Monitor, Owner, Rendezvous};

/// Name given to the actor's thread.
pub const ACTOR_THREAD_NAME: &str = "contending-actor";

/// The execution unit that deliberately holds the monitor.
#[derive(Debug)]
pub struct ContendingActor {
    monitor: Arc<Monitor>,
    rendezvous: Arc<Rendezvous>,
    hold: Duration,
}

impl ContendingActor {
    /// Creates an actor that will hold `monitor` for `hold`.
    #[must_use]
    pub fn new(monitor: Arc<Monitor>, rendezvous: Arc<Rendezvous>, hold: Duration) -> Self {
        Self {
            monitor,
            rendezvous,
            hold,
        }
    }

    /// Starts the actor on its own named thread.
    ///
    /// The thread returns how long the monitor was held.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Spawn`] if the OS refuses the thread.
    pub fn spawn(self) -> ProbeResult<JoinHandle<ProbeResult<Duration>>> {
        thread::Builder::new()
            .name(ACTOR_THREAD_NAME.into())
            .spawn(move || self.run())
            .map_err(|e| ProbeError::Spawn(e.to_string()))
    }

    /// Runs the actor protocol on the calling thread.
    ///
    /// 1. arrive at the start gate
    /// 2. `try_enter` the monitor; failure means it was already held
    /// 3. arrive at the held signal
    /// 4. sleep for the hold time
    /// 5. release (scoped, on every exit path)
    ///
    /// Until the held signal completes, any early exit (error or panic)
    /// cancels the rendezvous so the measured side is released with a failure.
    ///
    /// # Errors
    ///
    /// - [`ProbeError::Synchronization`] if a rendezvous fails
    /// - [`ProbeError::InvariantViolation`] if the monitor was already held
    pub fn run(&self) -> ProbeResult<Duration> {
        let cancel = self.rendezvous.cancel_on_drop();

        self.rendezvous
            .arrive()
            .map_err(|e| ProbeError::sync(RendezvousPoint::StartGate, e))?;

        let Some(held) = self.monitor.try_enter(Owner::ContendingActor) else {
            return Err(ProbeError::InvariantViolation(
                "monitor should be entered by the contending actor first".into(),
            ));
        };
        let acquired = Instant::now();

        self.rendezvous
            .arrive()
            .map_err(|e| ProbeError::sync(RendezvousPoint::HeldSignal, e))?;
        cancel.disarm();

        tracing::debug!(hold = ?self.hold, "contending actor holds the monitor");
        thread::sleep(self.hold);

        drop(held);
        Ok(acquired.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BreakCause, RendezvousError};

    #[test]
    fn test_pre_held_monitor_is_invariant_violation() {
        let monitor = Arc::new(Monitor::new());
        let rendezvous = Arc::new(Rendezvous::new(1, Duration::from_secs(1)));
        let _external = monitor.enter(Owner::External);

        let actor = ContendingActor::new(
            Arc::clone(&monitor),
            Arc::clone(&rendezvous),
            Duration::ZERO,
        );

        assert!(matches!(actor.run(), Err(ProbeError::InvariantViolation(_))));
        // The failed actor must not leave the other party waiting.
        assert_eq!(rendezvous.broken(), Some(BreakCause::Cancelled));
    }

    #[test]
    fn test_solo_actor_holds_then_releases() {
        let monitor = Arc::new(Monitor::new());
        let actor = ContendingActor::new(
            Arc::clone(&monitor),
            Arc::new(Rendezvous::new(1, Duration::from_secs(1))),
            Duration::from_millis(10),
        );

        let held = actor.spawn().unwrap().join().unwrap().unwrap();
        assert!(held >= Duration::from_millis(10));
        assert!(!monitor.is_held());
        assert_eq!(monitor.first_owner(), Some(Owner::ContendingActor));
    }

    #[test]
    fn test_timed_out_start_gate() {
        let monitor = Arc::new(Monitor::new());
        let actor = ContendingActor::new(
            Arc::clone(&monitor),
            Arc::new(Rendezvous::new(2, Duration::from_millis(20))),
            Duration::ZERO,
        );

        assert_eq!(
            actor.run(),
            Err(ProbeError::sync(
                RendezvousPoint::StartGate,
                RendezvousError::TimedOut {
                    waited: Duration::from_millis(20)
                }
            ))
        );
        assert!(monitor.events().is_empty());
    }
}
