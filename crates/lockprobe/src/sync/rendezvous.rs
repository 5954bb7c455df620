//! # Rendezvous Barrier
//!
//! Reusable N-party barrier with bounded waits and failure propagation.
//!
//! ## Round Protocol
//!
//! ```text
//!   Party 1: ──arrive()──┐            ┌──> round 0 done ──arrive()──┐     ┌──> round 1 done
//!                        ├── count=N ─┤                             ├─ .. ┤
//!   Party 2: ──arrive()──┘            └──> round 0 done ──arrive()──┘     └──> round 1 done
//! ```
//!
//! The last party to arrive bumps the generation and wakes everyone. Any
//! waiter that sees a newer generation was released normally, even if the
//! barrier breaks right after.
//!
//! ## Breaking
//!
//! A broken barrier never recovers. It breaks when:
//! - a party calls [`Rendezvous::cancel`] (or drops an armed [`CancelOnDrop`])
//! - a waiter exceeds the wait bound
//! - a party arrives after the round limit
//!
//! Every party blocked at that moment, and every later arrival, gets an error.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{BreakCause, RendezvousError};

/// Mutable barrier state, guarded by the rendezvous mutex.
#[derive(Debug)]
struct RendezvousState {
    /// Parties that arrived in the current round.
    arrived: usize,
    /// Completed rounds.
    generation: u64,
    /// Set once, never cleared.
    broken: Option<BreakCause>,
}

/// Reusable barrier for a fixed number of parties.
///
/// ## Usage
///
/// ```rust,ignore
/// let rendezvous = Arc::new(Rendezvous::new(2, Duration::from_secs(5)).with_round_limit(2));
///
/// let other = Arc::clone(&rendezvous);
/// let handle = thread::spawn(move || other.arrive());
///
/// rendezvous.arrive()?; // round 0
/// handle.join().unwrap()?;
/// ```
#[derive(Debug)]
pub struct Rendezvous {
    parties: usize,
    timeout: Duration,
    round_limit: Option<u64>,
    state: Mutex<RendezvousState>,
    released: Condvar,
}

impl Rendezvous {
    /// Creates a barrier for `parties` parties; each wait is bounded by `timeout`.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    #[must_use]
    pub fn new(parties: usize, timeout: Duration) -> Self {
        assert!(parties > 0, "A rendezvous needs at least one party");
        Self {
            parties,
            timeout,
            round_limit: None,
            state: Mutex::new(RendezvousState {
                arrived: 0,
                generation: 0,
                broken: None,
            }),
            released: Condvar::new(),
        }
    }

    /// Limits the barrier to `limit` completed rounds.
    #[must_use]
    pub fn with_round_limit(mut self, limit: u64) -> Self {
        self.round_limit = Some(limit);
        self
    }

    /// Returns the number of parties per round.
    #[inline]
    #[must_use]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Returns the wait bound applied to every `arrive()`.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of completed rounds.
    #[must_use]
    pub fn rounds_completed(&self) -> u64 {
        self.state.lock().generation
    }

    /// Returns why the barrier is broken, if it is.
    #[must_use]
    pub fn broken(&self) -> Option<BreakCause> {
        self.state.lock().broken
    }

    /// Returns whether the barrier is broken.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken().is_some()
    }

    /// Blocks until all parties have arrived for the current round.
    ///
    /// Returns the index of the round this call completed.
    ///
    /// # Errors
    ///
    /// - [`RendezvousError::Broken`] if the barrier is or becomes broken
    /// - [`RendezvousError::TimedOut`] if this call waited past the bound
    /// - [`RendezvousError::Exhausted`] if the round limit was already reached
    pub fn arrive(&self) -> Result<u64, RendezvousError> {
        let deadline = Instant::now().checked_add(self.timeout);
        let mut state = self.state.lock();

        if let Some(cause) = state.broken {
            return Err(RendezvousError::Broken { cause });
        }

        if let Some(limit) = self.round_limit {
            if state.generation >= limit {
                self.break_locked(&mut state, BreakCause::Exhausted);
                return Err(RendezvousError::Exhausted { limit });
            }
        }

        let round = state.generation;
        state.arrived += 1;

        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation += 1;
            self.released.notify_all();
            return Ok(round);
        }

        loop {
            let timed_out = match deadline {
                Some(deadline) => self.released.wait_until(&mut state, deadline).timed_out(),
                None => {
                    self.released.wait(&mut state);
                    false
                }
            };

            if state.generation != round {
                return Ok(round);
            }
            if let Some(cause) = state.broken {
                return Err(RendezvousError::Broken { cause });
            }
            if timed_out {
                self.break_locked(&mut state, BreakCause::TimedOut);
                return Err(RendezvousError::TimedOut {
                    waited: self.timeout,
                });
            }
        }
    }

    /// Breaks the barrier, releasing every waiting party with an error.
    ///
    /// Idempotent: the first cause wins.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        self.break_locked(&mut state, BreakCause::Cancelled);
    }

    /// Returns a guard that cancels the barrier when dropped, unless disarmed.
    ///
    /// A party holds this across its arrivals so that an early return, or a
    /// panic, never leaves the other party waiting.
    #[must_use]
    pub fn cancel_on_drop(&self) -> CancelOnDrop<'_> {
        CancelOnDrop {
            rendezvous: self,
            armed: true,
        }
    }

    fn break_locked(&self, state: &mut RendezvousState, cause: BreakCause) {
        if state.broken.is_none() {
            tracing::warn!(%cause, round = state.generation, "rendezvous broken");
            state.broken = Some(cause);
        }
        self.released.notify_all();
    }
}

/// Scoped cancellation for a [`Rendezvous`] party.
///
/// Cancels the barrier on drop unless [`CancelOnDrop::disarm`] was called.
#[derive(Debug)]
pub struct CancelOnDrop<'a> {
    rendezvous: &'a Rendezvous,
    armed: bool,
}

impl CancelOnDrop<'_> {
    /// Consumes the guard without cancelling.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.rendezvous.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn pair(timeout: Duration) -> Arc<Rendezvous> {
        Arc::new(Rendezvous::new(2, timeout))
    }

    #[test]
    fn test_two_parties_two_rounds() {
        let rendezvous = pair(Duration::from_secs(5));
        let other = Arc::clone(&rendezvous);

        let handle = thread::spawn(move || {
            let first = other.arrive().unwrap();
            let second = other.arrive().unwrap();
            (first, second)
        });

        assert_eq!(rendezvous.arrive(), Ok(0));
        assert_eq!(rendezvous.arrive(), Ok(1));
        assert_eq!(handle.join().unwrap(), (0, 1));
        assert_eq!(rendezvous.rounds_completed(), 2);
        assert!(!rendezvous.is_broken());
    }

    #[test]
    fn test_single_party_never_blocks() {
        let rendezvous = Rendezvous::new(1, Duration::from_millis(1));
        assert_eq!(rendezvous.arrive(), Ok(0));
        assert_eq!(rendezvous.arrive(), Ok(1));
    }

    #[test]
    fn test_cancel_releases_waiter() {
        let rendezvous = pair(Duration::from_secs(30));
        let other = Arc::clone(&rendezvous);

        let start = Instant::now();
        let handle = thread::spawn(move || other.arrive());

        // Let the waiter block, then cancel instead of arriving.
        thread::sleep(Duration::from_millis(20));
        rendezvous.cancel();

        assert_eq!(
            handle.join().unwrap(),
            Err(RendezvousError::Broken {
                cause: BreakCause::Cancelled
            })
        );
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_timeout_breaks_for_everyone() {
        let rendezvous = pair(Duration::from_millis(20));

        assert_eq!(
            rendezvous.arrive(),
            Err(RendezvousError::TimedOut {
                waited: Duration::from_millis(20)
            })
        );
        assert_eq!(rendezvous.broken(), Some(BreakCause::TimedOut));

        // Later arrivals fail immediately instead of waiting.
        assert_eq!(
            rendezvous.arrive(),
            Err(RendezvousError::Broken {
                cause: BreakCause::TimedOut
            })
        );
    }

    #[test]
    fn test_round_limit_exhausted() {
        let rendezvous = Rendezvous::new(1, Duration::from_millis(10)).with_round_limit(2);
        assert_eq!(rendezvous.arrive(), Ok(0));
        assert_eq!(rendezvous.arrive(), Ok(1));
        assert_eq!(
            rendezvous.arrive(),
            Err(RendezvousError::Exhausted { limit: 2 })
        );
        assert_eq!(rendezvous.broken(), Some(BreakCause::Exhausted));
    }

    #[test]
    fn test_cancel_on_drop() {
        let rendezvous = pair(Duration::from_secs(1));
        {
            let _guard = rendezvous.cancel_on_drop();
        }
        assert_eq!(rendezvous.broken(), Some(BreakCause::Cancelled));

        let rendezvous = pair(Duration::from_secs(1));
        rendezvous.cancel_on_drop().disarm();
        assert!(!rendezvous.is_broken());
    }

    #[test]
    fn test_first_cause_wins() {
        let rendezvous = pair(Duration::from_millis(5));
        assert!(rendezvous.arrive().is_err());
        rendezvous.cancel();
        assert_eq!(rendezvous.broken(), Some(BreakCause::TimedOut));
    }

    #[test]
    #[should_panic(expected = "at least one party")]
    fn test_zero_parties_panics() {
        let _ = Rendezvous::new(0, Duration::from_secs(1));
    }
}
