//! # Monitor
//!
//! The exclusive resource under contention test.
//!
//! A `parking_lot` mutex with an acquisition journal. Every acquisition and
//! release is recorded *while the lock is held*, so journal sequence numbers
//! follow the real ownership order:
//!
//! ```text
//!   seq 0  ContendingActor    Acquired { contended: false }
//!   seq 1  ContendingActor    Released
//!   seq 2  MeasuredOperation  Acquired { contended: true }    <- slow path
//!   seq 3  MeasuredOperation  Released
//! ```
//!
//! The journal lock is only ever taken by the current owner, so it adds no
//! ordering of its own between contenders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};

/// Who took the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The thread that holds the monitor to force contention.
    ContendingActor,
    /// The code path under test.
    MeasuredOperation,
    /// Anyone else (test harnesses, external collaborators).
    External,
}

/// What happened to the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockEventKind {
    /// Ownership taken. `contended` is true if the fast path failed first.
    Acquired {
        /// Whether the slow (blocking) path was taken.
        contended: bool,
    },
    /// Ownership given up.
    Released,
}

/// One journal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockEvent {
    /// Position in the journal.
    pub sequence: u64,
    /// Owner at the time of the event.
    pub owner: Owner,
    /// Acquired or released.
    pub kind: LockEventKind,
    /// When it happened.
    pub at: Instant,
}

impl LockEvent {
    /// Returns true for acquisitions.
    #[inline]
    #[must_use]
    pub fn is_acquisition(&self) -> bool {
        matches!(self.kind, LockEventKind::Acquired { .. })
    }
}

/// The shared resource both probe actors race for.
#[derive(Debug, Default)]
pub struct Monitor {
    lock: Mutex<()>,
    journal: Mutex<Vec<LockEvent>>,
    inflated: AtomicBool,
}

impl Monitor {
    /// Creates an unheld, uninflated monitor with an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to take the monitor without blocking.
    ///
    /// Returns `None` if someone else holds it.
    #[must_use]
    pub fn try_enter(&self, owner: Owner) -> Option<MonitorGuard<'_>> {
        let guard = self.lock.try_lock()?;
        Some(MonitorGuard::new(self, owner, false, guard))
    }

    /// Takes the monitor, blocking until it is released.
    ///
    /// Tries the fast path first so the journal can tell whether the
    /// acquisition actually went through the contended slow path.
    #[must_use]
    pub fn enter(&self, owner: Owner) -> MonitorGuard<'_> {
        match self.lock.try_lock() {
            Some(guard) => MonitorGuard::new(self, owner, false, guard),
            None => {
                let guard = self.lock.lock();
                MonitorGuard::new(self, owner, true, guard)
            }
        }
    }

    /// Returns whether anyone currently holds the monitor.
    #[inline]
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.lock.is_locked()
    }

    /// Returns whether an inflation hook has run on this monitor.
    #[inline]
    #[must_use]
    pub fn is_inflated(&self) -> bool {
        self.inflated.load(Ordering::Acquire)
    }

    /// Returns a copy of the full journal.
    #[must_use]
    pub fn events(&self) -> Vec<LockEvent> {
        self.journal.lock().clone()
    }

    /// Returns only the acquisition events, in ownership order.
    #[must_use]
    pub fn acquisitions(&self) -> Vec<LockEvent> {
        self.journal
            .lock()
            .iter()
            .copied()
            .filter(LockEvent::is_acquisition)
            .collect()
    }

    /// Returns the owner of the first recorded acquisition.
    #[must_use]
    pub fn first_owner(&self) -> Option<Owner> {
        self.journal
            .lock()
            .iter()
            .find(|event| event.is_acquisition())
            .map(|event| event.owner)
    }

    pub(crate) fn mark_inflated(&self) {
        self.inflated.store(true, Ordering::Release);
    }

    /// The bare lock, bypassing the journal. Only inflation touches it.
    pub(crate) fn raw(&self) -> &Mutex<()> {
        &self.lock
    }

    fn record(&self, owner: Owner, kind: LockEventKind) {
        let mut journal = self.journal.lock();
        let sequence = journal.len() as u64;
        journal.push(LockEvent {
            sequence,
            owner,
            kind,
            at: Instant::now(),
        });
    }
}

/// Scoped ownership of a [`Monitor`].
///
/// The release is journaled before the underlying lock is dropped.
#[derive(Debug)]
pub struct MonitorGuard<'a> {
    monitor: &'a Monitor,
    owner: Owner,
    contended: bool,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> MonitorGuard<'a> {
    fn new(monitor: &'a Monitor, owner: Owner, contended: bool, guard: MutexGuard<'a, ()>) -> Self {
        monitor.record(owner, LockEventKind::Acquired { contended });
        Self {
            monitor,
            owner,
            contended,
            _guard: guard,
        }
    }

    /// Returns who holds this guard.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Returns whether this acquisition had to wait for another owner.
    #[inline]
    #[must_use]
    pub fn contended(&self) -> bool {
        self.contended
    }
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        self.monitor.record(self.owner, LockEventKind::Released);
    }
}
