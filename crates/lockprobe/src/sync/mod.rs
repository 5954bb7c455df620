//! # Synchronization Primitives for the Contention Probe
//!
//! ORDER BY RENDEZVOUS. NEVER BY SLEEP.
//!
//! ## The Problem
//!
//! ```text
//! Actor thread:     lock ──────── hold ──────── unlock
//! Measured thread:        lock?  (fast path or slow path?)
//!
//! Without ordering: measured may lock FIRST → uncontended → nothing observed
//! With sleep():     ordering is a GUESS     → flaky on a loaded machine
//! ```
//!
//! ## The Solution: Two Rendezvous Points
//!
//! ```text
//! Actor:     arrive(A) ── try_enter ── arrive(B) ── sleep ── release
//! Measured:  arrive(A) ─────────────── arrive(B) ── enter (blocks) ── counter += 1
//! ```
//!
//! B cannot complete before the actor holds the monitor, so the measured
//! `enter` always happens-after the actor's acquisition.

mod monitor;
mod rendezvous;

pub use monitor::{LockEvent, LockEventKind, Monitor, MonitorGuard, Owner};
pub use rendezvous::{CancelOnDrop, Rendezvous};
