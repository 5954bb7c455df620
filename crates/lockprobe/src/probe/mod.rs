//! # The Busy-Lock Scenario
//!
//! One thread enters the monitor and sleeps for a while. Another thread
//! blocks on the same monitor.
//!
//! ```text
//!   ContentionProbe (driver thread)
//!     │
//!     ├── InflationHook::inflate(&monitor)        (optional, before any thread)
//!     ├── ContendingActor::spawn()  ───────────┐  "contending-actor" thread
//!     ├── MeasuredOperation::run()             │
//!     │      arrive(A) ◄──────────────────────►│ arrive(A)
//!     │                                        │ try_enter ✓
//!     │      arrive(B) ◄──────────────────────►│ arrive(B)
//!     │      enter ... blocked ...             │ sleep(hold)
//!     │      enter ✓  counter += 1  ◄──────────│ release
//!     └── join ◄───────────────────────────────┘
//! ```

mod actor;
mod driver;
mod inflation;
mod measured;

pub use actor::{ContendingActor, ACTOR_THREAD_NAME};
pub use driver::{CancelHandle, ContentionProbe, ProbeStage, RENDEZVOUS_PARTIES, RENDEZVOUS_ROUNDS};
pub use inflation::{InflationHook, NoInflation, ParkingInflation};
pub use measured::{MeasuredOperation, Measurement, SharedCounter};
