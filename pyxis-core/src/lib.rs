//! Pyxis Core
//!
//! Reconciliation primitives shared by Pyxis providers:
//!
//! - **LifecycleState**: the status a remote managed object reports
//! - **wait_for_state**: a constant-cadence poll loop that drives an object
//!   from a pending state into a target state (or fails with a descriptive
//!   error)
//!
//! The poll loop is deliberately simple: one probe, one sleep, repeat. Cloud
//! provisioning operates on a scale of minutes, so there is no exponential
//! backoff and no concurrent poll multiplexing here.

pub mod status;
pub mod waiter;

pub use status::LifecycleState;
pub use waiter::{PollSpec, Probe, WaitError, wait_for_state};
