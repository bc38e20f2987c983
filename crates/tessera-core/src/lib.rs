#![forbid(unsafe_code)]

//! Core: subscriber lists and dependency capture for Tessera.
//!
//! This crate is the leaf of the reactivity stack. It knows nothing about
//! observed values; it provides the two primitives everything above it is
//! built from:
//!
//! - [`Dep`]: a registry of computations interested in one value, with
//!   synchronous change fan-out.
//! - The capture stack: a thread-local slot holding the computation whose
//!   reads are currently being recorded, entered and exited via the RAII
//!   [`CaptureGuard`].
//!
//! The computation type itself lives in higher layers; it only has to
//! implement the small [`Subscriber`] contract.

pub mod dep;
pub mod subscriber;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use dep::Dep;
pub use subscriber::{CaptureGuard, Subscriber, current, is_capturing, next_subscriber_id};
