#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Token-bucket bandwidth pacing used to cap sender/receiver throughput on a
//! session. The limiter's rate is supplied by a callback re-read on every
//! request, so surrounding code (a UI slider, a config reload) can change the
//! cap live without tearing down an in-flight transfer.
//!
//! # Design
//!
//! A rate of `0` bytes/second means unlimited and is a fast path: `await_tokens`
//! returns immediately without touching the clock. Otherwise tokens refill at
//! `rate` bytes/second, capped at one second's worth (the maximum burst), and a
//! request for more tokens than are available sleeps for the shortfall.
//!
//! # Errors
//!
//! The synchronous and asynchronous waits are both cancellable: a caller can
//! interrupt a pending sleep by dropping the future (async) or checking the
//! [`Cancelled`] signal themselves around the blocking call (sync).
//!
//! # Examples
//!
//! ```
//! use bandwidth::Limiter;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! let rate = Arc::new(AtomicU64::new(0));
//! let limiter = Limiter::new({
//!     let rate = Arc::clone(&rate);
//!     move || rate.load(Ordering::Relaxed)
//! });
//!
//! // Rate 0 means unlimited; the request returns immediately.
//! let sleep = limiter.await_tokens(4096);
//! assert!(sleep.is_noop());
//! ```

mod limiter;

pub use limiter::{Limiter, LimiterSleep};

/// Signals that a pending wait was cancelled before it completed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bandwidth wait cancelled")
    }
}

impl std::error::Error for Cancelled {}
