//! # Adaptive Micro-Batching
//!
//! The core module accumulates requests submitted concurrently by independent
//! callers into bounded batches, hands each batch to a [`BatchProcessor`]
//! exactly once, and returns every caller the output at its own position.
//!
//! ## Module Structure
//!
//! * `request` - Pairs a caller's input with the write-once slot for its output.
//!
//! * `signal` - Single-resolution, multi-waiter completion signal shared by all
//!   requests of one generation.
//!
//! * `generation` - The current generation and the two atomic operations on it:
//!   insert, and detach (swap for a fresh empty generation).
//!
//! * `coalescer` - [`BatchCoalescer`], which decides when a generation is due
//!   (full, or its batch interval elapsed), dispatches it and publishes results.
//!
//! * `worker` - Tracks the monitor and dispatch tasks a coalescer spawns and
//!   carries its cancellation token.
//!
//! ## Lifecycle of a generation
//!
//! ```text
//! Empty ──submit──> Accumulating ──full / interval──> Taken ──process──> Resolved
//!                        │                                        └────> Failed
//!                        └──────────────cancel──────────────────────────> Cancelled
//! ```
//!
//! Whichever trigger detaches a generation owns it; the other trigger finds a
//! different generation current and does nothing.

mod coalescer;
mod generation;
mod processor;
mod request;
mod signal;
mod stats;
mod ticket;
mod worker;

pub use coalescer::BatchCoalescer;
pub use processor::BatchProcessor;
pub use stats::{CoalescerStats, DispatchReason};
pub use ticket::Ticket;
