//! # VerbMerger
//!
//! Batched word-merge inference: callers ask what three words
//! (`subject | verb | object`) combine into, and many concurrent questions are
//! answered by a single call to a language model.
//!
//! ## Overview
//!
//! A single model call costs roughly the same whether it answers one merge or
//! thirty, so answering merges one at a time wastes most of the model's
//! capacity. This crate coalesces concurrent requests into bounded batches
//! without making any caller wait longer than a configured interval.
//!
//! Key components include:
//!
//! - [`core::BatchCoalescer`] - the generic micro-batching coalescer
//! - [`core::BatchProcessor`] - the trait a batch-capable downstream implements
//! - [`merge::PromptBatchProcessor`] - a batch processor that prompts a model
//!   with a table of merges and parses the table it answers with
//! - [`merge::MergerService`] - cache lookup in front of the coalescer
//!
//! ## Control flow
//!
//! ```text
//! caller ──> MergerService ──hit──> cached output
//!                 │
//!                miss
//!                 ▼
//!          BatchCoalescer ──batch──> PromptBatchProcessor ──> CompletionClient
//!                 │
//!                 ▼
//!         output for this caller ──> stored in the repository
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use verbmerger::config::CoalescerConfig;
//! use verbmerger::core::{BatchCoalescer, BatchProcessor};
//!
//! struct Lengths;
//!
//! #[async_trait]
//! impl BatchProcessor for Lengths {
//!     type Input = String;
//!     type Output = usize;
//!     type Error = std::convert::Infallible;
//!
//!     async fn process(&self, inputs: Vec<String>) -> Result<Vec<usize>, Self::Error> {
//!         Ok(inputs.iter().map(String::len).collect())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = CoalescerConfig::new(16, Duration::from_millis(5)).unwrap();
//! let coalescer = BatchCoalescer::new(Lengths, config);
//!
//! let (a, b) = tokio::join!(
//!     coalescer.submit("water".to_string()),
//!     coalescer.submit("fire".to_string()),
//! );
//! assert_eq!(a.unwrap(), 5);
//! assert_eq!(b.unwrap(), 4);
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod merge;
pub mod observability;
