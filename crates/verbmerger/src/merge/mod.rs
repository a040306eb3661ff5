//! # Word Merging
//!
//! The domain built on top of [`crate::core`]: three words in, one word out.
//!
//! * `types` - Inputs, outputs and result statuses.
//! * `seed` - The built-in exemplar merges.
//! * `repository` - Known merges, example sampling and input filtering.
//! * `prompt` - The batch processor that prompts a language model.
//! * `service` - Cache lookup in front of the coalescer.

mod prompt;
mod repository;
mod seed;
mod service;
mod types;

pub use prompt::{CompletionClient, PromptBatchProcessor, format_request, parse_response};
pub use repository::{
    FilterStatus, FilteredInput, InMemoryMergeRepository, MergeRepository, MergeSampler,
};
pub use seed::{BuiltinSeeder, MergeResultSeeder, parse_exemplars};
pub use service::{MergerService, Prompter};
pub use types::{
    MergeInput, MergeOutput, MergeOutputResult, MergeOutputStatus, MergeResult, PartOfSpeech,
    UnknownPartOfSpeech, Word,
};
