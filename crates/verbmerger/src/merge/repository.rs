use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::{MergeInput, MergeOutput, MergeResult, Word};
use crate::error::MergeError;

/// Gets and sets merge results. May not be persistent, for example an in-memory cache.
#[async_trait]
pub trait MergeRepository: Send + Sync {
    async fn find_output(&self, input: &MergeInput) -> Result<Option<MergeOutput>, MergeError>;

    async fn set_output(&self, input: MergeInput, output: MergeOutput) -> Result<(), MergeError>;
}

/// Whether an input may be sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    Valid,
    /// At least one of the input's words has never been produced.
    TermMissing,
}

/// An input together with its [`FilterStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredInput {
    pub input: MergeInput,
    pub status: FilterStatus,
}

/// Read access to known merges for prompting.
#[async_trait]
pub trait MergeSampler: Send + Sync {
    /// Samples up to `count` known merges to show the model as examples.
    async fn sample_examples(&self, count: usize) -> Vec<MergeResult>;

    /// Marks every input whose words have not all been produced before.
    async fn filter(&self, inputs: Vec<MergeInput>) -> Vec<FilteredInput>;
}

#[derive(Debug, Default)]
struct Store {
    outputs: HashMap<MergeInput, MergeOutput>,
    /// Insertion order of `outputs`, so sampling is stable.
    order: Vec<MergeInput>,
    words: HashSet<Word>,
}

impl Store {
    fn insert(&mut self, input: MergeInput, output: MergeOutput) {
        self.words.extend(input.words());
        self.words.insert(output.to_word());
        if self.outputs.insert(input.clone(), output).is_none() {
            self.order.push(input);
        }
    }
}

/// Process-local repository and sampler.
#[derive(Debug, Default)]
pub struct InMemoryMergeRepository {
    store: RwLock<Store>,
}

impl InMemoryMergeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository that already knows `seed`.
    pub fn with_seed(seed: impl IntoIterator<Item = MergeResult>) -> Self {
        let mut store = Store::default();
        for result in seed {
            store.insert(result.input, result.output);
        }
        Self {
            store: RwLock::new(store),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.outputs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MergeRepository for InMemoryMergeRepository {
    async fn find_output(&self, input: &MergeInput) -> Result<Option<MergeOutput>, MergeError> {
        Ok(self.store.read().await.outputs.get(input).cloned())
    }

    async fn set_output(&self, input: MergeInput, output: MergeOutput) -> Result<(), MergeError> {
        self.store.write().await.insert(input, output);
        Ok(())
    }
}

#[async_trait]
impl MergeSampler for InMemoryMergeRepository {
    async fn sample_examples(&self, count: usize) -> Vec<MergeResult> {
        let store = self.store.read().await;
        store
            .order
            .iter()
            .take(count)
            .filter_map(|input| {
                store
                    .outputs
                    .get(input)
                    .map(|output| MergeResult::new(input.clone(), output.clone()))
            })
            .collect()
    }

    async fn filter(&self, inputs: Vec<MergeInput>) -> Vec<FilteredInput> {
        let store = self.store.read().await;
        inputs
            .into_iter()
            .map(|input| {
                let known = input.words().iter().all(|word| store.words.contains(word));
                let status = if known {
                    FilterStatus::Valid
                } else {
                    FilterStatus::TermMissing
                };
                FilteredInput { input, status }
            })
            .collect()
    }
}
