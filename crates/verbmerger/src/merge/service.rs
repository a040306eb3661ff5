use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::repository::MergeRepository;
use super::types::{MergeInput, MergeOutputResult};
use crate::core::{BatchCoalescer, BatchProcessor};
use crate::error::{CoalescerError, MergeError};

/// Answers one merge at a time.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn prompt(&self, input: MergeInput) -> Result<MergeOutputResult, CoalescerError>;
}

#[async_trait]
impl<P> Prompter for BatchCoalescer<P>
where
    P: BatchProcessor<Input = MergeInput, Output = MergeOutputResult>,
{
    async fn prompt(&self, input: MergeInput) -> Result<MergeOutputResult, CoalescerError> {
        self.submit(input).await
    }
}

/// Cache lookup in front of a [`Prompter`].
///
/// Only misses reach the prompter, and only successful results are stored.
pub struct MergerService<R, P> {
    repository: Arc<R>,
    prompter: P,
}

impl<R, P> MergerService<R, P>
where
    R: MergeRepository,
    P: Prompter,
{
    pub fn new(repository: Arc<R>, prompter: P) -> Self {
        Self {
            repository,
            prompter,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Returns the merge of `input`, prompting the model on a cache miss.
    pub async fn get_output(&self, input: MergeInput) -> Result<MergeOutputResult, MergeError> {
        if let Some(output) = self.repository.find_output(&input).await? {
            debug!(%input, "cache hit");
            return Ok(MergeOutputResult::success(output));
        }

        info!(%input, "cache miss");
        let result = self.prompter.prompt(input.clone()).await?;

        if let Some(output) = result.as_success() {
            self.repository.set_output(input, output.clone()).await?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::repository::InMemoryMergeRepository;
    use crate::merge::types::{MergeOutput, MergeOutputStatus, PartOfSpeech};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers with the object, or fails every call.
    #[derive(Default)]
    struct CountingPrompter {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Prompter for CountingPrompter {
        async fn prompt(&self, input: MergeInput) -> Result<MergeOutputResult, CoalescerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CoalescerError::Cancelled);
            }
            if input.object == "Void" {
                return Ok(MergeOutputResult::fail(
                    MergeOutputStatus::InputTermNotPreviouslyGenerated,
                ));
            }
            Ok(MergeOutputResult::success(MergeOutput::new(
                input.object,
                PartOfSpeech::Noun,
            )))
        }
    }

    #[tokio::test]
    async fn test_miss_prompts_and_stores() {
        let service = MergerService::new(
            Arc::new(InMemoryMergeRepository::new()),
            CountingPrompter::default(),
        );
        let input = MergeInput::new("Water", "Add", "Fire");

        let first = service.get_output(input.clone()).await.unwrap();
        let second = service.get_output(input.clone()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.prompter().calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            service.repository().find_output(&input).await.unwrap(),
            Some(MergeOutput::new("Fire", PartOfSpeech::Noun))
        );
    }

    #[tokio::test]
    async fn test_unsuccessful_results_are_not_stored() {
        let service = MergerService::new(
            Arc::new(InMemoryMergeRepository::new()),
            CountingPrompter::default(),
        );
        let input = MergeInput::new("Water", "Add", "Void");

        let result = service.get_output(input.clone()).await.unwrap();
        assert!(!result.is_success());
        assert!(service.repository().is_empty().await);

        service.get_output(input).await.unwrap();
        assert_eq!(service.prompter().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_prompt_failure_propagates() {
        let service = MergerService::new(
            Arc::new(InMemoryMergeRepository::new()),
            CountingPrompter {
                fail: true,
                ..CountingPrompter::default()
            },
        );

        let err = service
            .get_output(MergeInput::new("Water", "Add", "Fire"))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::Coalescer(CoalescerError::Cancelled)));
    }
}
