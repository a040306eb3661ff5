//! Batch processor that answers merges by prompting a language model.
//!
//! A batch is sent as one table, one row per merge:
//!
//! ```text
//! Water | Add | Fire
//! Fire | Add | Water
//! ```
//!
//! and the model answers with the same rows extended by the result and its
//! part of speech:
//!
//! ```text
//! Water | Add | Fire | Steam | Noun
//! Fire | Add | Water | Extinguish | Verb
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::repository::{FilterStatus, MergeSampler};
use super::types::{
    MergeInput, MergeOutput, MergeOutputResult, MergeOutputStatus, MergeResult, PartOfSpeech,
};
use crate::config::MergerConfig;
use crate::core::BatchProcessor;
use crate::error::PromptError;

const SYSTEM_PROMPT_PREAMBLE: &str = "\
You are an alchemist who can only speak in a very constrained way.
Your students give you three words: a subject, a verb and an object. You answer with what the
subject becomes when it performs the verb on the object. Order matters: the first word acts,
the last word is acted upon. \"Water | Add | Fire\" gives \"Steam\", while \"Fire | Add | Water\"
gives \"Extinguish\".

Answer with a single noun or verb where possible, never more than three words. Prefer answers
that teach something about the world, its history and its culture, and use proper nouns when
they fit. When a combination makes no sense, answer \"Nonsense\" as a noun.

Requests arrive as a table with one request per row. Answer with exactly one row per request,
in the same order, repeating the three request columns and adding the answer and its part of
speech (Noun or Verb). Every answer row has five columns separated by \" | \". Never write
anything else.

Examples:
";

const USER_PROMPT_SUFFIX: &str = "\n\nYour Response:\n";

/// The external inference call.
#[async_trait]
pub trait CompletionClient: Send + Sync + 'static {
    /// Sends one system and one user message and returns the model's reply.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, PromptError>;
}

struct CachedPrompt {
    text: String,
    built_at: Instant,
}

/// [`BatchProcessor`] over merges, backed by a [`CompletionClient`].
///
/// Inputs containing words that were never produced before are not sent to
/// the model; they come back as
/// [`MergeOutputStatus::InputTermNotPreviouslyGenerated`] at their original
/// position.
///
/// The system prompt embeds examples sampled from the [`MergeSampler`] and is
/// rebuilt at most once per `system_prompt_cache_time_seconds`.
pub struct PromptBatchProcessor<C, S> {
    client: C,
    sampler: Arc<S>,
    config: MergerConfig,
    system_prompt: Mutex<Option<CachedPrompt>>,
}

impl<C, S> PromptBatchProcessor<C, S>
where
    C: CompletionClient,
    S: MergeSampler + 'static,
{
    pub fn new(client: C, sampler: Arc<S>, config: MergerConfig) -> Self {
        Self {
            client,
            sampler,
            config,
            system_prompt: Mutex::new(None),
        }
    }

    /// Prompts the model for inputs that have already passed the filter.
    async fn prompt_valid(&self, inputs: &[MergeInput]) -> Result<Vec<MergeOutput>, PromptError> {
        let user_prompt = format!("{}{}", format_request(inputs), USER_PROMPT_SUFFIX);
        let system_prompt = self.system_prompt().await;
        debug!(rows = inputs.len(), "prompting model");
        trace!(prompt = %user_prompt);

        let completion = self.client.complete(&system_prompt, &user_prompt);
        let text = match self.config.artificial_prompt_delay() {
            Some(delay) => tokio::join!(completion, tokio::time::sleep(delay)).0?,
            None => completion.await?,
        };
        trace!(completion = %text);

        let mut outputs = parse_response(&text)?;
        if outputs.len() < inputs.len() {
            error!(
                responses = outputs.len(),
                inputs = inputs.len(),
                "model answered fewer rows than requested"
            );
            return Err(PromptError::TooFewRows {
                expected: inputs.len(),
                actual: outputs.len(),
            });
        }
        if outputs.len() > inputs.len() {
            warn!(
                responses = outputs.len(),
                inputs = inputs.len(),
                "dropping extra rows from model answer"
            );
            outputs.truncate(inputs.len());
        }
        Ok(outputs)
    }

    async fn system_prompt(&self) -> String {
        let mut cached = self.system_prompt.lock().await;
        if let Some(prompt) = cached.as_ref() {
            if prompt.built_at.elapsed() < self.config.system_prompt_cache_time() {
                return prompt.text.clone();
            }
        }

        let examples = self
            .sampler
            .sample_examples(self.config.system_prompt_example_sample_count)
            .await;
        let text = format!(
            "{SYSTEM_PROMPT_PREAMBLE}{}\n\nRequest:\n",
            format_examples(&examples)
        );
        info!(examples = examples.len(), "rebuilt system prompt");

        *cached = Some(CachedPrompt {
            text: text.clone(),
            built_at: Instant::now(),
        });
        text
    }
}

#[async_trait]
impl<C, S> BatchProcessor for PromptBatchProcessor<C, S>
where
    C: CompletionClient,
    S: MergeSampler + 'static,
{
    type Input = MergeInput;
    type Output = MergeOutputResult;
    type Error = PromptError;

    async fn process(&self, inputs: Vec<MergeInput>) -> Result<Vec<MergeOutputResult>, PromptError> {
        let filtered = self.sampler.filter(inputs).await;
        let valid: Vec<MergeInput> = filtered
            .iter()
            .filter(|f| f.status == FilterStatus::Valid)
            .map(|f| f.input.clone())
            .collect();

        if valid.len() < filtered.len() {
            debug!(
                rejected = filtered.len() - valid.len(),
                "inputs with unknown words skipped"
            );
        }

        let mut outputs = if valid.is_empty() {
            Vec::new()
        } else {
            self.prompt_valid(&valid).await?
        }
        .into_iter();

        let mut results: Vec<MergeOutputResult> = Vec::with_capacity(filtered.len());
        for entry in filtered {
            let result = match entry.status {
                FilterStatus::Valid => {
                    let Some(output) = outputs.next() else {
                        return Err(PromptError::TooFewRows {
                            expected: valid.len(),
                            actual: results.iter().filter(|r| r.is_success()).count(),
                        });
                    };
                    MergeOutputResult::success(output)
                }
                FilterStatus::TermMissing => {
                    MergeOutputResult::fail(MergeOutputStatus::InputTermNotPreviouslyGenerated)
                }
            };
            results.push(result);
        }
        Ok(results)
    }
}

/// Formats inputs as request rows.
pub fn format_request(inputs: &[MergeInput]) -> String {
    inputs
        .iter()
        .map(MergeInput::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_examples(examples: &[MergeResult]) -> String {
    examples
        .iter()
        .map(|example| {
            format!(
                "{} | {} | {}",
                example.input, example.output.word, example.output.part_of_speech
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses answer rows of the form `subject | verb | object | word | part of speech`.
pub fn parse_response(text: &str) -> Result<Vec<MergeOutput>, PromptError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_row)
        .collect()
}

fn parse_row(row: &str) -> Result<MergeOutput, PromptError> {
    let malformed = |reason: String| PromptError::MalformedRow {
        row: row.to_string(),
        reason,
    };

    let columns: Vec<&str> = row.split('|').map(str::trim).collect();
    let [_, _, _, word, part_of_speech] = columns[..] else {
        return Err(malformed(format!("expected 5 columns, got {}", columns.len())));
    };
    if word.is_empty() {
        return Err(malformed("empty answer".to_string()));
    }
    let part_of_speech: PartOfSpeech = part_of_speech
        .parse()
        .map_err(|e| malformed(format!("{e}")))?;

    Ok(MergeOutput::new(word, part_of_speech))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::repository::{InMemoryMergeRepository, MergeRepository};
    use crate::merge::seed::{BuiltinSeeder, MergeResultSeeder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every row with its subject, and records what it was asked.
    #[derive(Default)]
    struct EchoSubject {
        calls: AtomicUsize,
        last_system: std::sync::Mutex<String>,
        last_user: std::sync::Mutex<String>,
    }

    #[async_trait]
    impl CompletionClient for Arc<EchoSubject> {
        async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, PromptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_system.lock().unwrap() = system_prompt.to_string();
            *self.last_user.lock().unwrap() = user_prompt.to_string();

            let rows: Vec<String> = user_prompt
                .lines()
                .take_while(|line| !line.is_empty())
                .map(|line| {
                    let subject = line.split(" | ").next().unwrap();
                    format!("{line} | {subject} | Noun")
                })
                .collect();
            Ok(rows.join("\n"))
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl CompletionClient for Fixed {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, PromptError> {
            Ok(self.0.to_string())
        }
    }

    fn seeded() -> Arc<InMemoryMergeRepository> {
        Arc::new(InMemoryMergeRepository::with_seed(
            BuiltinSeeder.exemplar_seed().unwrap(),
        ))
    }

    #[test]
    fn test_parse_response_rows() {
        let outputs = parse_response(
            "Water | Add | Fire | Steam | Noun\n\nFire | Add | Water | Extinguish | Verb\r\n",
        )
        .unwrap();
        assert_eq!(
            outputs,
            vec![
                MergeOutput::new("Steam", PartOfSpeech::Noun),
                MergeOutput::new("Extinguish", PartOfSpeech::Verb),
            ]
        );
    }

    #[test]
    fn test_parse_multi_word_answer() {
        let outputs = parse_response("Book | Crystallize | War | War and Peace | Noun").unwrap();
        assert_eq!(outputs[0].word, "War and Peace");
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        assert!(matches!(
            parse_response("Water | Add | Fire | Steam"),
            Err(PromptError::MalformedRow { .. })
        ));
        assert!(matches!(
            parse_response("Water | Add | Fire | Steam | Gas"),
            Err(PromptError::MalformedRow { .. })
        ));
    }

    #[test]
    fn test_format_request() {
        let rows = format_request(&[
            MergeInput::new("Water", "Add", "Fire"),
            MergeInput::new("Stone", "Chip", "Obsidian"),
        ]);
        assert_eq!(rows, "Water | Add | Fire\nStone | Chip | Obsidian");
    }

    #[tokio::test]
    async fn test_filtered_inputs_keep_their_positions() {
        let client = Arc::new(EchoSubject::default());
        let processor =
            PromptBatchProcessor::new(client.clone(), seeded(), MergerConfig::default());

        let results = processor
            .process(vec![
                MergeInput::new("Water", "Add", "Fire"),
                MergeInput::new("Plasma", "Add", "Fire"),
                MergeInput::new("Stone", "Chip", "Obsidian"),
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_success().unwrap().word, "Water");
        assert_eq!(
            results[1],
            MergeOutputResult::fail(MergeOutputStatus::InputTermNotPreviouslyGenerated)
        );
        assert_eq!(results[2].as_success().unwrap().word, "Stone");

        let user = client.last_user.lock().unwrap().clone();
        assert!(user.starts_with("Water | Add | Fire\nStone | Chip | Obsidian"));
        assert!(!user.contains("Plasma"));
    }

    #[tokio::test]
    async fn test_all_filtered_skips_model() {
        let client = Arc::new(EchoSubject::default());
        let processor =
            PromptBatchProcessor::new(client.clone(), seeded(), MergerConfig::default());

        let results = processor
            .process(vec![MergeInput::new("Plasma", "Add", "Fire")])
            .await
            .unwrap();

        assert!(!results[0].is_success());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_too_few_rows_fails_batch() {
        let processor = PromptBatchProcessor::new(
            Fixed("Water | Add | Fire | Steam | Noun"),
            seeded(),
            MergerConfig::default(),
        );

        let err = processor
            .process(vec![
                MergeInput::new("Water", "Add", "Fire"),
                MergeInput::new("Fire", "Add", "Water"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::TooFewRows { expected: 2, actual: 1 }));
    }

    #[tokio::test]
    async fn test_extra_rows_are_dropped() {
        let processor = PromptBatchProcessor::new(
            Fixed("Water | Add | Fire | Steam | Noun\nFire | Add | Water | Extinguish | Verb"),
            seeded(),
            MergerConfig::default(),
        );

        let results = processor
            .process(vec![MergeInput::new("Water", "Add", "Fire")])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_success().unwrap().word, "Steam");
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_prompt_is_cached_then_rebuilt() {
        let repository = seeded();
        let config = MergerConfig {
            system_prompt_cache_time_seconds: 60,
            system_prompt_example_sample_count: 100,
            ..MergerConfig::default()
        };
        let processor = PromptBatchProcessor::new(Fixed(""), repository.clone(), config);

        let first = processor.system_prompt().await;
        assert!(first.contains("Water | Add | Fire | Steam | Noun"));
        assert!(first.contains("Fire | Add | Water | Extinguish | Verb"));
        assert!(first.ends_with("Request:\n"));

        repository
            .set_output(
                MergeInput::new("Steam", "Add", "Fire"),
                MergeOutput::new("Plasma", PartOfSpeech::Noun),
            )
            .await
            .unwrap();

        // The new merge does not show up until the cached prompt expires.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(processor.system_prompt().await, first);

        tokio::time::advance(Duration::from_secs(31)).await;
        let rebuilt = processor.system_prompt().await;
        assert!(rebuilt.contains("Steam | Add | Fire | Plasma | Noun"));
    }

    #[tokio::test]
    async fn test_sample_count_bounds_examples() {
        let config = MergerConfig {
            system_prompt_example_sample_count: 1,
            ..MergerConfig::default()
        };
        let processor = PromptBatchProcessor::new(Fixed(""), seeded(), config);

        let prompt = processor.system_prompt().await;
        assert!(prompt.contains("Water | Add | Fire | Steam | Noun"));
        assert!(!prompt.contains("Extinguish | Verb"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_artificial_delay_runs_alongside_completion() {
        let config = MergerConfig {
            artificial_prompt_delay_seconds: 2.0,
            ..MergerConfig::default()
        };
        let processor = PromptBatchProcessor::new(
            Fixed("Water | Add | Fire | Steam | Noun"),
            seeded(),
            config,
        );

        let start = Instant::now();
        processor
            .process(vec![MergeInput::new("Water", "Add", "Fire")])
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
