//! Offline completion client.

use async_trait::async_trait;
use rand::Rng;
use verbmerger::error::PromptError;
use verbmerger::merge::CompletionClient;

/// Answers every request row with one of its own three words, picked at random.
///
/// Stands in for a hosted model so the batching pipeline can be driven
/// without network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomWordClient;

#[async_trait]
impl CompletionClient for RandomWordClient {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String, PromptError> {
        let answer = user_prompt
            .lines()
            .filter_map(answer_row)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(answer)
    }
}

/// Extends a `subject | verb | object` row with a random pick of its words.
fn answer_row(row: &str) -> Option<String> {
    let columns: Vec<&str> = row.split('|').map(str::trim).collect();
    let [subject, verb, object] = columns[..] else {
        return None;
    };

    let (word, part_of_speech) = match rand::thread_rng().gen_range(0..3) {
        0 => (subject, "Noun"),
        1 => (verb, "Verb"),
        _ => (object, "Noun"),
    };
    Some(format!("{subject} | {verb} | {object} | {word} | {part_of_speech}"))
}
