//! Built-in exemplar merges.
//!
//! The exemplars seed the repository, so the first prompts have examples to
//! show the model and the first inputs have words to be built from.

use std::collections::HashSet;

use super::types::{MergeInput, MergeOutput, MergeResult, PartOfSpeech, Word};
use crate::error::MergeError;

const EXEMPLARS: &str = "
Water,Add,Fire,Steam,Noun
Fire,Add,Water,Extinguish,Verb
Stone,Chip,Obsidian,Blade,Noun
Fire,Harden,Stone,Obsidian,Noun
Air,Add,Mud,Splatter,Verb
Mountain,Crystallize,Mountain,Peak,Noun
Cliff,Char,Peak,Nonsense,Noun
Soil,Add,Ash,Fertilize,Verb
Water,Fertilize,Soil,Grow,Verb
Water,Fertilize,Air,Life,Noun
Life,Nourish,Life,Reproduce,Verb
Air,Add,Air,Whirlwind,Noun
Whirlwind,Add,Whirlwind,Chaos,Noun
Mud,Add,Fire,Harden,Verb
Chaos,Grow,Life,Evolve,Verb
Chaos,Add,Order,Chaos,Noun
Order,Add,Chaos,Knowledge,Noun
Knowledge,Reproduce,Knowledge,Book,Noun
Stone,Harden,Book,Tablet,Noun
Book,Crystallize,War,War and Peace,Noun
Book,Harden,Fire,Fahrenheit 451,Noun
Knowledge,Fertilize,Life,Human,Noun
Human,Add,Book,Scribe,Noun
Mud,Remove,Water,Earth,Noun
Nothing,Add,Water,Water,Noun
";

/// Source of exemplar merges.
pub trait MergeResultSeeder {
    fn exemplar_seed(&self) -> Result<Vec<MergeResult>, MergeError>;

    /// Every word that appears in an exemplar, as input or output.
    fn all_valid_words(&self) -> Result<HashSet<Word>, MergeError> {
        let words = self
            .exemplar_seed()?
            .iter()
            .flat_map(|result| {
                result
                    .input
                    .words()
                    .into_iter()
                    .chain(std::iter::once(result.output.to_word()))
            })
            .collect();
        Ok(words)
    }
}

/// The exemplar table compiled into the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSeeder;

impl MergeResultSeeder for BuiltinSeeder {
    fn exemplar_seed(&self) -> Result<Vec<MergeResult>, MergeError> {
        parse_exemplars(EXEMPLARS)
    }
}

/// Parses `subject,verb,object,word,part_of_speech` rows, skipping blank lines.
pub fn parse_exemplars(table: &str) -> Result<Vec<MergeResult>, MergeError> {
    table
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_exemplar)
        .collect()
}

fn parse_exemplar(row: &str) -> Result<MergeResult, MergeError> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    let [subject, verb, object, word, part_of_speech] = fields[..] else {
        return Err(MergeError::Seed {
            row: row.to_string(),
            reason: format!("expected 5 fields, got {}", fields.len()),
        });
    };

    let part_of_speech: PartOfSpeech = part_of_speech.parse().map_err(|e| MergeError::Seed {
        row: row.to_string(),
        reason: format!("{e}"),
    })?;

    Ok(MergeResult::new(
        MergeInput::new(subject, verb, object),
        MergeOutput::new(word, part_of_speech),
    ))
}
