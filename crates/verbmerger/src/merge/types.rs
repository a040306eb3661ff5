use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Three words to merge: who acts, the action, and what it acts on.
///
/// Word order matters; `Fire | Add | Water` and `Water | Add | Fire` are
/// different merges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeInput {
    pub subject: String,
    pub verb: String,
    pub object: String,
}

impl MergeInput {
    pub fn new(
        subject: impl Into<String>,
        verb: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            verb: verb.into(),
            object: object.into(),
        }
    }

    /// The subject and object are nouns, the verb is a verb.
    pub fn words(&self) -> [Word; 3] {
        [
            Word::noun(&self.subject),
            Word::verb(&self.verb),
            Word::noun(&self.object),
        ]
    }
}

impl fmt::Display for MergeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.subject, self.verb, self.object)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartOfSpeech {
    Noun,
    Verb,
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartOfSpeech::Noun => f.write_str("Noun"),
            PartOfSpeech::Verb => f.write_str("Verb"),
        }
    }
}

/// A part of speech other than `Noun` or `Verb`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown part of speech {0:?}")]
pub struct UnknownPartOfSpeech(pub String);

impl FromStr for PartOfSpeech {
    type Err = UnknownPartOfSpeech;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Noun" => Ok(PartOfSpeech::Noun),
            "Verb" => Ok(PartOfSpeech::Verb),
            other => Err(UnknownPartOfSpeech(other.to_string())),
        }
    }
}

/// The word a merge produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeOutput {
    pub word: String,
    pub part_of_speech: PartOfSpeech,
}

impl MergeOutput {
    pub fn new(word: impl Into<String>, part_of_speech: PartOfSpeech) -> Self {
        Self {
            word: word.into(),
            part_of_speech,
        }
    }

    pub fn to_word(&self) -> Word {
        Word {
            text: self.word.clone(),
            part_of_speech: self.part_of_speech,
        }
    }
}

/// A completed merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub input: MergeInput,
    pub output: MergeOutput,
}

impl MergeResult {
    pub fn new(input: MergeInput, output: MergeOutput) -> Self {
        Self { input, output }
    }
}

/// A word together with the role it can play in a merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub part_of_speech: PartOfSpeech,
}

impl Word {
    pub fn noun(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            part_of_speech: PartOfSpeech::Noun,
        }
    }

    pub fn verb(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            part_of_speech: PartOfSpeech::Verb,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOutputStatus {
    Valid,
    /// One of the input words was never produced by an earlier merge.
    InputTermNotPreviouslyGenerated,
}

/// The outcome of asking for a merge; only `Valid` results carry an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutputResult {
    pub status: MergeOutputStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<MergeOutput>,
}

impl MergeOutputResult {
    pub fn success(output: MergeOutput) -> Self {
        Self {
            status: MergeOutputStatus::Valid,
            output: Some(output),
        }
    }

    pub fn fail(status: MergeOutputStatus) -> Self {
        Self {
            status,
            output: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == MergeOutputStatus::Valid && self.output.is_some()
    }

    /// The output, if this result is a success.
    pub fn as_success(&self) -> Option<&MergeOutput> {
        match self.status {
            MergeOutputStatus::Valid => self.output.as_ref(),
            _ => None,
        }
    }
}
