//! Pluggable answer selection.

use crate::request::Answer;
use consensus_types::ContentRef;
use serde::{Deserialize, Serialize};

/// Picks the accepted answer of a closed request.
pub trait SelectionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `answers` are in submission order. Returns `None` only when empty.
    fn select<'a>(&self, answers: &'a [Answer]) -> Option<&'a Answer>;
}

/// The earliest answer becomes canonical.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstAccepted;

impl SelectionPolicy for FirstAccepted {
    fn name(&self) -> &'static str {
        "first_accepted"
    }

    fn select<'a>(&self, answers: &'a [Answer]) -> Option<&'a Answer> {
        answers.first()
    }
}

/// The most frequently submitted answer reference wins; ties go to the
/// reference submitted first. Returns that reference's earliest submission.
#[derive(Clone, Copy, Debug, Default)]
pub struct MajorityAnswer;

impl SelectionPolicy for MajorityAnswer {
    fn name(&self) -> &'static str {
        "majority_answer"
    }

    fn select<'a>(&self, answers: &'a [Answer]) -> Option<&'a Answer> {
        // (reference, count, index of first submission), in first-seen order
        let mut tally: Vec<(&ContentRef, usize, usize)> = Vec::new();
        for (i, answer) in answers.iter().enumerate() {
            match tally.iter_mut().find(|(r, _, _)| *r == &answer.answer_ref) {
                Some(entry) => entry.1 += 1,
                None => tally.push((&answer.answer_ref, 1, i)),
            }
        }
        // max_by_key keeps the last maximum, so walk in reverse to keep the first
        tally
            .iter()
            .rev()
            .max_by_key(|(_, count, _)| *count)
            .map(|(_, _, first)| &answers[*first])
    }
}

/// Configurable policy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    FirstAccepted,
    MajorityAnswer,
}

impl PolicyKind {
    pub fn build(self) -> Box<dyn SelectionPolicy> {
        match self {
            PolicyKind::FirstAccepted => Box::new(FirstAccepted),
            PolicyKind::MajorityAnswer => Box::new(MajorityAnswer),
        }
    }
}
