//! Combinatorial expansion of per-blank accepted answers.
//!
//! Multi-blank questions accept any combination of the accepted labels of
//! each blank. The target format has no per-blank alternatives, so the full
//! cross product is enumerated: the first combination becomes the valid
//! response and every other combination an alternate response.

use serde::{Deserialize, Serialize};

/// One complete accepted answer with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResponse {
    pub score: f64,
    pub value: Vec<String>,
}

/// Expands per-blank candidate lists into every complete answer.
///
/// The expander borrows its input and never mutates it; [`AnswerExpander::iter`]
/// can be called any number of times and always yields the same sequence.
///
/// # Examples
/// ```
/// use qti_converter::answers::AnswerExpander;
///
/// let blanks = vec![
///     vec!["Red".to_string()],
///     vec!["Blue".to_string(), "BLUE".to_string()],
/// ];
/// let expander = AnswerExpander::new(&blanks, 2.0);
///
/// let answers: Vec<_> = expander.iter().collect();
/// assert_eq!(answers.len(), 2);
/// assert_eq!(answers[0].value, vec!["Red", "Blue"]);
/// assert_eq!(answers[1].value, vec!["Red", "BLUE"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AnswerExpander<'a> {
    blanks: &'a [Vec<String>],
    score: f64,
}

impl<'a> AnswerExpander<'a> {
    /// Create an expander over candidate lists in template order.
    #[must_use]
    pub fn new(blanks: &'a [Vec<String>], score: f64) -> Self {
        Self { blanks, score }
    }

    /// Number of combinations the expansion yields.
    #[must_use]
    pub fn count(&self) -> usize {
        self.blanks.iter().map(Vec::len).product()
    }

    /// Index of the first blank without candidates, if any.
    #[must_use]
    pub fn first_empty_blank(&self) -> Option<usize> {
        self.blanks.iter().position(Vec::is_empty)
    }

    /// Lazily enumerate every combination depth first.
    ///
    /// Blank 0 is the outermost position and candidates keep document order, so
    /// the first combination picks the first candidate of every blank.
    #[must_use]
    pub fn iter(&self) -> Combinations<'a> {
        let exhausted = self.first_empty_blank().is_some();
        Combinations {
            blanks: self.blanks,
            score: self.score,
            indices: vec![0; self.blanks.len()],
            exhausted,
        }
    }

    /// Split the expansion into the valid response and its alternates.
    ///
    /// Returns `None` when any blank has no candidates.
    #[must_use]
    pub fn valid_and_alternates(&self) -> Option<(ScoredResponse, Vec<ScoredResponse>)> {
        let mut all = self.iter();
        let valid = all.next()?;
        Some((valid, all.collect()))
    }
}

/// Iterator over answer combinations, odometer style with the last blank
/// advancing fastest.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    blanks: &'a [Vec<String>],
    score: f64,
    indices: Vec<usize>,
    exhausted: bool,
}

impl Iterator for Combinations<'_> {
    type Item = ScoredResponse;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let value = self
            .indices
            .iter()
            .zip(self.blanks)
            .map(|(&i, candidates)| candidates[i].clone())
            .collect();

        // Advance the odometer
        self.exhausted = true;
        for position in (0..self.indices.len()).rev() {
            self.indices[position] += 1;
            if self.indices[position] < self.blanks[position].len() {
                self.exhausted = false;
                break;
            }
            self.indices[position] = 0;
        }

        Some(ScoredResponse {
            score: self.score,
            value,
        })
    }
}
