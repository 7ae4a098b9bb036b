//! Subtraction question generator.
//!
//! Minuends come from 9..=18 and subtrahends from 5..=12. A draw with
//! minuend < subtrahend is swapped so answers are never negative. Within one
//! session a pair is never repeated.

use crate::error::{PracticeError, PracticeResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;

pub const MINUEND_RANGE: RangeInclusive<u8> = 9..=18;
pub const SUBTRAHEND_RANGE: RangeInclusive<u8> = 5..=12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    pub minuend: u8,
    pub subtrahend: u8,
}

impl Question {
    pub fn answer(&self) -> i64 {
        i64::from(self.minuend) - i64::from(self.subtrahend)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.minuend, self.subtrahend)
    }
}

/// Every pair the generator can produce
pub fn all_pairs() -> Vec<Question> {
    let mut pairs = Vec::new();
    for minuend in MINUEND_RANGE {
        for subtrahend in SUBTRAHEND_RANGE {
            if minuend >= subtrahend {
                pairs.push(Question {
                    minuend,
                    subtrahend,
                });
            }
        }
    }
    pairs
}

#[derive(Debug, Clone)]
pub struct QuestionGenerator {
    max_attempts: u32,
}

impl Default for QuestionGenerator {
    fn default() -> Self {
        Self { max_attempts: 1000 }
    }
}

impl QuestionGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Draw a pair not in `excluding` and add it there.
    ///
    /// Rejection sampling runs for at most `max_attempts` draws; after that the
    /// pair is chosen uniformly among the unused ones. Fails with
    /// `QuestionsExhausted` once every pair has been used.
    pub fn next<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        excluding: &mut HashSet<Question>,
    ) -> PracticeResult<Question> {
        for _ in 0..self.max_attempts {
            let question = draw(rng);
            if excluding.insert(question) {
                return Ok(question);
            }
        }

        let pairs = all_pairs();
        let remaining: Vec<Question> = pairs
            .iter()
            .copied()
            .filter(|q| !excluding.contains(q))
            .collect();
        let question = remaining
            .choose(rng)
            .copied()
            .ok_or(PracticeError::QuestionsExhausted(pairs.len()))?;
        excluding.insert(question);
        Ok(question)
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R) -> Question {
    let a = rng.gen_range(MINUEND_RANGE);
    let b = rng.gen_range(SUBTRAHEND_RANGE);
    if a < b {
        Question {
            minuend: b,
            subtrahend: a,
        }
    } else {
        Question {
            minuend: a,
            subtrahend: b,
        }
    }
}
