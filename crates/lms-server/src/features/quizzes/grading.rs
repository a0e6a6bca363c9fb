//! Quiz grading and retake policy
//!
//! Both are pure: the submit command loads the answer key and the caller's
//! attempt history, then asks these functions for a verdict.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::config::QuizConfig;

/// Every answer of one quiz, keyed by answer id
#[derive(Debug, Clone, Default)]
pub struct AnswerKey {
    answers: HashMap<Uuid, KeyEntry>,
    question_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct KeyEntry {
    question_id: Uuid,
    is_correct: bool,
}

impl AnswerKey {
    /// `question_count` is the number of questions in the quiz, including
    /// questions without answers
    pub fn new(question_count: usize) -> Self {
        Self {
            answers: HashMap::new(),
            question_count,
        }
    }

    pub fn with_answer(mut self, answer_id: Uuid, question_id: Uuid, is_correct: bool) -> Self {
        self.answers.insert(
            answer_id,
            KeyEntry {
                question_id,
                is_correct,
            },
        );
        self
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    /// True only when the answer exists, belongs to `question_id` and is
    /// flagged correct
    fn is_correct(&self, question_id: Uuid, answer_id: Uuid) -> bool {
        self.answers
            .get(&answer_id)
            .is_some_and(|entry| entry.question_id == question_id && entry.is_correct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Grade {
    pub correct: usize,
    pub total: usize,
    /// Percentage in `0.0..=100.0`
    pub score: f64,
    pub passed: bool,
}

/// Grade a submission mapping question id to chosen answer id.
///
/// Answers that are unknown, belong to another question, or belong to
/// another quiz simply count as incorrect.
pub fn grade(key: &AnswerKey, submission: &HashMap<Uuid, Uuid>, pass_score: i32) -> Grade {
    let total = key.question_count();
    let correct = submission
        .iter()
        .filter(|(question_id, answer_id)| key.is_correct(**question_id, **answer_id))
        .count()
        .min(total);

    let score = if total == 0 {
        0.0
    } else {
        correct as f64 * 100.0 / total as f64
    };

    Grade {
        correct,
        total,
        score,
        passed: total > 0 && score >= f64::from(pass_score),
    }
}

/// Limits on retaking a quiz; the default allows unlimited immediate retakes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptPolicy {
    pub max_attempts: Option<u32>,
    pub cooldown: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptDenied {
    #[error("Maximum number of attempts ({max}) reached")]
    LimitReached { max: u32 },

    #[error("Retry available in {retry_after_secs} seconds")]
    CoolingDown { retry_after_secs: u64 },
}

impl AttemptPolicy {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_config(config: &QuizConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            cooldown: config.retry_cooldown_secs.map(Duration::from_secs),
        }
    }

    /// Decide whether another attempt may be recorded now
    pub fn check(
        &self,
        prior_attempts: u32,
        last_attempt_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), AttemptDenied> {
        if let Some(max) = self.max_attempts {
            if prior_attempts >= max {
                return Err(AttemptDenied::LimitReached { max });
            }
        }

        if let (Some(cooldown), Some(last)) = (self.cooldown, last_attempt_at) {
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < cooldown {
                let remaining = cooldown - elapsed;
                return Err(AttemptDenied::CoolingDown {
                    retry_after_secs: remaining.as_secs().max(1),
                });
            }
        }

        Ok(())
    }
}
