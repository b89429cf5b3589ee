//! Answer scoring.
//!
//! Correctness is exact string equality with the question's correct answer:
//! case-sensitive, no trimming, no partial credit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{AnswerMap, ExamQuestion, QuestionId};

/// Per-question verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub correct: bool,
    pub correct_answer: Option<String>,
}

/// Score breakdown for one answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u32,
    pub max_score: u32,
    pub results: BTreeMap<QuestionId, QuestionResult>,
}

impl ScoreResult {
    /// Score as a percentage rounded to one decimal; 0 for an unscoreable exam.
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.max_score)
    }

    /// Number of questions answered correctly.
    pub fn correct_count(&self) -> usize {
        self.results.values().filter(|r| r.correct).count()
    }
}

/// `score / max_score` as a percentage rounded to one decimal place.
pub fn percentage(score: u32, max_score: u32) -> f64 {
    if max_score == 0 {
        return 0.0;
    }
    (f64::from(score) / f64::from(max_score) * 1000.0).round() / 10.0
}

/// Score `answers` against `questions`.
///
/// A question the student never answered is incorrect. A question without a
/// correct answer is never correct, whatever the student wrote.
pub fn check_answers(questions: &[ExamQuestion], answers: &AnswerMap) -> ScoreResult {
    let mut score = 0;
    let mut max_score = 0;
    let mut results = BTreeMap::new();

    for question in questions {
        max_score += question.points;

        let correct = match (answers.get(&question.id), &question.correct_answer) {
            (Some(answer), Some(expected)) => answer == expected,
            _ => false,
        };
        if correct {
            score += question.points;
        }

        results.insert(
            question.id,
            QuestionResult {
                correct,
                correct_answer: question.correct_answer.clone(),
            },
        );
    }

    ScoreResult {
        score,
        max_score,
        results,
    }
}
