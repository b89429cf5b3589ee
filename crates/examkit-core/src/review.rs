//! Review of past exam attempts.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::evaluator::percentage;
use crate::model::{ExamHistoryEntry, QuestionId};

/// One question of a past attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewedAnswer {
    pub question_id: QuestionId,
    pub given: Option<String>,
    pub expected: Option<String>,
    pub correct: bool,
}

/// A history entry with correctness re-derived per question.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptReview {
    pub lesson_title: String,
    pub module_title: String,
    pub score: Option<u32>,
    pub max_score: Option<u32>,
    reported_percentage: Option<f64>,
    pub answers: Vec<ReviewedAnswer>,
}

impl AttemptReview {
    /// The backend's percentage, or one computed from the score.
    pub fn percentage(&self) -> Option<f64> {
        self.reported_percentage.or(match (self.score, self.max_score) {
            (Some(score), Some(max)) if max > 0 => Some(percentage(score, max)),
            _ => None,
        })
    }

    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.correct).count()
    }
}

/// Re-derive per-question correctness from a history entry.
pub fn review_attempt(entry: &ExamHistoryEntry) -> AttemptReview {
    let ids: BTreeSet<QuestionId> = entry
        .answers
        .keys()
        .chain(entry.correct_answers.keys())
        .copied()
        .collect();

    let answers = ids
        .into_iter()
        .map(|question_id| {
            let given = entry.answers.get(&question_id).cloned();
            let expected = entry.correct_answers.get(&question_id).cloned();
            let correct = matches!((&given, &expected), (Some(g), Some(e)) if g == e);
            ReviewedAnswer {
                question_id,
                given,
                expected,
                correct,
            }
        })
        .collect();

    AttemptReview {
        lesson_title: entry.lesson_title.clone(),
        module_title: entry.module_title.clone(),
        score: entry.score,
        max_score: entry.max_score,
        reported_percentage: entry.percentage,
        answers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerMap;

    fn entry(answers: &[(u64, &str)], correct: &[(u64, &str)]) -> ExamHistoryEntry {
        let map = |pairs: &[(u64, &str)]| -> AnswerMap {
            pairs.iter().map(|(id, a)| (*id, a.to_string())).collect()
        };
        ExamHistoryEntry {
            id: 1,
            lesson_id: Some(7),
            lesson_title: "Final Exam".into(),
            module_id: Some(1),
            module_title: "Intro".into(),
            score: Some(2),
            max_score: Some(3),
            percentage: None,
            date_finished: "2025-03-01T10:00:00Z".parse().unwrap(),
            answers: map(answers),
            correct_answers: map(correct),
        }
    }

    #[test]
    fn rederives_correctness() {
        let review = review_attempt(&entry(
            &[(1, "4"), (2, "Paris"), (3, "green")],
            &[(1, "4"), (2, "Paris"), (3, "blue")],
        ));
        assert_eq!(review.answers.len(), 3);
        assert_eq!(review.correct_count(), 2);
        assert!(!review.answers[2].correct);
        assert_eq!(review.answers[2].expected.as_deref(), Some("blue"));
    }

    #[test]
    fn unanswered_questions_are_listed_as_incorrect() {
        let review = review_attempt(&entry(&[(1, "4")], &[(1, "4"), (2, "Paris")]));
        assert_eq!(review.answers[1].given, None);
        assert!(!review.answers[1].correct);
    }

    #[test]
    fn answers_without_reference_are_never_correct() {
        let review = review_attempt(&entry(&[(5, "")], &[]));
        assert_eq!(review.answers.len(), 1);
        assert!(!review.answers[0].correct);
    }

    #[test]
    fn percentage_prefers_reported_value() {
        let mut e = entry(&[], &[]);
        assert_eq!(review_attempt(&e).percentage(), Some(66.7));
        e.percentage = Some(50.0);
        assert_eq!(review_attempt(&e).percentage(), Some(50.0));
        e.percentage = None;
        e.max_score = None;
        assert_eq!(review_attempt(&e).percentage(), None);
    }
}
