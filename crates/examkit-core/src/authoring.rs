//! Building structured exam content.
//!
//! [`ExamDraft`] writes the same JSON the course editor produces, so the
//! result can be stored as lesson content and read back by
//! [`parse_structured`](crate::parser::parse_structured).

use serde::Serialize;

use crate::error::DraftError;
use crate::model::QuestionType;

#[derive(Debug, Clone, PartialEq, Eq)]
struct DraftOption {
    text: String,
    is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DraftQuestion {
    kind: QuestionType,
    question: String,
    points: u32,
    options: Vec<DraftOption>,
}

/// An exam under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamDraft {
    questions: Vec<DraftQuestion>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditorOption<'a> {
    id: String,
    text: &'a str,
    is_correct: bool,
}

#[derive(Serialize)]
struct EditorQuestion<'a> {
    id: String,
    #[serde(rename = "type")]
    kind: QuestionType,
    question: &'a str,
    points: u32,
    options: Vec<EditorOption<'a>>,
}

impl ExamDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a multiple-choice question. `options` pairs each choice with
    /// whether it is the correct one.
    pub fn multiple_choice<S: Into<String>>(
        mut self,
        question: impl Into<String>,
        points: u32,
        options: impl IntoIterator<Item = (S, bool)>,
    ) -> Self {
        self.questions.push(DraftQuestion {
            kind: QuestionType::MultipleChoice,
            question: question.into(),
            points,
            options: options
                .into_iter()
                .map(|(text, is_correct)| DraftOption {
                    text: text.into(),
                    is_correct,
                })
                .collect(),
        });
        self
    }

    pub fn short_answer(self, question: impl Into<String>, points: u32) -> Self {
        self.open_question(QuestionType::ShortAnswer, question.into(), points)
    }

    pub fn coding(self, question: impl Into<String>, points: u32) -> Self {
        self.open_question(QuestionType::Coding, question.into(), points)
    }

    fn open_question(mut self, kind: QuestionType, question: String, points: u32) -> Self {
        self.questions.push(DraftQuestion {
            kind,
            question,
            points,
            options: Vec::new(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }

    /// Check the draft can be published.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.questions.is_empty() {
            return Err(DraftError::NoQuestions);
        }

        for (index, q) in self.questions.iter().enumerate() {
            let position = index + 1;
            if q.question.trim().is_empty() {
                return Err(DraftError::EmptyQuestion { position });
            }
            if q.kind != QuestionType::MultipleChoice {
                continue;
            }
            if q.options.is_empty() {
                return Err(DraftError::NoOptions { position });
            }
            let count = q.options.iter().filter(|o| o.is_correct).count();
            if count != 1 {
                return Err(DraftError::CorrectOptionCount { position, count });
            }
        }
        Ok(())
    }

    /// Serialize to structured lesson content.
    pub fn to_content(&self) -> Result<String, DraftError> {
        self.validate()?;

        let questions: Vec<EditorQuestion<'_>> = self
            .questions
            .iter()
            .enumerate()
            .map(|(index, q)| EditorQuestion {
                id: (index + 1).to_string(),
                kind: q.kind,
                question: &q.question,
                points: q.points,
                options: q
                    .options
                    .iter()
                    .enumerate()
                    .map(|(o, option)| EditorOption {
                        id: (o + 1).to_string(),
                        text: &option.text,
                        is_correct: option.is_correct,
                    })
                    .collect(),
            })
            .collect();

        // Plain structs of strings and integers always serialize.
        Ok(serde_json::to_string_pretty(&questions).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::check_answers;
    use crate::model::AnswerMap;
    use crate::parser::{parse_exam, parse_structured, ContentFormat};

    fn sample() -> ExamDraft {
        ExamDraft::new()
            .multiple_choice("2+2?", 2, [("3", false), ("4", true)])
            .short_answer("Explain ownership.", 5)
            .coding("Reverse a string.", 10)
    }

    #[test]
    fn round_trips_through_strict_parser() {
        let content = sample().to_content().unwrap();
        let questions = parse_structured(&content).unwrap();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[0].options, vec!["3", "4"]);
        assert_eq!(questions[0].correct_answer.as_deref(), Some("4"));
        assert_eq!(questions[1].kind, QuestionType::ShortAnswer);
        assert_eq!(questions[2].points, 10);

        let parsed = parse_exam(&content);
        assert_eq!(parsed.format, ContentFormat::Structured);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.questions, questions);
    }

    #[test]
    fn draft_answers_score() {
        let questions = parse_structured(&sample().to_content().unwrap()).unwrap();
        let answers: AnswerMap = [(1, "4".to_string())].into();
        let result = check_answers(&questions, &answers);
        assert_eq!(result.score, 2);
        assert_eq!(result.max_score, 17);
    }

    #[test]
    fn writes_editor_field_names() {
        let content = sample().to_content().unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["id"], "1");
        assert_eq!(value[0]["type"], "multiple-choice");
        assert_eq!(value[0]["options"][1]["isCorrect"], true);
        assert_eq!(value[2]["type"], "coding");
    }

    #[test]
    fn empty_draft_is_rejected() {
        assert_eq!(ExamDraft::new().to_content(), Err(DraftError::NoQuestions));
    }

    #[test]
    fn exactly_one_correct_option() {
        let none = ExamDraft::new().multiple_choice("Pick", 1, [("a", false), ("b", false)]);
        assert_eq!(
            none.validate(),
            Err(DraftError::CorrectOptionCount {
                position: 1,
                count: 0
            })
        );

        let two = sample().multiple_choice("Pick", 1, [("a", true), ("b", true)]);
        assert_eq!(
            two.validate(),
            Err(DraftError::CorrectOptionCount {
                position: 4,
                count: 2
            })
        );

        let bare = ExamDraft::new().multiple_choice("Pick", 1, Vec::<(&str, bool)>::new());
        assert_eq!(bare.validate(), Err(DraftError::NoOptions { position: 1 }));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let draft = ExamDraft::new().short_answer("  ", 1);
        assert_eq!(draft.validate(), Err(DraftError::EmptyQuestion { position: 1 }));
    }
}
