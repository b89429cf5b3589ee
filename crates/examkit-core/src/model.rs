//! Core data model types for examkit.
//!
//! These types mirror the records exchanged with the LMS backend and the
//! normalized question list produced by the content parser.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a question within one exam.
pub type QuestionId = u64;

/// A student's answers keyed by question id.
pub type AnswerMap = BTreeMap<QuestionId, String>;

/// The kind of an exam question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    ShortAnswer,
    Coding,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple-choice"),
            QuestionType::ShortAnswer => write!(f, "short-answer"),
            QuestionType::Coding => write!(f, "coding"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple-choice" => Ok(QuestionType::MultipleChoice),
            "short-answer" => Ok(QuestionType::ShortAnswer),
            "coding" => Ok(QuestionType::Coding),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A normalized exam question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamQuestion {
    /// Unique within one exam, stable across parses of the same content.
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Prompt text shown to the student.
    pub question: String,
    /// Answer options; empty unless `kind` is multiple-choice.
    #[serde(default)]
    pub options: Vec<String>,
    pub points: u32,
    /// Option text or reference text considered correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Whether a lesson is regular reading material or an exam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    #[default]
    Lesson,
    Exam,
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonType::Lesson => write!(f, "lesson"),
            LessonType::Exam => write!(f, "exam"),
        }
    }
}

/// A lesson record as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// Raw content: markdown, or a JSON question array for exams.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub lesson_type: LessonType,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
}

fn default_duration_minutes() -> u32 {
    30
}

/// Minimal reference to the module that owns a lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRef {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

/// A lesson together with its owning module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonDetail {
    pub lesson: Lesson,
    pub module: ModuleRef,
}

/// A lesson entry inside a module listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSummary {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lesson_type: LessonType,
    #[serde(default)]
    pub order: i32,
}

/// A module with its lessons and the student's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lessons: Vec<LessonSummary>,
    /// Completion percentage, 0-100.
    #[serde(default)]
    pub progress: u32,
}

impl Module {
    /// Number of exam lessons in this module.
    pub fn exam_count(&self) -> usize {
        self.lessons
            .iter()
            .filter(|l| l.lesson_type == LessonType::Exam)
            .count()
    }
}

/// The backend's verdict on a submitted answer set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub max_score: u32,
    #[serde(default)]
    pub percentage: f64,
}

/// A past exam attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamHistoryEntry {
    pub id: u64,
    #[serde(default)]
    pub lesson_id: Option<u64>,
    #[serde(default)]
    pub lesson_title: String,
    #[serde(default)]
    pub module_id: Option<u64>,
    #[serde(default)]
    pub module_title: String,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub max_score: Option<u32>,
    #[serde(default)]
    pub percentage: Option<f64>,
    pub date_finished: DateTime<Utc>,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub correct_answers: AnswerMap,
}
