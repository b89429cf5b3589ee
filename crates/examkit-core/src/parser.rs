//! Exam content parser.
//!
//! Lesson content is either a JSON array of question objects (written by the
//! course editor) or a constrained markdown dialect (older seeded exams).
//! [`parse_exam`] tries the structured form first and falls back to markdown;
//! it never fails, and reports anything it had to skip as warnings.

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ContentError;
use crate::markdown;
use crate::model::{ExamQuestion, QuestionId, QuestionType};

/// Which encoding the content was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    /// A JSON array of question objects.
    Structured,
    /// The markdown exam dialect.
    Markdown,
    /// Blank input.
    Empty,
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentFormat::Structured => write!(f, "structured"),
            ContentFormat::Markdown => write!(f, "markdown"),
            ContentFormat::Empty => write!(f, "empty"),
        }
    }
}

/// Where in the source a parse warning originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 1-based line number in markdown content.
    Line(usize),
    /// 1-based element position in a structured array.
    Element(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(n) => write!(f, "line {n}"),
            Location::Element(n) => write!(f, "question #{n}"),
        }
    }
}

/// Something the parser skipped or had to guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Result of parsing lesson content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExam {
    pub format: ContentFormat,
    pub questions: Vec<ExamQuestion>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedExam {
    fn empty() -> Self {
        Self {
            format: ContentFormat::Empty,
            questions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Sum of points across all questions.
    pub fn max_score(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

// ---------------------------------------------------------------------------
// Structured schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StructuredQuestion {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, rename = "type", deserialize_with = "blank_as_none")]
    kind: Option<QuestionType>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    options: Option<Vec<StructuredOption>>,
    #[serde(default, deserialize_with = "non_negative_points")]
    points: Option<f64>,
}

/// `null` and `""` mean "not set", like an absent field.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn non_negative_points<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let points = Option::<f64>::deserialize(deserializer)?;
    match points {
        Some(p) if !p.is_finite() || p < 0.0 => Err(serde::de::Error::custom(format!(
            "points must be a non-negative number, got {p}"
        ))),
        other => Ok(other),
    }
}

/// The editor writes ids as strings (`"1700000000000"`), older content as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredOption {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    is_correct: Option<bool>,
}

impl StructuredQuestion {
    fn into_question(self, position: usize, warnings: &mut Vec<ParseWarning>) -> ExamQuestion {
        let fallback_id = position as QuestionId;
        let id = match self.id {
            Some(RawId::Number(0)) | None => fallback_id,
            Some(RawId::Number(n)) => n,
            Some(RawId::Text(text)) => match text.trim().parse::<QuestionId>() {
                Ok(0) => fallback_id,
                Ok(n) => n,
                Err(_) => {
                    warnings.push(ParseWarning {
                        location: Location::Element(position),
                        message: format!("non-numeric id {text:?}, using {fallback_id}"),
                    });
                    fallback_id
                }
            },
        };

        let options = self.options.unwrap_or_default();
        let correct_answer = options
            .iter()
            .find(|o| o.is_correct == Some(true))
            .and_then(|o| o.text.clone())
            .unwrap_or_default();

        // Zero or missing points count as one.
        let points = match self.points {
            None => 1,
            Some(p) if p == 0.0 => 1,
            Some(p) if p.fract() != 0.0 => {
                let rounded = (p.round() as u32).max(1);
                warnings.push(ParseWarning {
                    location: Location::Element(position),
                    message: format!("fractional points {p} rounded to {rounded}"),
                });
                rounded
            }
            Some(p) => p as u32,
        };

        ExamQuestion {
            id,
            kind: self.kind.unwrap_or_default(),
            question: self.question.unwrap_or_default(),
            options: options
                .into_iter()
                .map(|o| o.text.unwrap_or_default())
                .collect(),
            points,
            correct_answer: Some(correct_answer),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse lesson content into questions, recording anything skipped.
///
/// Never fails: unreadable content yields an empty question list.
pub fn parse_exam(content: &str) -> ParsedExam {
    if content.trim().is_empty() {
        return ParsedExam::empty();
    }

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => parse_structured_items(items),
        Ok(_) => {
            tracing::debug!("content is JSON but not an array, falling back to markdown");
            parse_markdown(content)
        }
        Err(_) => parse_markdown(content),
    }
}

/// Parse lesson content into the plain question list.
pub fn parse_exam_content(content: &str) -> Vec<ExamQuestion> {
    parse_exam(content).questions
}

/// Strictly parse structured content, failing on the first invalid element.
pub fn parse_structured(content: &str) -> Result<Vec<ExamQuestion>, ContentError> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(ContentError::NotAnArray);
    };

    let mut warnings = Vec::new();
    let mut questions = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let position = index + 1;
        let raw: StructuredQuestion =
            serde_json::from_value(item).map_err(|e| ContentError::InvalidQuestion {
                position,
                message: e.to_string(),
            })?;
        questions.push(raw.into_question(position, &mut warnings));
    }
    if let Some(w) = warnings.into_iter().next() {
        return Err(ContentError::InvalidQuestion {
            position: match w.location {
                Location::Element(n) | Location::Line(n) => n,
            },
            message: w.message,
        });
    }
    Ok(questions)
}

fn parse_structured_items(items: Vec<Value>) -> ParsedExam {
    let mut warnings = Vec::new();
    let mut questions = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let position = index + 1;
        match serde_json::from_value::<StructuredQuestion>(item) {
            Ok(raw) => questions.push(raw.into_question(position, &mut warnings)),
            Err(e) => {
                tracing::warn!(position, error = %e, "skipping invalid exam question");
                warnings.push(ParseWarning {
                    location: Location::Element(position),
                    message: format!("skipped: {e}"),
                });
            }
        }
    }

    ParsedExam {
        format: ContentFormat::Structured,
        questions,
        warnings,
    }
}

fn parse_markdown(content: &str) -> ParsedExam {
    let mut warnings = Vec::new();
    let questions = markdown::parse_markdown(content, &mut warnings);
    ParsedExam {
        format: ContentFormat::Markdown,
        questions,
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A warning from question-list validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The question id (if applicable).
    pub question_id: Option<QuestionId>,
    /// Warning message.
    pub message: String,
}

/// Validate a parsed question list for authoring mistakes.
pub fn validate_questions(questions: &[ExamQuestion]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for q in questions {
        if !seen_ids.insert(q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: format!("duplicate question id: {}", q.id),
            });
        }
    }

    for q in questions {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message,
            })
        };

        if q.question.trim().is_empty() {
            warn("question text is empty".into());
        }
        if q.points == 0 {
            warn("question is worth 0 points".into());
        }

        match q.correct_answer.as_deref() {
            None => warn("no correct answer; the question can never be scored".into()),
            Some("") if q.kind == QuestionType::MultipleChoice => {
                warn("no option is marked correct".into())
            }
            Some(answer) if q.kind == QuestionType::MultipleChoice => {
                if !q.options.is_empty() && !q.options.iter().any(|o| o == answer) {
                    warn(format!(
                        "correct answer {answer:?} does not match any option exactly"
                    ));
                }
            }
            Some("") => warn("correct answer is empty; only a blank answer would match".into()),
            Some(_) => {}
        }

        if q.kind == QuestionType::MultipleChoice && q.options.is_empty() {
            warn("multiple-choice question has no options".into());
        }
    }

    warnings
}
