//! Line scanner for the markdown exam dialect.
//!
//! ```text
//! ## Part 1: Multiple Choice
//!
//! ### Question 1 (5 points)
//! What is the correct way to declare a variable in Python?
//! - x = 5
//! - int x = 5
//!
//! **Answer:** x = 5
//!
//! ## Part 2: Short Answer
//!
//! ### Question 2 (10 points)
//! Explain the difference between a list and a tuple.
//!
//! **Sample Answer:** Lists are mutable...
//! ```

use crate::model::{ExamQuestion, QuestionType};
use crate::parser::{Location, ParseWarning};

const QUESTION_MARKER: &str = "### Question";
const ANSWER_MARKER: &str = "**Answer:**";
const SAMPLE_MARKERS: [&str; 2] = ["**Sample Answer:**", "**Sample Solution:**"];

/// What the scanner does with the next ordinary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Outside any question, or collection has ended.
    Idle,
    /// Right after a question header: lines extend the prompt.
    Prompt,
    /// Collecting `- ` options of a multiple-choice question.
    Options,
}

struct PendingQuestion {
    line: usize,
    kind: QuestionType,
    prompt: Vec<String>,
    options: Vec<String>,
    points: u32,
    correct_answer: Option<String>,
}

/// Scan markdown exam content. Unrecognised lines are ignored.
pub(crate) fn parse_markdown(content: &str, warnings: &mut Vec<ParseWarning>) -> Vec<ExamQuestion> {
    let mut questions = Vec::new();
    let mut section: Option<QuestionType> = None;
    let mut current: Option<PendingQuestion> = None;
    let mut mode = Mode::Idle;

    for (index, raw_line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(heading) = line.strip_prefix("## ") {
            section = section_type(heading);
            mode = Mode::Idle;
            continue;
        }

        if let Some(header) = line.strip_prefix(QUESTION_MARKER) {
            flush(current.take(), &mut questions, warnings);

            let kind = section.unwrap_or_else(|| {
                warnings.push(ParseWarning {
                    location: Location::Line(line_no),
                    message: "question outside a typed section, treating as short-answer".into(),
                });
                QuestionType::ShortAnswer
            });
            let (points, prompt) = parse_header(header);
            current = Some(PendingQuestion {
                line: line_no,
                kind,
                prompt: if prompt.is_empty() { vec![] } else { vec![prompt] },
                options: Vec::new(),
                points: points.unwrap_or(0),
                correct_answer: None,
            });
            mode = Mode::Prompt;
            continue;
        }

        if line.starts_with("---") || line.starts_with("##") {
            mode = Mode::Idle;
            continue;
        }

        let Some(question) = current.as_mut() else {
            continue;
        };

        if let Some(answer) = line.strip_prefix(ANSWER_MARKER) {
            if mode != Mode::Idle {
                question.correct_answer = Some(answer.trim().to_string());
            }
            mode = Mode::Idle;
            continue;
        }

        if SAMPLE_MARKERS.iter().any(|m| line.starts_with(*m)) {
            mode = Mode::Idle;
            continue;
        }

        match mode {
            Mode::Prompt | Mode::Options
                if question.kind == QuestionType::MultipleChoice && line.starts_with("- ") =>
            {
                question.options.push(line[2..].trim().to_string());
                mode = Mode::Options;
            }
            Mode::Prompt => question.prompt.push(line.to_string()),
            Mode::Options | Mode::Idle => {}
        }
    }

    flush(current, &mut questions, warnings);
    questions
}

fn section_type(heading: &str) -> Option<QuestionType> {
    let heading = heading.to_lowercase();
    if heading.contains("multiple choice") {
        Some(QuestionType::MultipleChoice)
    } else if heading.contains("coding") {
        Some(QuestionType::Coding)
    } else if heading.contains("short answer") {
        Some(QuestionType::ShortAnswer)
    } else {
        None
    }
}

fn flush(
    pending: Option<PendingQuestion>,
    questions: &mut Vec<ExamQuestion>,
    warnings: &mut Vec<ParseWarning>,
) {
    let Some(pending) = pending else {
        return;
    };

    let text = pending.prompt.join("\n");
    if text.trim().is_empty() {
        warnings.push(ParseWarning {
            location: Location::Line(pending.line),
            message: "question has no text and was dropped".into(),
        });
        return;
    }

    let options = if pending.kind == QuestionType::MultipleChoice {
        pending.options
    } else {
        Vec::new()
    };

    questions.push(ExamQuestion {
        id: questions.len() as u64 + 1,
        kind: pending.kind,
        question: text,
        options,
        points: pending.points,
        correct_answer: pending.correct_answer,
    });
}

/// Split `" 1 (5 points) Some prompt"` into the point value and prompt text.
fn parse_header(header: &str) -> (Option<u32>, String) {
    let rest = header.trim_start();
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = rest.trim_start_matches([':', '.', ')']).trim();

    match find_points(rest) {
        Some((points, start, end)) => {
            let prompt = format!("{} {}", rest[..start].trim(), rest[end..].trim());
            (Some(points), prompt.trim().to_string())
        }
        None => (None, rest.to_string()),
    }
}

/// Find the first `(<N> point)` or `(<N> points)` and return `(N, start, end)`.
fn find_points(text: &str) -> Option<(u32, usize, usize)> {
    for (start, _) in text.match_indices('(') {
        let after = &text[start + 1..];
        let digits_len = after.find(|c: char| !c.is_ascii_digit()).unwrap_or(after.len());
        if digits_len == 0 {
            continue;
        }
        let Ok(points) = after[..digits_len].parse::<u32>() else {
            continue;
        };
        let tail = after[digits_len..].trim_start();
        let consumed_ws = after[digits_len..].len() - tail.len();
        for suffix in ["points)", "point)"] {
            if tail.starts_with(suffix) {
                let end = start + 1 + digits_len + consumed_ws + suffix.len();
                return Some((points, start, end));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (Vec<ExamQuestion>, Vec<ParseWarning>) {
        let mut warnings = Vec::new();
        let questions = parse_markdown(content, &mut warnings);
        (questions, warnings)
    }

    const SEEDED_EXAM: &str = r#"# Programming Fundamentals Final Exam

## Exam Instructions

**Duration:** 120 minutes
**Total Points:** 100

---

## Part 1: Multiple Choice (40 points)

### Question 1 (5 points)
What is the correct way to declare a variable in Python?
- var x = 5
- int x = 5
- x = 5

**Answer:** x = 5

### Question 2 (5 points)
Which data type is used to store text?
- integer
- string

**Answer:** string

---

## Part 2: Short Answer (30 points)

### Question 3 (10 points)
Explain the difference between a list and a tuple.

**Sample Answer:** Lists are mutable while tuples are not.
- this bullet belongs to the sample answer

## Part 3: Coding (30 points)

### Question 4 (30 points)
Write a function that reverses a string.

**Sample Solution:**
def reverse(s):
    return s[::-1]
"#;

    #[test]
    fn seeded_exam_structure() {
        let (questions, warnings) = parse(SEEDED_EXAM);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(questions.len(), 4);

        let q1 = &questions[0];
        assert_eq!(q1.id, 1);
        assert_eq!(q1.kind, QuestionType::MultipleChoice);
        assert_eq!(q1.points, 5);
        assert_eq!(
            q1.question,
            "What is the correct way to declare a variable in Python?"
        );
        assert_eq!(q1.options, vec!["var x = 5", "int x = 5", "x = 5"]);
        assert_eq!(q1.correct_answer.as_deref(), Some("x = 5"));

        let q3 = &questions[2];
        assert_eq!(q3.kind, QuestionType::ShortAnswer);
        assert!(q3.options.is_empty());
        assert!(q3.correct_answer.is_none());
        assert!(!q3.question.contains("mutable"));

        let q4 = &questions[3];
        assert_eq!(q4.kind, QuestionType::Coding);
        assert_eq!(q4.points, 30);
        assert!(!q4.question.contains("reverse(s)"));
    }

    #[test]
    fn header_prompt_and_points() {
        let (questions, _) = parse(
            "## Multiple Choice\n### Question 1 What is 2+2? (2 points)\n- 3\n- 4\n**Answer:** 4\n",
        );
        assert_eq!(questions[0].question, "What is 2+2?");
        assert_eq!(questions[0].points, 2);
        assert_eq!(questions[0].correct_answer.as_deref(), Some("4"));
    }

    #[test]
    fn singular_point_and_missing_points() {
        assert_eq!(parse_header(" 3 (1 point) Name it").0, Some(1));
        assert_eq!(parse_header(" 3 (1 point) Name it").1, "Name it");
        assert_eq!(parse_header(" 4: Plain"), (None, "Plain".to_string()));
        assert_eq!(parse_header(" 5 (see below)"), (None, "(see below)".to_string()));
    }

    #[test]
    fn empty_question_is_dropped_and_ids_stay_sequential() {
        let (questions, warnings) = parse(
            "## Short Answer\n### Question 1 (2 points)\n### Question 2 (3 points)\nWhy?\n",
        );
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[0].points, 3);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location, Location::Line(2));
    }

    #[test]
    fn options_stop_after_answer_and_terminators() {
        let (questions, _) = parse(
            "## Multiple Choice\n### Question 1\nPick one\n- a\n- b\n**Answer:** a\n- c\n---\n- d\n",
        );
        assert_eq!(questions[0].options, vec!["a", "b"]);
    }

    #[test]
    fn sample_marker_ends_collection_without_answer() {
        let (questions, _) = parse(
            "## Multiple Choice\n### Question 1\nPick\n- a\n**Sample Answer:** a\n**Answer:** a\n",
        );
        assert_eq!(questions[0].options, vec!["a"]);
        assert!(questions[0].correct_answer.is_none());
    }

    #[test]
    fn short_answer_reference_is_recorded() {
        let (questions, _) =
            parse("## Short Answer\n### Question 1 (1 point)\nCapital of France?\n**Answer:** Paris\n");
        assert_eq!(questions[0].correct_answer.as_deref(), Some("Paris"));
        assert!(questions[0].options.is_empty());
    }

    #[test]
    fn untyped_section_defaults_with_warning() {
        let (questions, warnings) = parse("### Question 1\nWhat?\n- not an option\n");
        assert_eq!(questions[0].kind, QuestionType::ShortAnswer);
        assert_eq!(questions[0].question, "What?\n- not an option");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn no_markers_yields_nothing() {
        let (questions, warnings) = parse("# Title\n\nSome prose.\n\n## Section\n- bullet\n");
        assert!(questions.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn reparse_is_identical() {
        let (first, _) = parse(SEEDED_EXAM);
        let (second, _) = parse(SEEDED_EXAM);
        assert_eq!(first, second);
    }
}
