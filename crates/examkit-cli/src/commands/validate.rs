//! The `examkit validate` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::model::ExamQuestion;
use examkit_core::parser::{parse_exam, parse_structured, validate_questions};

pub fn execute(content_path: PathBuf, strict: bool) -> Result<()> {
    let content = super::read_file(&content_path)?;

    let questions = if strict {
        let questions = parse_structured(&content)?;
        println!("Structured exam: {} questions", questions.len());
        questions
    } else {
        let parsed = parse_exam(&content);
        println!(
            "{} exam: {} questions, {} points",
            capitalize(&parsed.format.to_string()),
            parsed.questions.len(),
            parsed.max_score()
        );
        for w in &parsed.warnings {
            println!("  PARSE WARNING: {w}");
        }
        if !parsed.warnings.is_empty() {
            println!("{} question(s) could not be read.", parsed.warnings.len());
        }
        parsed.questions
    };

    if !questions.is_empty() {
        print_questions(&questions);
    }

    let warnings = validate_questions(&questions);
    for w in &warnings {
        let prefix = w
            .question_id
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if questions.is_empty() {
        println!("No questions found.");
    } else if warnings.is_empty() {
        println!("Exam content valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}

fn print_questions(questions: &[ExamQuestion]) {
    let mut table = Table::new();
    table.set_header(vec!["Id", "Type", "Points", "Options", "Question"]);

    for q in questions {
        let first_line = q.question.lines().next().unwrap_or_default();
        table.add_row(vec![
            Cell::new(q.id),
            Cell::new(q.kind),
            Cell::new(q.points),
            Cell::new(q.options.len()),
            Cell::new(first_line),
        ]);
    }

    println!("{table}");
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
