//! The `examkit grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Serialize;

use examkit_core::evaluator::{check_answers, ScoreResult};
use examkit_core::model::{AnswerMap, ExamQuestion};
use examkit_core::parser::parse_exam;

#[derive(Serialize)]
struct GradeReport<'a> {
    #[serde(flatten)]
    result: &'a ScoreResult,
    percentage: f64,
    correct: usize,
    questions: usize,
}

pub fn execute(content_path: PathBuf, answers_path: PathBuf, format: String) -> Result<()> {
    let parsed = parse_exam(&super::read_file(&content_path)?);
    for w in &parsed.warnings {
        tracing::warn!(location = %w.location, "{}", w.message);
    }

    let answers: AnswerMap = serde_json::from_str(&super::read_file(&answers_path)?)
        .with_context(|| format!("failed to parse answers: {}", answers_path.display()))?;

    let result = check_answers(&parsed.questions, &answers);

    match format.as_str() {
        "json" => {
            let report = GradeReport {
                result: &result,
                percentage: result.percentage(),
                correct: result.correct_count(),
                questions: parsed.questions.len(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "text" => print_text(&parsed.questions, &answers, &result),
        other => anyhow::bail!("unknown format: {other} (expected text or json)"),
    }

    Ok(())
}

fn print_text(questions: &[ExamQuestion], answers: &AnswerMap, result: &ScoreResult) {
    let mut table = Table::new();
    table.set_header(vec!["Id", "Result", "Points", "Answer", "Expected"]);

    for q in questions {
        let Some(verdict) = result.results.get(&q.id) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(q.id),
            Cell::new(if verdict.correct { "correct" } else { "wrong" }),
            Cell::new(if verdict.correct { q.points } else { 0 }),
            Cell::new(answers.get(&q.id).map(String::as_str).unwrap_or("-")),
            Cell::new(verdict.correct_answer.as_deref().unwrap_or("(none)")),
        ]);
    }

    println!("{table}");
    println!(
        "Score: {}/{} ({:.1}%), {} of {} correct",
        result.score,
        result.max_score,
        result.percentage(),
        result.correct_count(),
        questions.len()
    );
}
