//! The `examkit history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::model::ExamHistoryEntry;
use examkit_core::review::review_attempt;
use examkit_core::traits::ExamBackend;

pub async fn execute(review: Option<u64>, config_path: Option<PathBuf>) -> Result<()> {
    let (_, backend) = super::connect(config_path)?;
    let history = backend.exam_history().await?;

    match review {
        Some(id) => {
            let entry = history
                .iter()
                .find(|e| e.id == id)
                .ok_or_else(|| anyhow::anyhow!("no exam attempt with id {id}"))?;
            print_review(entry);
        }
        None if history.is_empty() => println!("No exams taken yet."),
        None => print_history(&history),
    }

    Ok(())
}

fn format_score(score: Option<u32>, max_score: Option<u32>) -> String {
    match (score, max_score) {
        (Some(s), Some(m)) => format!("{s}/{m}"),
        _ => "-".into(),
    }
}

fn print_history(history: &[ExamHistoryEntry]) {
    let mut table = Table::new();
    table.set_header(vec!["Id", "Exam", "Module", "Score", "Percentage", "Finished"]);

    for entry in history {
        let review = review_attempt(entry);
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(&entry.lesson_title),
            Cell::new(&entry.module_title),
            Cell::new(format_score(entry.score, entry.max_score)),
            Cell::new(
                review
                    .percentage()
                    .map(|p| format!("{p:.1}%"))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(entry.date_finished.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!("{table}");
}

fn print_review(entry: &ExamHistoryEntry) {
    let review = review_attempt(entry);
    println!("{} ({})", review.lesson_title, review.module_title);

    let mut table = Table::new();
    table.set_header(vec!["Question", "Result", "Your answer", "Correct answer"]);
    for answer in &review.answers {
        table.add_row(vec![
            Cell::new(answer.question_id),
            Cell::new(if answer.correct { "correct" } else { "wrong" }),
            Cell::new(answer.given.as_deref().unwrap_or("-")),
            Cell::new(answer.expected.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");

    println!(
        "Score: {}, {} of {} correct{}",
        format_score(review.score, review.max_score),
        review.correct_count(),
        review.answers.len(),
        review
            .percentage()
            .map(|p| format!(" ({p:.1}%)"))
            .unwrap_or_default()
    );
}
