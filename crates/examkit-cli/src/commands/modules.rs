//! The `examkit modules` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::model::{LessonType, Module};

pub async fn execute(module_id: Option<u64>, config_path: Option<PathBuf>) -> Result<()> {
    let (_, backend) = super::connect(config_path)?;

    if let Some(id) = module_id {
        let module = backend.module_detail(id).await?;
        println!("{} ({}% complete)", module.title, module.progress);
        if let Some(description) = &module.description {
            println!("{description}");
        }
        println!("{}", lessons_table(&module));
        return Ok(());
    }

    let modules = backend.modules_overview().await?;
    if modules.is_empty() {
        println!("No modules available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Module", "Lessons", "Exams", "Progress", "Deadline"]);

    for module in &modules {
        table.add_row(vec![
            Cell::new(module.id),
            Cell::new(&module.title),
            Cell::new(module.lessons.len()),
            Cell::new(module.exam_count()),
            Cell::new(format!("{}%", module.progress)),
            Cell::new(
                module
                    .deadline
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Lessons in course order, with the command that opens each exam.
fn lessons_table(module: &Module) -> Table {
    let mut lessons: Vec<_> = module.lessons.iter().collect();
    lessons.sort_by_key(|l| l.order);

    let mut table = Table::new();
    table.set_header(vec!["Id", "Lesson", "Type", "Take with"]);
    for lesson in lessons {
        let take = match lesson.lesson_type {
            LessonType::Exam => format!("examkit take --module {} --lesson {}", module.id, lesson.id),
            LessonType::Lesson => "-".into(),
        };
        table.add_row(vec![
            Cell::new(lesson.id),
            Cell::new(&lesson.title),
            Cell::new(lesson.lesson_type),
            Cell::new(take),
        ]);
    }
    table
}
