//! The `examkit init` command.

use std::path::Path;

use anyhow::Result;

use examkit_core::authoring::ExamDraft;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("examkit.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("exam-content")?;
    write_if_missing(Path::new("exam-content/sample-exam.md"), SAMPLE_MARKDOWN_EXAM)?;
    write_if_missing(
        Path::new("exam-content/sample-exam.json"),
        &sample_structured_exam()?,
    )?;

    println!("\nNext steps:");
    println!("  1. Edit examkit.toml to point at your LMS");
    println!("  2. Run: examkit validate --content exam-content/sample-exam.json");
    println!("  3. Run: examkit login --username <you>");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

fn sample_structured_exam() -> Result<String> {
    let draft = ExamDraft::new()
        .multiple_choice(
            "Which keyword declares an immutable binding in Rust?",
            2,
            [("let", true), ("mut", false), ("var", false)],
        )
        .multiple_choice(
            "What does `Vec::len` return?",
            2,
            [("i32", false), ("usize", true), ("u8", false)],
        )
        .short_answer("Explain the difference between `String` and `&str`.", 5);
    Ok(draft.to_content()?)
}

const SAMPLE_CONFIG: &str = r#"# examkit configuration

api_base_url = "http://localhost:8000/api"
timeout_secs = 30

# Submission delivery retries
submit_max_attempts = 3
submit_retry_delay_ms = 1000

# Where login tokens are kept (default: ~/.config/examkit/session.json)
# token_store = "${HOME}/.config/examkit/session.json"
"#;

const SAMPLE_MARKDOWN_EXAM: &str = r#"# Sample Exam

## Part 1: Multiple Choice

### Question 1 (5 points)
What is the correct way to declare a variable in Python?
- var x = 5
- int x = 5
- x = 5

**Answer:** x = 5

---

## Part 2: Short Answer

### Question 2 (10 points)
Explain the difference between a list and a tuple.

**Sample Answer:** Lists are mutable, tuples are not.
"#;
