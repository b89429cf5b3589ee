//! The `examkit take` command.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use anyhow::Result;
use tokio::sync::mpsc;

use examkit_core::controller::{DeliveryStatus, ExamCommand, ExamController, ExamOutcome, SessionObserver};
use examkit_core::error::{LoadError, SessionError};
use examkit_core::evaluator::check_answers;
use examkit_core::model::{ExamQuestion, QuestionId, QuestionType};
use examkit_core::session::{format_time, Submission, SubmitReason, Urgency};

/// Console observer for a running exam.
struct ConsoleObserver {
    questions: Vec<ExamQuestion>,
    duration_secs: AtomicU32,
    /// Last urgency announced, as `Urgency as u8`.
    urgency: AtomicU8,
}

impl ConsoleObserver {
    fn new(questions: Vec<ExamQuestion>) -> Self {
        Self {
            questions,
            duration_secs: AtomicU32::new(0),
            urgency: AtomicU8::new(Urgency::Normal as u8),
        }
    }
}

impl SessionObserver for ConsoleObserver {
    fn on_start(&self, duration_secs: u32) {
        self.duration_secs.store(duration_secs, Ordering::Relaxed);
        println!("Exam started. Time remaining: {}\n", format_time(duration_secs));
        for (index, q) in self.questions.iter().enumerate() {
            println!("Question {} (id {}, {} points, {})", index + 1, q.id, q.points, q.kind);
            println!("{}", q.question);
            for (n, option) in q.options.iter().enumerate() {
                println!("  #{} {option}", n + 1);
            }
            println!();
        }
        println!("Answer with `<id> <answer>` (`<id> #<n>` picks an option). Type `submit` when done or `exit` to leave.");
    }

    fn on_tick(&self, remaining_secs: u32) {
        let duration = self.duration_secs.load(Ordering::Relaxed);
        let urgency = Urgency::from_remaining(remaining_secs, duration);
        let previous = self.urgency.swap(urgency as u8, Ordering::Relaxed);

        if urgency as u8 != previous {
            let label = match urgency {
                Urgency::Normal => "",
                Urgency::Warning => "less than half the time left",
                Urgency::Critical => "time is almost up",
            };
            println!("[{}] {label}", format_time(remaining_secs));
        } else if remaining_secs > 0 && remaining_secs % 60 == 0 {
            println!("[{}] remaining", format_time(remaining_secs));
        }
    }

    fn on_answer(&self, question_id: QuestionId) {
        println!("Saved answer for question {question_id}.");
    }

    fn on_rejected(&self, command: &ExamCommand, error: &SessionError) {
        match (command, error) {
            (ExamCommand::Start, SessionError::AlreadyStarted) => {}
            (_, SessionError::NotRunning) => println!("Press Enter to start the exam first."),
            (_, e) => println!("{e}"),
        }
    }

    fn on_exit_requested(&self) {
        println!("Leave the exam? Your answers will NOT be submitted. (yes/no)");
    }

    fn on_submitted(&self, submission: &Submission) {
        match submission.reason {
            SubmitReason::TimeExpired => println!("\nTime is up. Your answers were submitted automatically."),
            SubmitReason::Manual => println!("\nExam submitted."),
        }
        println!("Time used: {}", format_time(submission.elapsed_secs));
    }

    fn on_delivery(&self, status: &DeliveryStatus) {
        match status {
            DeliveryStatus::Delivered(receipt) => println!(
                "{} Score: {}/{} ({:.1}%)",
                receipt.message, receipt.score, receipt.max_score, receipt.percentage
            ),
            DeliveryStatus::Failed { attempts, error } => {
                println!("Could not deliver your answers after {attempts} attempt(s): {error}")
            }
        }
    }
}

/// Turn one input line into a command. `None` for lines that mean nothing.
fn parse_line(line: &str, questions: &[ExamQuestion]) -> Option<ExamCommand> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" | "start" => return Some(ExamCommand::Start),
        "submit" => return Some(ExamCommand::Submit),
        "exit" | "quit" => return Some(ExamCommand::RequestExit),
        "yes" | "y" => return Some(ExamCommand::ConfirmExit),
        "no" | "n" => return Some(ExamCommand::CancelExit),
        _ => {}
    }

    let (id, answer) = line.split_once(char::is_whitespace)?;
    let question_id: QuestionId = id.parse().ok()?;
    let answer = answer.trim();

    let question = questions.iter().find(|q| q.id == question_id);
    let answer = match (question, answer.strip_prefix('#')) {
        (Some(q), Some(n)) if q.kind == QuestionType::MultipleChoice => {
            let index = n.parse::<usize>().ok()?.checked_sub(1)?;
            q.options.get(index)?.clone()
        }
        _ => answer.to_string(),
    };

    Some(ExamCommand::Answer {
        question_id,
        answer,
    })
}

pub async fn execute(module_id: u64, lesson_id: u64, config_path: Option<PathBuf>) -> Result<()> {
    let (config, backend) = super::connect(config_path)?;

    let controller = match ExamController::load(backend, module_id, lesson_id).await {
        Ok(controller) => controller.with_policy(config.submit_policy()),
        Err(e @ LoadError::NotAnExam { .. }) => {
            anyhow::bail!("{e}. Back to module {module_id} with `examkit modules`.")
        }
        Err(e) if e.is_not_found() => {
            anyhow::bail!("exam {lesson_id} not found in module {module_id}")
        }
        Err(e) => return Err(e.into()),
    };

    let questions = controller.questions().to_vec();
    println!("{} ({})", controller.lesson().title, controller.module().title);
    println!(
        "{} questions, {} minutes.",
        questions.len(),
        controller.lesson().duration_minutes
    );
    for w in controller.parse_warnings() {
        println!("  note: {w}");
    }
    println!("The timer starts when you press Enter. Answers are not saved if you leave.");

    let (tx, rx) = mpsc::channel(32);
    let reader_questions = questions.clone();
    // Blocking stdin reads cannot be cancelled, so they live on a detached thread.
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let Some(command) = parse_line(&line, &reader_questions) else {
                println!("Unrecognised input: {line}");
                continue;
            };
            if tx.blocking_send(command).is_err() {
                break;
            }
        }
    });

    let observer = ConsoleObserver::new(questions.clone());
    let outcome = controller.run(rx, &observer).await;

    match outcome {
        ExamOutcome::Submitted {
            submission,
            delivery,
        } => {
            let local = check_answers(&questions, &submission.answers);
            tracing::debug!(score = local.score, max_score = local.max_score, "local score");
            if let DeliveryStatus::Failed { attempts, .. } = delivery {
                anyhow::bail!("answers for exam {lesson_id} were not delivered after {attempts} attempt(s)");
            }
        }
        ExamOutcome::Exited { answered, .. } => {
            println!("Left the exam without submitting; {answered} answer(s) discarded.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<ExamQuestion> {
        vec![ExamQuestion {
            id: 4,
            kind: QuestionType::MultipleChoice,
            question: "Pick".into(),
            options: vec!["red".into(), "blue".into()],
            points: 1,
            correct_answer: Some("blue".into()),
        }]
    }

    #[test]
    fn keywords() {
        let qs = questions();
        assert_eq!(parse_line("", &qs), Some(ExamCommand::Start));
        assert_eq!(parse_line(" Submit ", &qs), Some(ExamCommand::Submit));
        assert_eq!(parse_line("exit", &qs), Some(ExamCommand::RequestExit));
        assert_eq!(parse_line("yes", &qs), Some(ExamCommand::ConfirmExit));
        assert_eq!(parse_line("no", &qs), Some(ExamCommand::CancelExit));
    }

    #[test]
    fn answers_and_option_shortcuts() {
        let qs = questions();
        assert_eq!(
            parse_line("4 #2", &qs),
            Some(ExamCommand::Answer {
                question_id: 4,
                answer: "blue".into()
            })
        );
        assert_eq!(
            parse_line("9 free text answer", &qs),
            Some(ExamCommand::Answer {
                question_id: 9,
                answer: "free text answer".into()
            })
        );
        assert_eq!(parse_line("4 #3", &qs), None);
        assert_eq!(parse_line("hello there", &qs), None);
    }
}
