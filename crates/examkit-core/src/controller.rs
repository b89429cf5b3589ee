//! Exam session controller.
//!
//! Loads an exam lesson, then drives an [`ExamSession`] from a stream of
//! student commands and a one-second countdown. Ticks and commands are
//! serialized through one `select!` loop, so the session needs no locking.
//! Manual submission and expiry both go through [`ExamSession::submit`],
//! which only succeeds once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};

use crate::error::{BackendError, LoadError, SessionError};
use crate::model::{ExamQuestion, Lesson, LessonDetail, LessonType, ModuleRef, QuestionId, SubmitReceipt};
use crate::parser::{parse_exam, ParseWarning, ParsedExam};
use crate::session::{ExamSession, Phase, Submission, SubmitReason, TickOutcome};
use crate::traits::ExamBackend;

/// Countdown resolution.
pub const TICK: Duration = Duration::from_millis(1000);

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// How hard to try delivering a submission to the backend.
#[derive(Debug, Clone)]
pub struct SubmitPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each failure.
    pub retry_delay: Duration,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Something the student did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamCommand {
    Start,
    Answer {
        question_id: QuestionId,
        answer: String,
    },
    Submit,
    /// Ask to leave; needs a [`ExamCommand::ConfirmExit`] to take effect.
    RequestExit,
    ConfirmExit,
    CancelExit,
}

/// Whether the backend accepted the submitted answers.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryStatus {
    Delivered(SubmitReceipt),
    Failed { attempts: u32, error: String },
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered(_))
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExamOutcome {
    /// The exam was submitted, manually or by the timer. The local transition
    /// stands even when delivery failed.
    Submitted {
        submission: Submission,
        delivery: DeliveryStatus,
    },
    /// The student left without submitting; nothing was sent.
    Exited { phase: Phase, answered: usize },
}

/// Session progress callbacks.
pub trait SessionObserver: Send + Sync {
    fn on_start(&self, duration_secs: u32);
    fn on_tick(&self, remaining_secs: u32);
    fn on_answer(&self, question_id: QuestionId);
    fn on_rejected(&self, command: &ExamCommand, error: &SessionError);
    fn on_exit_requested(&self);
    fn on_submitted(&self, submission: &Submission);
    fn on_delivery(&self, status: &DeliveryStatus);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_start(&self, _: u32) {}
    fn on_tick(&self, _: u32) {}
    fn on_answer(&self, _: QuestionId) {}
    fn on_rejected(&self, _: &ExamCommand, _: &SessionError) {}
    fn on_exit_requested(&self) {}
    fn on_submitted(&self, _: &Submission) {}
    fn on_delivery(&self, _: &DeliveryStatus) {}
}

/// A loaded exam ready to be taken.
pub struct ExamController {
    backend: Arc<dyn ExamBackend>,
    detail: LessonDetail,
    parsed: ParsedExam,
    session: ExamSession,
    policy: SubmitPolicy,
}

impl ExamController {
    /// Fetch and parse an exam lesson.
    ///
    /// Fails if the lesson cannot be fetched or is not an exam; the caller
    /// should offer navigation back to the module rather than retrying.
    pub async fn load(
        backend: Arc<dyn ExamBackend>,
        module_id: u64,
        lesson_id: u64,
    ) -> Result<Self, LoadError> {
        let detail = backend
            .load_lesson(module_id, lesson_id)
            .await
            .map_err(LoadError::Fetch)?;

        if detail.lesson.lesson_type != LessonType::Exam {
            return Err(LoadError::NotAnExam { lesson_id });
        }

        let parsed = parse_exam(&detail.lesson.content);
        if !parsed.warnings.is_empty() {
            tracing::warn!(
                lesson_id,
                warnings = parsed.warnings.len(),
                "exam content parsed with warnings"
            );
        }
        tracing::info!(
            lesson_id,
            format = %parsed.format,
            questions = parsed.questions.len(),
            duration_minutes = detail.lesson.duration_minutes,
            "exam loaded"
        );

        let session = ExamSession::new(detail.lesson.duration_minutes);
        Ok(Self {
            backend,
            detail,
            parsed,
            session,
            policy: SubmitPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: SubmitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn lesson(&self) -> &Lesson {
        &self.detail.lesson
    }

    pub fn module(&self) -> &ModuleRef {
        &self.detail.module
    }

    pub fn questions(&self) -> &[ExamQuestion] {
        &self.parsed.questions
    }

    pub fn parse_warnings(&self) -> &[ParseWarning] {
        &self.parsed.warnings
    }

    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    /// Drive the session until it is submitted or the student leaves.
    ///
    /// Closing the command channel counts as leaving. The countdown only
    /// exists while the session is running and is dropped on every way out.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ExamCommand>,
        observer: &dyn SessionObserver,
    ) -> ExamOutcome {
        let mut ticker: Option<Interval> = None;
        let mut exit_armed = false;

        let submission = loop {
            let next = match ticker.as_mut() {
                Some(countdown) => tokio::select! {
                    _ = countdown.tick() => {
                        match self.session.tick() {
                            TickOutcome::Running { remaining_secs } => {
                                observer.on_tick(remaining_secs);
                                continue;
                            }
                            TickOutcome::Expired(submission) => {
                                tracing::info!("exam time expired");
                                observer.on_tick(0);
                                break submission;
                            }
                            TickOutcome::Idle => continue,
                        }
                    }
                    command = commands.recv() => command,
                },
                None => commands.recv().await,
            };

            let Some(command) = next else {
                tracing::debug!("command channel closed, leaving exam");
                return self.exited();
            };
            tracing::debug!(?command, phase = %self.session.phase(), "exam command");

            // An exit request only covers the very next command.
            let exit_pending = std::mem::take(&mut exit_armed);
            match command {
                ExamCommand::Start => match self.session.start() {
                    Ok(()) => {
                        ticker = Some(interval_at(Instant::now() + TICK, TICK));
                        observer.on_start(self.session.duration_secs());
                    }
                    Err(e) => observer.on_rejected(&ExamCommand::Start, &e),
                },
                ExamCommand::Answer {
                    question_id,
                    answer,
                } => match self.session.set_answer(question_id, answer.clone()) {
                    Ok(()) => observer.on_answer(question_id),
                    Err(e) => observer.on_rejected(
                        &ExamCommand::Answer {
                            question_id,
                            answer,
                        },
                        &e,
                    ),
                },
                ExamCommand::Submit => match self.session.submit(SubmitReason::Manual) {
                    Some(submission) => break submission,
                    None => observer.on_rejected(&ExamCommand::Submit, &SessionError::NotRunning),
                },
                ExamCommand::RequestExit => {
                    exit_armed = true;
                    observer.on_exit_requested();
                }
                ExamCommand::ConfirmExit if exit_pending => {
                    tracing::info!(
                        answered = self.session.answers().len(),
                        "student left the exam without submitting"
                    );
                    return self.exited();
                }
                ExamCommand::ConfirmExit => {
                    tracing::debug!("exit confirmation without a pending request, ignoring");
                }
                ExamCommand::CancelExit => {}
            }
        };
        drop(ticker);

        tracing::info!(
            reason = %submission.reason,
            elapsed_secs = submission.elapsed_secs,
            answered = submission.answers.len(),
            "exam submitted"
        );
        observer.on_submitted(&submission);

        let delivery = self.deliver(&submission).await;
        observer.on_delivery(&delivery);

        ExamOutcome::Submitted {
            submission,
            delivery,
        }
    }

    fn exited(&self) -> ExamOutcome {
        ExamOutcome::Exited {
            phase: self.session.phase(),
            answered: self.session.answers().len(),
        }
    }

    /// Send the answers, retrying transient failures.
    async fn deliver(&self, submission: &Submission) -> DeliveryStatus {
        let lesson_id = self.detail.lesson.id;
        let max_attempts = self.policy.max_attempts.max(1);
        let mut retry_delay = self.policy.retry_delay;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self
                .backend
                .submit_answers(lesson_id, &submission.answers)
                .await
            {
                Ok(receipt) => {
                    tracing::info!(lesson_id, attempts, score = receipt.score, "answers delivered");
                    return DeliveryStatus::Delivered(receipt);
                }
                Err(e) => {
                    let permanent = e
                        .downcast_ref::<BackendError>()
                        .is_some_and(BackendError::is_permanent);
                    if permanent || attempts >= max_attempts {
                        tracing::error!(lesson_id, attempts, "exam submission failed: {e:#}");
                        return DeliveryStatus::Failed {
                            attempts,
                            error: format!("{e:#}"),
                        };
                    }
                    tracing::warn!(lesson_id, attempts, "submission failed, retrying: {e:#}");
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::evaluator::check_answers;
    use crate::model::{AnswerMap, ExamHistoryEntry};

    const THREE_QUESTIONS: &str = r#"[
        {"question": "2+2?", "options": [{"text": "3"}, {"text": "4", "isCorrect": true}]},
        {"question": "Capital of France?", "options": [{"text": "Paris", "isCorrect": true}, {"text": "Rome"}]},
        {"question": "Sky colour?", "options": [{"text": "blue", "isCorrect": true}, {"text": "green"}]}
    ]"#;

    struct FakeBackend {
        lesson_type: LessonType,
        duration_minutes: u32,
        failures_before_success: AtomicU32,
        permanent_failure: bool,
        submissions: Mutex<Vec<AnswerMap>>,
    }

    impl FakeBackend {
        fn exam(duration_minutes: u32) -> Self {
            Self {
                lesson_type: LessonType::Exam,
                duration_minutes,
                failures_before_success: AtomicU32::new(0),
                permanent_failure: false,
                submissions: Mutex::new(Vec::new()),
            }
        }

        fn submit_calls(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExamBackend for FakeBackend {
        async fn load_lesson(&self, module_id: u64, lesson_id: u64) -> anyhow::Result<LessonDetail> {
            if lesson_id == 404 {
                return Err(BackendError::NotFound(format!("lesson {lesson_id}")).into());
            }
            Ok(LessonDetail {
                lesson: Lesson {
                    id: lesson_id,
                    title: "Final Exam".into(),
                    content: THREE_QUESTIONS.into(),
                    lesson_type: self.lesson_type,
                    duration_minutes: self.duration_minutes,
                },
                module: ModuleRef {
                    id: module_id,
                    title: "Intro".into(),
                },
            })
        }

        async fn submit_answers(
            &self,
            _lesson_id: u64,
            answers: &AnswerMap,
        ) -> anyhow::Result<SubmitReceipt> {
            self.submissions.lock().unwrap().push(answers.clone());
            if self.permanent_failure {
                return Err(BackendError::AuthenticationFailed("expired".into()).into());
            }
            let remaining = self.failures_before_success.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_before_success
                    .store(remaining - 1, Ordering::SeqCst);
                return Err(BackendError::Api {
                    status: 502,
                    message: "bad gateway".into(),
                }
                .into());
            }
            Ok(SubmitReceipt {
                message: "Exam answers submitted successfully".into(),
                score: 2,
                max_score: 3,
                percentage: 66.7,
            })
        }

        async fn exam_history(&self) -> anyhow::Result<Vec<ExamHistoryEntry>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct Recorder {
        ticks: Mutex<Vec<u32>>,
        rejected: AtomicU32,
        exit_requests: AtomicU32,
    }

    impl SessionObserver for Recorder {
        fn on_start(&self, _: u32) {}
        fn on_tick(&self, remaining_secs: u32) {
            self.ticks.lock().unwrap().push(remaining_secs);
        }
        fn on_answer(&self, _: QuestionId) {}
        fn on_rejected(&self, _: &ExamCommand, _: &SessionError) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
        fn on_exit_requested(&self) {
            self.exit_requests.fetch_add(1, Ordering::SeqCst);
        }
        fn on_submitted(&self, _: &Submission) {}
        fn on_delivery(&self, _: &DeliveryStatus) {}
    }

    fn answer(question_id: QuestionId, answer: &str) -> ExamCommand {
        ExamCommand::Answer {
            question_id,
            answer: answer.into(),
        }
    }

    #[tokio::test]
    async fn load_rejects_regular_lessons() {
        let backend = Arc::new(FakeBackend {
            lesson_type: LessonType::Lesson,
            ..FakeBackend::exam(1)
        });
        let err = ExamController::load(backend, 1, 2).await.err().unwrap();
        assert!(matches!(err, LoadError::NotAnExam { lesson_id: 2 }));
    }

    #[tokio::test]
    async fn load_surfaces_missing_lesson() {
        let backend = Arc::new(FakeBackend::exam(1));
        let err = ExamController::load(backend, 1, 404).await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_end_to_end() {
        let backend = Arc::new(FakeBackend::exam(1));
        let controller = ExamController::load(backend.clone(), 1, 7).await.unwrap();
        let questions = controller.questions().to_vec();
        assert_eq!(questions.len(), 3);
        assert_eq!(controller.session().remaining_secs(), 60);

        let (tx, rx) = mpsc::channel(16);
        let recorder = Recorder::default();

        let (outcome, ()) = tokio::join!(controller.run(rx, &recorder), async {
            tx.send(ExamCommand::Start).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10_500)).await;
            tx.send(answer(1, "4")).await.unwrap();
            tx.send(answer(2, "Paris")).await.unwrap();
            tx.send(answer(3, "green")).await.unwrap();
            tx.send(ExamCommand::Submit).await.unwrap();
            tx.send(ExamCommand::Submit).await.ok();
        });

        let ExamOutcome::Submitted {
            submission,
            delivery,
        } = outcome
        else {
            panic!("expected submission, got {outcome:?}");
        };
        assert_eq!(submission.reason, SubmitReason::Manual);
        assert_eq!(submission.elapsed_secs, 10);
        assert!(delivery.is_delivered());

        let score = check_answers(&questions, &submission.answers);
        assert_eq!(score.score, 2);
        assert_eq!(score.max_score, 3);

        let ticks = recorder.ticks.lock().unwrap().clone();
        assert_eq!(ticks, (50..60).rev().collect::<Vec<_>>());
        assert_eq!(backend.submit_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_expiry_submits_once() {
        let backend = Arc::new(FakeBackend::exam(1));
        let controller = ExamController::load(backend.clone(), 1, 7).await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        let recorder = Recorder::default();

        tx.send(ExamCommand::Start).await.unwrap();
        tx.send(answer(1, "4")).await.unwrap();
        let outcome = controller.run(rx, &recorder).await;

        match outcome {
            ExamOutcome::Submitted { submission, .. } => {
                assert_eq!(submission.reason, SubmitReason::TimeExpired);
                assert_eq!(submission.elapsed_secs, 60);
                assert_eq!(submission.answers.len(), 1);
            }
            other => panic!("expected expiry, got {other:?}"),
        }

        let ticks = recorder.ticks.lock().unwrap().clone();
        assert_eq!(ticks.len(), 60);
        assert!(ticks.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(ticks.last(), Some(&0));
        assert_eq!(backend.submit_calls(), 1);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_before_start_are_rejected() {
        let backend = Arc::new(FakeBackend::exam(1));
        let controller = ExamController::load(backend.clone(), 1, 7).await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        let recorder = Recorder::default();

        tx.send(answer(1, "4")).await.unwrap();
        tx.send(ExamCommand::Submit).await.unwrap();
        drop(tx);

        let outcome = controller.run(rx, &recorder).await;
        assert_eq!(
            outcome,
            ExamOutcome::Exited {
                phase: Phase::NotStarted,
                answered: 0
            }
        );
        assert_eq!(recorder.rejected.load(Ordering::SeqCst), 2);
        assert_eq!(backend.submit_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exit_requires_confirmation_and_never_submits() {
        let backend = Arc::new(FakeBackend::exam(1));
        let controller = ExamController::load(backend.clone(), 1, 7).await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        let recorder = Recorder::default();

        let (outcome, ()) = tokio::join!(controller.run(rx, &recorder), async {
            tx.send(ExamCommand::Start).await.unwrap();
            tx.send(answer(1, "4")).await.unwrap();
            tx.send(ExamCommand::ConfirmExit).await.unwrap();
            tx.send(ExamCommand::RequestExit).await.unwrap();
            tx.send(ExamCommand::CancelExit).await.unwrap();
            tx.send(ExamCommand::ConfirmExit).await.unwrap();
            tokio::time::sleep(Duration::from_millis(3_500)).await;
            tx.send(ExamCommand::RequestExit).await.unwrap();
            tx.send(ExamCommand::ConfirmExit).await.unwrap();
        });

        assert_eq!(
            outcome,
            ExamOutcome::Exited {
                phase: Phase::Running,
                answered: 1
            }
        );
        assert_eq!(recorder.exit_requests.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.ticks.lock().unwrap().len(), 3);
        assert_eq!(backend.submit_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_exit_request_lapses_on_next_command() {
        let backend = Arc::new(FakeBackend::exam(1));
        let controller = ExamController::load(backend.clone(), 1, 7).await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        let recorder = Recorder::default();

        let (outcome, ()) = tokio::join!(controller.run(rx, &recorder), async {
            tx.send(ExamCommand::Start).await.unwrap();
            tx.send(ExamCommand::RequestExit).await.unwrap();
            tx.send(answer(1, "4")).await.unwrap();
            tx.send(ExamCommand::ConfirmExit).await.unwrap();
            tx.send(ExamCommand::Submit).await.unwrap();
        });

        assert!(matches!(outcome, ExamOutcome::Submitted { .. }));
        assert_eq!(recorder.exit_requests.load(Ordering::SeqCst), 1);
        assert_eq!(backend.submit_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_delivery_failures_are_retried() {
        let backend = Arc::new(FakeBackend::exam(1));
        backend.failures_before_success.store(2, Ordering::SeqCst);
        let controller = ExamController::load(backend.clone(), 1, 7).await.unwrap();
        let (tx, rx) = mpsc::channel(16);

        tx.send(ExamCommand::Start).await.unwrap();
        tx.send(ExamCommand::Submit).await.unwrap();
        let outcome = controller.run(rx, &NoopObserver).await;

        let ExamOutcome::Submitted { delivery, .. } = outcome else {
            panic!("expected submission");
        };
        assert!(delivery.is_delivered());
        assert_eq!(backend.submit_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_is_reported_not_rolled_back() {
        let backend = Arc::new(FakeBackend::exam(1));
        backend.failures_before_success.store(10, Ordering::SeqCst);
        let controller = ExamController::load(backend.clone(), 1, 7)
            .await
            .unwrap()
            .with_policy(SubmitPolicy {
                max_attempts: 2,
                retry_delay: Duration::from_millis(100),
            });
        let (tx, rx) = mpsc::channel(16);

        tx.send(ExamCommand::Start).await.unwrap();
        tx.send(ExamCommand::Submit).await.unwrap();
        let outcome = controller.run(rx, &NoopObserver).await;

        match outcome {
            ExamOutcome::Submitted {
                submission,
                delivery: DeliveryStatus::Failed { attempts, error },
            } => {
                assert_eq!(submission.reason, SubmitReason::Manual);
                assert_eq!(attempts, 2);
                assert!(error.contains("502"));
            }
            other => panic!("expected failed delivery, got {other:?}"),
        }
        assert_eq!(backend.submit_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_delivery_failure_is_not_retried() {
        let backend = Arc::new(FakeBackend {
            permanent_failure: true,
            ..FakeBackend::exam(1)
        });
        let controller = ExamController::load(backend.clone(), 1, 7).await.unwrap();
        let (tx, rx) = mpsc::channel(16);

        tx.send(ExamCommand::Start).await.unwrap();
        tx.send(ExamCommand::Submit).await.unwrap();
        let outcome = controller.run(rx, &NoopObserver).await;

        assert!(matches!(
            outcome,
            ExamOutcome::Submitted {
                delivery: DeliveryStatus::Failed { attempts: 1, .. },
                ..
            }
        ));
        assert_eq!(backend.submit_calls(), 1);
    }
}
