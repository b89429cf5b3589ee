//! In-memory backend for tests and offline demos.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use examkit_core::error::BackendError;
use examkit_core::evaluator::check_answers;
use examkit_core::model::{
    AnswerMap, ExamHistoryEntry, Lesson, LessonDetail, LessonType, ModuleRef, SubmitReceipt,
};
use examkit_core::parser::parse_exam_content;
use examkit_core::traits::ExamBackend;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A backend that serves configured lessons and grades submissions locally.
///
/// Submissions are scored with [`check_answers`] against the lesson content,
/// so receipts match what the real backend would report for the same exam.
#[derive(Default)]
pub struct MockBackend {
    /// Lessons keyed by `(module_id, lesson_id)`.
    lessons: BTreeMap<(u64, u64), LessonDetail>,
    /// Errors returned by the next submit calls, in order.
    submit_failures: Mutex<VecDeque<BackendError>>,
    submit_count: AtomicU32,
    last_submission: Mutex<Option<(u64, AnswerMap)>>,
    history: Mutex<Vec<ExamHistoryEntry>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exam lesson.
    pub fn with_exam(
        mut self,
        module_id: u64,
        lesson_id: u64,
        content: &str,
        duration_minutes: u32,
    ) -> Self {
        self.lessons.insert(
            (module_id, lesson_id),
            LessonDetail {
                lesson: Lesson {
                    id: lesson_id,
                    title: format!("Exam {lesson_id}"),
                    content: content.to_string(),
                    lesson_type: LessonType::Exam,
                    duration_minutes,
                },
                module: ModuleRef {
                    id: module_id,
                    title: format!("Module {module_id}"),
                },
            },
        );
        self
    }

    /// Register a regular (non-exam) lesson.
    pub fn with_lesson(mut self, module_id: u64, lesson_id: u64, content: &str) -> Self {
        self.lessons.insert(
            (module_id, lesson_id),
            LessonDetail {
                lesson: Lesson {
                    id: lesson_id,
                    title: format!("Lesson {lesson_id}"),
                    content: content.to_string(),
                    lesson_type: LessonType::Lesson,
                    duration_minutes: 30,
                },
                module: ModuleRef {
                    id: module_id,
                    title: format!("Module {module_id}"),
                },
            },
        );
        self
    }

    /// Make the next submit call fail with `error`. Queued failures are
    /// consumed in order before submissions succeed again.
    pub fn fail_next_submit(&self, error: BackendError) {
        lock(&self.submit_failures).push_back(error);
    }

    /// Number of submit calls made, failed ones included.
    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::Relaxed)
    }

    /// The lesson id and answers of the last submit call.
    pub fn last_submission(&self) -> Option<(u64, AnswerMap)> {
        lock(&self.last_submission).clone()
    }

    fn find_lesson(&self, lesson_id: u64) -> Option<&LessonDetail> {
        self.lessons
            .iter()
            .find(|((_, id), _)| *id == lesson_id)
            .map(|(_, detail)| detail)
    }
}

#[async_trait]
impl ExamBackend for MockBackend {
    async fn load_lesson(&self, module_id: u64, lesson_id: u64) -> anyhow::Result<LessonDetail> {
        self.lessons
            .get(&(module_id, lesson_id))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("lesson {lesson_id} in module {module_id}")).into())
    }

    async fn submit_answers(&self, lesson_id: u64, answers: &AnswerMap) -> anyhow::Result<SubmitReceipt> {
        self.submit_count.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_submission) = Some((lesson_id, answers.clone()));

        if let Some(error) = lock(&self.submit_failures).pop_front() {
            return Err(error.into());
        }

        let detail = self
            .find_lesson(lesson_id)
            .ok_or_else(|| BackendError::NotFound(format!("exam {lesson_id}")))?;
        let questions = parse_exam_content(&detail.lesson.content);
        let result = check_answers(&questions, answers);

        let correct_answers = questions
            .iter()
            .filter_map(|q| q.correct_answer.clone().map(|a| (q.id, a)))
            .collect();
        let mut history = lock(&self.history);
        let next_id = history.len() as u64 + 1;
        history.push(ExamHistoryEntry {
            id: next_id,
            lesson_id: Some(lesson_id),
            lesson_title: detail.lesson.title.clone(),
            module_id: Some(detail.module.id),
            module_title: detail.module.title.clone(),
            score: Some(result.score),
            max_score: Some(result.max_score),
            percentage: Some(result.percentage()),
            date_finished: chrono::Utc::now(),
            answers: answers.clone(),
            correct_answers,
        });

        Ok(SubmitReceipt {
            message: "Exam answers submitted successfully".into(),
            score: result.score,
            max_score: result.max_score,
            percentage: result.percentage(),
        })
    }

    async fn exam_history(&self) -> anyhow::Result<Vec<ExamHistoryEntry>> {
        Ok(lock(&self.history).clone())
    }
}
