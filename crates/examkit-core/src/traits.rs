//! The narrow interface examkit needs from the LMS backend.
//!
//! Implemented over HTTP by `examkit-client`, and by in-memory mocks in tests.

use async_trait::async_trait;

use crate::model::{AnswerMap, ExamHistoryEntry, LessonDetail, SubmitReceipt};

/// Backend operations consumed by the exam subsystem.
///
/// Errors are `anyhow::Error`; implementations should wrap
/// [`BackendError`](crate::error::BackendError) so callers can downcast and
/// decide whether a retry makes sense.
#[async_trait]
pub trait ExamBackend: Send + Sync {
    /// Fetch a lesson (with its module) by module and lesson id.
    async fn load_lesson(&self, module_id: u64, lesson_id: u64) -> anyhow::Result<LessonDetail>;

    /// Submit a student's answers for an exam lesson.
    async fn submit_answers(
        &self,
        lesson_id: u64,
        answers: &AnswerMap,
    ) -> anyhow::Result<SubmitReceipt>;

    /// List the current student's past exam attempts.
    async fn exam_history(&self) -> anyhow::Result<Vec<ExamHistoryEntry>>;
}
