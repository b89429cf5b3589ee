//! Timed exam session state machine.
//!
//! `NotStarted → Running → Submitted`, never backwards. The session knows
//! nothing about wall-clock time: the controller feeds it one [`tick`] per
//! elapsed second.
//!
//! [`tick`]: ExamSession::tick

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{AnswerMap, QuestionId};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    NotStarted,
    Running,
    Submitted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::NotStarted => write!(f, "not-started"),
            Phase::Running => write!(f, "running"),
            Phase::Submitted => write!(f, "submitted"),
        }
    }
}

/// What ended the running phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitReason {
    Manual,
    TimeExpired,
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitReason::Manual => write!(f, "submitted"),
            SubmitReason::TimeExpired => write!(f, "time expired"),
        }
    }
}

/// The answer set frozen at the moment of submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub reason: SubmitReason,
    pub answers: AnswerMap,
    pub elapsed_secs: u32,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not running; nothing changed.
    Idle,
    /// One second elapsed.
    Running { remaining_secs: u32 },
    /// The countdown reached zero and the session submitted itself.
    Expired(Submission),
}

/// How close the countdown is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// More than half the time left.
    Normal,
    /// More than a fifth left.
    Warning,
    Critical,
}

impl Urgency {
    pub fn from_remaining(remaining_secs: u32, duration_secs: u32) -> Self {
        if duration_secs == 0 {
            return Urgency::Critical;
        }
        let left = u64::from(remaining_secs) * 100;
        let total = u64::from(duration_secs);
        if left > total * 50 {
            Urgency::Normal
        } else if left > total * 20 {
            Urgency::Warning
        } else {
            Urgency::Critical
        }
    }
}

/// An in-memory exam attempt. Nothing here is persisted.
#[derive(Debug, Clone)]
pub struct ExamSession {
    duration_secs: u32,
    remaining_secs: u32,
    phase: Phase,
    answers: AnswerMap,
    reason: Option<SubmitReason>,
}

impl ExamSession {
    /// Create a session for a lesson configured with `duration_minutes`.
    pub fn new(duration_minutes: u32) -> Self {
        Self::with_duration_secs(duration_minutes.saturating_mul(60))
    }

    pub fn with_duration_secs(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            phase: Phase::NotStarted,
            answers: AnswerMap::new(),
            reason: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    /// Why the session was submitted, once it has been.
    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.reason
    }

    /// Seconds used so far (`duration - remaining`).
    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs - self.remaining_secs
    }

    /// Begin the countdown.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.phase = Phase::Running;
        Ok(())
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            match self.submit(SubmitReason::TimeExpired) {
                Some(submission) => TickOutcome::Expired(submission),
                None => TickOutcome::Idle,
            }
        } else {
            TickOutcome::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Record or replace the answer to one question.
    pub fn set_answer(
        &mut self,
        question_id: QuestionId,
        answer: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.phase != Phase::Running {
            return Err(SessionError::NotRunning);
        }
        self.answers.insert(question_id, answer.into());
        Ok(())
    }

    /// End the running phase. Returns `None` unless the session was running,
    /// so a late second submit (manual click racing expiry) does nothing.
    pub fn submit(&mut self, reason: SubmitReason) -> Option<Submission> {
        if self.phase != Phase::Running {
            return None;
        }
        self.phase = Phase::Submitted;
        self.reason = Some(reason);
        Some(Submission {
            reason,
            answers: self.answers.clone(),
            elapsed_secs: self.elapsed_secs(),
        })
    }

    pub fn urgency(&self) -> Urgency {
        Urgency::from_remaining(self.remaining_secs, self.duration_secs)
    }
}

/// `HH:MM:SS` from one hour up, `MM:SS` below.
pub fn format_time(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
