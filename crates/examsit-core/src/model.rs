//! Core data model types for examsit.
//!
//! These are the fundamental types the entire examsit system uses to
//! represent attempts, sections, questions, and the server's authoritative
//! view of progress.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Option key substituted for unanswered questions on an auto (timeout)
/// submission.
pub const DEFAULT_OPTION_KEY: &str = "A";

/// One student's single run through the ordered sequence of sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Server-issued attempt identifier.
    pub id: i64,
    /// Overall attempt status.
    pub status: AttemptStatus,
    /// When the attempt was started, if it has been.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::NotStarted => write!(f, "NOT_STARTED"),
            AttemptStatus::InProgress => write!(f, "IN_PROGRESS"),
            AttemptStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOT_STARTED" => Ok(AttemptStatus::NotStarted),
            "IN_PROGRESS" => Ok(AttemptStatus::InProgress),
            "COMPLETED" => Ok(AttemptStatus::Completed),
            other => Err(format!("unknown attempt status: {other}")),
        }
    }
}

/// One timed, ordered block of questions within an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Server-issued section identifier.
    pub id: i64,
    /// 1-based position in the attempt's section order.
    pub order_index: u32,
    /// Human-readable section name.
    pub name: String,
    /// Number of questions in this section.
    pub question_count: u32,
    /// Time budget for this section in seconds.
    pub time_limit_seconds: u64,
    /// Completion status.
    #[serde(default = "default_section_status")]
    pub status: SectionStatus,
}

fn default_section_status() -> SectionStatus {
    SectionStatus::NotStarted
}

/// Lifecycle status of a section as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionStatus::NotStarted => write!(f, "NOT_STARTED"),
            SectionStatus::InProgress => write!(f, "IN_PROGRESS"),
            SectionStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// A single question within a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Server-issued question identifier.
    pub id: i64,
    /// Question text shown to the student.
    pub text: String,
    /// Question kind.
    pub kind: QuestionKind,
    /// Canonical, ordered answer options.
    pub options: Vec<AnswerOption>,
}

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// 2–5 options, arbitrary labels.
    MultipleChoice,
    /// Fixed five-point agreement scale.
    Likert,
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple_choice" | "multiple-choice" | "mcq" => Ok(QuestionKind::MultipleChoice),
            "likert" => Ok(QuestionKind::Likert),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// A normalized answer choice, regardless of how the server encoded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Single uppercase letter A–E.
    pub key: String,
    /// Label shown to the student.
    pub label: String,
}

/// Server-owned countdown state for the active section.
///
/// The client only holds a locally-decrementing cache of this; every server
/// round trip overwrites the cache, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub is_paused: bool,
}

/// The server's complete, authoritative description of where an attempt
/// stands. Used both for crash recovery and post-submission reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Overall attempt status.
    pub status: AttemptStatus,
    /// Section the student is currently in, if any.
    #[serde(default)]
    pub current_section_id: Option<i64>,
    /// 0-based index of the question the student was looking at.
    #[serde(default)]
    pub current_question_index: usize,
    /// Answers recorded so far, keyed by question id.
    #[serde(default)]
    pub answers: HashMap<i64, String>,
    /// Authoritative remaining time for the current section.
    #[serde(default)]
    pub remaining_time_seconds: u64,
    /// Whether the current section's timer is paused.
    #[serde(default)]
    pub is_paused: bool,
}
