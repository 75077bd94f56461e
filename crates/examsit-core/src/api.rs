//! The remote-authority contract.
//!
//! The assessment server owns all truth: attempt existence, section status,
//! remaining time, and recorded answers. This async trait is the single
//! seam the orchestrator talks through; `examsit-client` implements it over
//! HTTP and provides an in-memory mock for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{Attempt, ProgressSnapshot, Question, Section, TimerState};

/// Result of listing sections: the ordered sections plus the attempt-level
/// flags the caller needs before showing the assessment at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionListing {
    /// The student's existing attempt, if one exists.
    #[serde(default)]
    pub attempt_id: Option<i64>,
    /// Whether the single-attempt policy permits taking the assessment.
    pub can_attempt: bool,
    /// Sections in `order_index` order, each with its completion status.
    pub sections: Vec<Section>,
}

/// One answer inside a section submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: i64,
    /// Single uppercase letter A–E.
    pub selected_option: String,
}

/// The full answer set for one section, sent at finalize time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSectionRequest {
    pub attempt_id: i64,
    pub section_id: i64,
    pub answers: Vec<AnswerSubmission>,
}

/// Remote operations exposed by the assessment server.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// List the ordered sections, optionally scoped to an attempt.
    async fn list_sections(&self, attempt_id: Option<i64>) -> Result<SectionListing, ApiError>;

    /// Create the attempt record. Idempotent: if an attempt already exists
    /// for the student, the existing attempt is returned rather than an
    /// error.
    async fn start_attempt(&self) -> Result<Attempt, ApiError>;

    /// Fetch the questions for one section of one attempt.
    async fn fetch_questions(
        &self,
        attempt_id: i64,
        section_id: i64,
    ) -> Result<Vec<Question>, ApiError>;

    /// Start a section. Returns the authoritative timer state. Starting an
    /// already-started section yields [`ApiError::Conflict`].
    async fn start_section(&self, attempt_id: i64, section_id: i64)
        -> Result<TimerState, ApiError>;

    /// Pause the section timer. The response carries the authoritative
    /// remaining time, which replaces any local prediction.
    async fn pause_section(&self, attempt_id: i64, section_id: i64)
        -> Result<TimerState, ApiError>;

    /// Resume the section timer. Same adoption rule as pause.
    async fn resume_section(
        &self,
        attempt_id: i64,
        section_id: i64,
    ) -> Result<TimerState, ApiError>;

    /// Finalize a section with its complete answer set. A second submission
    /// of the same section yields [`ApiError::Conflict`].
    async fn submit_section(&self, request: &SubmitSectionRequest) -> Result<(), ApiError>;

    /// Persist a single in-progress answer in real time. Failures here are
    /// non-fatal; the full answer set is re-sent at finalize.
    async fn record_answer(
        &self,
        attempt_id: i64,
        question_id: i64,
        selected_option: &str,
    ) -> Result<(), ApiError>;

    /// Fetch the authoritative progress snapshot for an attempt.
    async fn fetch_progress(&self, attempt_id: i64) -> Result<ProgressSnapshot, ApiError>;

    /// Mark the whole attempt complete. `auto_submitted` flags completion
    /// caused by time expiry rather than a student action.
    async fn complete_attempt(&self, attempt_id: i64, auto_submitted: bool)
        -> Result<(), ApiError>;
}

/// Build the answer list for a submission, in question order, substituting
/// `default_key` for any question missing from `answers`.
pub fn build_answer_list(
    questions: &[Question],
    answers: &HashMap<i64, String>,
    default_key: &str,
) -> Vec<AnswerSubmission> {
    questions
        .iter()
        .map(|q| AnswerSubmission {
            question_id: q.id,
            selected_option: answers
                .get(&q.id)
                .cloned()
                .unwrap_or_else(|| default_key.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    fn question(id: i64) -> Question {
        Question {
            id,
            text: format!("Q{id}"),
            kind: QuestionKind::MultipleChoice,
            options: vec![],
        }
    }

    #[test]
    fn build_answer_list_preserves_question_order() {
        let questions = vec![question(7), question(3), question(9)];
        let mut answers = HashMap::new();
        answers.insert(3, "B".to_string());
        answers.insert(9, "D".to_string());
        answers.insert(7, "C".to_string());

        let list = build_answer_list(&questions, &answers, "A");
        let ids: Vec<i64> = list.iter().map(|a| a.question_id).collect();
        assert_eq!(ids, vec![7, 3, 9]);
        assert_eq!(list[0].selected_option, "C");
    }

    #[test]
    fn build_answer_list_defaults_missing() {
        let questions = vec![question(1), question(2)];
        let mut answers = HashMap::new();
        answers.insert(2, "E".to_string());

        let list = build_answer_list(&questions, &answers, "A");
        assert_eq!(list[0].selected_option, "A");
        assert_eq!(list[1].selected_option, "E");
    }

    #[test]
    fn submit_request_wire_shape() {
        let request = SubmitSectionRequest {
            attempt_id: 12,
            section_id: 4,
            answers: vec![AnswerSubmission {
                question_id: 88,
                selected_option: "B".into(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["attempt_id"], 12);
        assert_eq!(json["answers"][0]["question_id"], 88);
        assert_eq!(json["answers"][0]["selected_option"], "B");
    }
}
