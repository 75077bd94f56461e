//! In-memory assessment server for testing the session orchestrator
//! without real network calls.
//!
//! Implements the authoritative behaviors the orchestrator must tolerate:
//! the single-attempt policy, duplicate-finalize conflicts, section
//! advancement, and per-section timers. Tests can script failures and
//! inspect call counters.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use examsit_core::api::{AssessmentApi, SectionListing, SubmitSectionRequest};
use examsit_core::error::ApiError;
use examsit_core::model::{
    Attempt, AttemptStatus, ProgressSnapshot, Question, Section, SectionStatus, TimerState,
};

const MOCK_ATTEMPT_ID: i64 = 1;

#[derive(Debug, Default)]
struct ServerState {
    attempt_exists: bool,
    attempt_completed: bool,
    can_attempt: bool,
    sections: Vec<Section>,
    questions: HashMap<i64, Vec<Question>>,
    current_section_id: Option<i64>,
    current_question_index: usize,
    remaining: HashMap<i64, u64>,
    is_paused: bool,
    answers: HashMap<i64, String>,
    finalized: HashSet<i64>,
    submit_calls: u32,
    record_calls: u32,
    complete_calls: u32,
    progress_calls: u32,
    fail_next_submit: Option<u16>,
    fail_record_answers: bool,
}

/// A scriptable, in-memory stand-in for the assessment server.
pub struct MockAssessmentApi {
    state: Mutex<ServerState>,
}

impl MockAssessmentApi {
    /// Create a mock with the given sections (sorted by `order_index`) and
    /// per-section question banks.
    pub fn new(mut sections: Vec<Section>, questions: HashMap<i64, Vec<Question>>) -> Self {
        sections.sort_by_key(|s| s.order_index);
        Self {
            state: Mutex::new(ServerState {
                can_attempt: true,
                sections,
                questions,
                ..ServerState::default()
            }),
        }
    }

    /// Forbid any (further) attempt, as the single-attempt policy would.
    pub fn deny_attempt(&self) {
        self.state.lock().unwrap().can_attempt = false;
    }

    /// Override the authoritative remaining time for a section.
    pub fn set_remaining(&self, section_id: i64, seconds: u64) {
        self.state
            .lock()
            .unwrap()
            .remaining
            .insert(section_id, seconds);
    }

    /// Put the server into a mid-attempt state, as if a previous client
    /// session was interrupted.
    pub fn seed_in_progress(
        &self,
        section_id: i64,
        question_index: usize,
        answers: HashMap<i64, String>,
        remaining_seconds: u64,
        is_paused: bool,
    ) {
        let mut state = self.state.lock().unwrap();
        state.attempt_exists = true;
        state.current_section_id = Some(section_id);
        state.current_question_index = question_index;
        state.answers = answers;
        state.remaining.insert(section_id, remaining_seconds);
        state.is_paused = is_paused;
        if let Some(section) = state.sections.iter_mut().find(|s| s.id == section_id) {
            section.status = SectionStatus::InProgress;
        }
    }

    /// Make the next submit fail with the given HTTP status.
    pub fn fail_next_submit(&self, status: u16) {
        self.state.lock().unwrap().fail_next_submit = Some(status);
    }

    /// Make every real-time answer save fail.
    pub fn fail_record_answers(&self) {
        self.state.lock().unwrap().fail_record_answers = true;
    }

    pub fn submit_calls(&self) -> u32 {
        self.state.lock().unwrap().submit_calls
    }

    pub fn record_calls(&self) -> u32 {
        self.state.lock().unwrap().record_calls
    }

    pub fn complete_calls(&self) -> u32 {
        self.state.lock().unwrap().complete_calls
    }

    pub fn progress_calls(&self) -> u32 {
        self.state.lock().unwrap().progress_calls
    }

    /// The answers the server holds (real-time saves plus finalized sets).
    pub fn server_answers(&self) -> HashMap<i64, String> {
        self.state.lock().unwrap().answers.clone()
    }
}

fn snapshot_of(state: &ServerState) -> ProgressSnapshot {
    let status = if state.attempt_completed {
        AttemptStatus::Completed
    } else if state.attempt_exists {
        AttemptStatus::InProgress
    } else {
        AttemptStatus::NotStarted
    };
    let remaining = state
        .current_section_id
        .and_then(|id| state.remaining.get(&id).copied())
        .unwrap_or(0);
    ProgressSnapshot {
        status,
        current_section_id: if state.attempt_completed {
            None
        } else {
            state.current_section_id
        },
        current_question_index: state.current_question_index,
        answers: state.answers.clone(),
        remaining_time_seconds: remaining,
        is_paused: state.is_paused,
    }
}

#[async_trait]
impl AssessmentApi for MockAssessmentApi {
    async fn list_sections(&self, _attempt_id: Option<i64>) -> Result<SectionListing, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(SectionListing {
            attempt_id: state.attempt_exists.then_some(MOCK_ATTEMPT_ID),
            can_attempt: state.can_attempt,
            sections: state.sections.clone(),
        })
    }

    async fn start_attempt(&self) -> Result<Attempt, ApiError> {
        // Idempotent: a second call returns the existing attempt.
        self.state.lock().unwrap().attempt_exists = true;
        Ok(Attempt {
            id: MOCK_ATTEMPT_ID,
            status: AttemptStatus::InProgress,
            started_at: Some(chrono::Utc::now()),
        })
    }

    async fn fetch_questions(
        &self,
        _attempt_id: i64,
        section_id: i64,
    ) -> Result<Vec<Question>, ApiError> {
        let state = self.state.lock().unwrap();
        state
            .questions
            .get(&section_id)
            .cloned()
            .ok_or(ApiError::Http {
                status: 404,
                message: format!("no questions for section {section_id}"),
            })
    }

    async fn start_section(
        &self,
        _attempt_id: i64,
        section_id: i64,
    ) -> Result<TimerState, ApiError> {
        let mut state = self.state.lock().unwrap();
        let section = state
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or(ApiError::Http {
                status: 404,
                message: format!("unknown section {section_id}"),
            })?;
        if section.status != SectionStatus::NotStarted {
            return Err(ApiError::Conflict(format!(
                "section {section_id} already started"
            )));
        }
        section.status = SectionStatus::InProgress;
        let limit = section.time_limit_seconds;
        let remaining = *state.remaining.entry(section_id).or_insert(limit);
        state.current_section_id = Some(section_id);
        state.is_paused = false;
        Ok(TimerState {
            remaining_seconds: remaining,
            is_paused: false,
        })
    }

    async fn pause_section(
        &self,
        _attempt_id: i64,
        section_id: i64,
    ) -> Result<TimerState, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.is_paused = true;
        let remaining = state.remaining.get(&section_id).copied().unwrap_or(0);
        Ok(TimerState {
            remaining_seconds: remaining,
            is_paused: true,
        })
    }

    async fn resume_section(
        &self,
        _attempt_id: i64,
        section_id: i64,
    ) -> Result<TimerState, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.is_paused = false;
        let remaining = state.remaining.get(&section_id).copied().unwrap_or(0);
        Ok(TimerState {
            remaining_seconds: remaining,
            is_paused: false,
        })
    }

    async fn submit_section(&self, request: &SubmitSectionRequest) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.submit_calls += 1;

        if let Some(status) = state.fail_next_submit.take() {
            return Err(ApiError::Http {
                status,
                message: "scripted failure".into(),
            });
        }
        if state.finalized.contains(&request.section_id) {
            return Err(ApiError::Conflict(format!(
                "section {} already submitted",
                request.section_id
            )));
        }

        state.finalized.insert(request.section_id);
        for answer in &request.answers {
            state
                .answers
                .insert(answer.question_id, answer.selected_option.clone());
        }
        let next_id = {
            let position = state
                .sections
                .iter()
                .position(|s| s.id == request.section_id);
            if let Some(i) = position {
                state.sections[i].status = SectionStatus::Completed;
                state.sections.get(i + 1).map(|s| s.id)
            } else {
                None
            }
        };
        state.current_section_id = next_id;
        state.current_question_index = 0;
        if let Some(next) = next_id {
            let limit = state
                .sections
                .iter()
                .find(|s| s.id == next)
                .map(|s| s.time_limit_seconds)
                .unwrap_or(0);
            state.remaining.entry(next).or_insert(limit);
        }
        Ok(())
    }

    async fn record_answer(
        &self,
        _attempt_id: i64,
        question_id: i64,
        selected_option: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.record_calls += 1;
        if state.fail_record_answers {
            return Err(ApiError::Network("connection reset".into()));
        }
        state
            .answers
            .insert(question_id, selected_option.to_string());
        Ok(())
    }

    async fn fetch_progress(&self, _attempt_id: i64) -> Result<ProgressSnapshot, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.progress_calls += 1;
        Ok(snapshot_of(&state))
    }

    async fn complete_attempt(
        &self,
        _attempt_id: i64,
        _auto_submitted: bool,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.complete_calls += 1;
        if state.attempt_completed {
            return Err(ApiError::Conflict("attempt already completed".into()));
        }
        state.attempt_completed = true;
        state.current_section_id = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examsit_core::model::QuestionKind;

    fn section(id: i64, order_index: u32, limit: u64) -> Section {
        Section {
            id,
            order_index,
            name: format!("Section {order_index}"),
            question_count: 1,
            time_limit_seconds: limit,
            status: SectionStatus::NotStarted,
        }
    }

    fn question(id: i64) -> Question {
        Question {
            id,
            text: format!("Q{id}"),
            kind: QuestionKind::MultipleChoice,
            options: vec![],
        }
    }

    fn two_section_mock() -> MockAssessmentApi {
        let mut questions = HashMap::new();
        questions.insert(1, vec![question(10)]);
        questions.insert(2, vec![question(20)]);
        MockAssessmentApi::new(vec![section(1, 1, 420), section(2, 2, 300)], questions)
    }

    #[tokio::test]
    async fn double_submit_conflicts() {
        let mock = two_section_mock();
        mock.start_attempt().await.unwrap();
        mock.start_section(1, 1).await.unwrap();

        let request = SubmitSectionRequest {
            attempt_id: 1,
            section_id: 1,
            answers: vec![],
        };
        mock.submit_section(&request).await.unwrap();
        let err = mock.submit_section(&request).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(mock.submit_calls(), 2);
    }

    #[tokio::test]
    async fn submit_advances_current_section() {
        let mock = two_section_mock();
        mock.start_attempt().await.unwrap();
        mock.start_section(1, 1).await.unwrap();
        mock.submit_section(&SubmitSectionRequest {
            attempt_id: 1,
            section_id: 1,
            answers: vec![],
        })
        .await
        .unwrap();

        let snapshot = mock.fetch_progress(1).await.unwrap();
        assert_eq!(snapshot.current_section_id, Some(2));
        assert_eq!(snapshot.remaining_time_seconds, 300);
    }

    #[tokio::test]
    async fn start_twice_conflicts() {
        let mock = two_section_mock();
        mock.start_attempt().await.unwrap();
        mock.start_section(1, 1).await.unwrap();
        let err = mock.start_section(1, 1).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
