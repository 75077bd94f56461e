//! The exam session orchestrator.
//!
//! `ExamSession` is the client half of a distributed state machine whose
//! other half lives on the assessment server. The server is authoritative
//! for everything: attempt existence, section status, remaining time, and
//! recorded answers. The session keeps a local prediction of that state so
//! the UI stays responsive, and reconciles against the server's progress
//! snapshot after every state-changing operation. The rule throughout is
//! last-authoritative-write-wins: a value returned from the server replaces
//! local state unconditionally, never the other way around.
//!
//! Scheduling is single-threaded and cooperative: one logical task owns the
//! session and interleaves network calls with the once-per-second tick. The
//! finalize path is serialized by [`SubmitGuard`], a two-state flag checked
//! and set synchronously before any await point, so a manual submit racing
//! an expiring timer produces exactly one finalize call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{build_answer_list, AssessmentApi, SubmitSectionRequest};
use crate::catalog::SectionCatalog;
use crate::error::SessionError;
use crate::model::{
    AttemptStatus, ProgressSnapshot, Question, Section, TimerState, DEFAULT_OPTION_KEY,
};
use crate::timer::{SectionTimer, TimerTick};

/// Single-flight guard for the finalize path.
///
/// Two states, one owner, one accessor pair. There is only one logical
/// thread of control, so check-then-set cannot itself race; the guard
/// exists to serialize the two *triggers* (user click, timer expiry) that
/// can both reach finalize while a previous finalize is suspended at an
/// await point.
#[derive(Debug, Default)]
struct SubmitGuard {
    submitting: bool,
}

impl SubmitGuard {
    /// Claim the guard. Returns false if a finalize is already in flight.
    fn try_begin(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        true
    }

    fn finish(&mut self) {
        self.submitting = false;
    }

    fn in_flight(&self) -> bool {
        self.submitting
    }
}

/// Live state for the section currently being taken.
#[derive(Debug, Clone)]
pub struct ActiveSection {
    pub section: Section,
    pub questions: Vec<Question>,
    /// 0-based index of the question the student is looking at.
    pub question_index: usize,
    /// In-progress answers, keyed by question id.
    pub answers: HashMap<i64, String>,
    pub timer: SectionTimer,
}

/// What one call to [`ExamSession::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: no active section, paused, or finalize in flight.
    Idle,
    /// The countdown advanced.
    Running { remaining: u64 },
    /// The timer expired and the auto-submit advanced to the next section.
    SectionAdvanced,
    /// The timer expired and the auto-submit completed the whole attempt.
    AttemptCompleted,
}

/// Result of a finalize-and-advance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Another finalize was already in flight; this call was a no-op.
    InFlight,
    /// The section was finalized and the next section is now active.
    SectionAdvanced,
    /// The section was finalized and the whole attempt is complete.
    AttemptCompleted,
}

/// Client-side orchestrator for one attempt.
pub struct ExamSession {
    api: Arc<dyn AssessmentApi>,
    attempt_id: i64,
    catalog: SectionCatalog,
    active: Option<ActiveSection>,
    guard: SubmitGuard,
    completed: bool,
}

impl std::fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamSession")
            .field("attempt_id", &self.attempt_id)
            .field("catalog", &self.catalog)
            .field("active", &self.active)
            .field("guard", &self.guard)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl ExamSession {
    /// Begin or resume the assessment.
    ///
    /// Gates on the single-attempt policy, creates the attempt if needed
    /// (idempotent server-side), then either rehydrates an in-progress
    /// attempt from the server snapshot or activates the first unlocked
    /// section.
    pub async fn begin(api: Arc<dyn AssessmentApi>) -> Result<Self, SessionError> {
        let listing = api.list_sections(None).await?;
        if !listing.can_attempt {
            return Err(SessionError::AttemptClosed);
        }

        let attempt_id = match listing.attempt_id {
            Some(id) => id,
            None => api.start_attempt().await?.id,
        };
        tracing::info!(attempt_id, "beginning attempt");

        let mut session = Self {
            api,
            attempt_id,
            catalog: SectionCatalog::new(listing.sections),
            active: None,
            guard: SubmitGuard::default(),
            completed: false,
        };

        let snapshot = session.api.fetch_progress(attempt_id).await?;
        match snapshot.status {
            AttemptStatus::Completed => {
                session.completed = true;
            }
            _ if snapshot.current_section_id.is_some() => {
                session.recover(snapshot).await?;
            }
            _ => {
                session.activate_first_open().await?;
            }
        }
        Ok(session)
    }

    pub fn attempt_id(&self) -> i64 {
        self.attempt_id
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn catalog(&self) -> &SectionCatalog {
        &self.catalog
    }

    pub fn active(&self) -> Option<&ActiveSection> {
        self.active.as_ref()
    }

    /// Whether the tick interval should keep running.
    pub fn timer_running(&self) -> bool {
        !self.guard.in_flight()
            && self
                .active
                .as_ref()
                .is_some_and(|a| a.timer.running())
    }

    /// Move to another question in the active section. Out-of-range
    /// indexes are clamped.
    pub fn goto_question(&mut self, index: usize) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NoActiveSection)?;
        active.question_index = index.min(active.questions.len().saturating_sub(1));
        Ok(())
    }

    /// Record an in-progress answer: update the local map immediately,
    /// then persist remotely without blocking. A failed real-time save is
    /// swallowed; the full answer set is re-sent at finalize.
    pub fn record_answer(
        &mut self,
        question_id: i64,
        option_key: &str,
    ) -> Result<(), SessionError> {
        if self.guard.in_flight() {
            return Err(SessionError::SectionLocked);
        }
        let active = self.active.as_mut().ok_or(SessionError::NoActiveSection)?;
        if active.timer.has_expired() {
            return Err(SessionError::SectionLocked);
        }

        let key = option_key.trim().to_uppercase();
        active.answers.insert(question_id, key.clone());

        let api = Arc::clone(&self.api);
        let attempt_id = self.attempt_id;
        tokio::spawn(async move {
            if let Err(e) = api.record_answer(attempt_id, question_id, &key).await {
                tracing::debug!(question_id, "real-time answer save failed (resent at finalize): {e}");
            }
        });
        Ok(())
    }

    /// Advance the local countdown by one second.
    ///
    /// Every tenth tick re-fetches the authoritative remaining time and
    /// overwrites the local prediction. When the prediction reaches zero,
    /// expiry fires exactly once and hands control to the finalize path as
    /// an auto-submit.
    pub async fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.guard.in_flight() || self.completed {
            return Ok(TickOutcome::Idle);
        }
        let tick = match self.active.as_mut() {
            Some(active) => active.timer.tick(),
            None => return Ok(TickOutcome::Idle),
        };

        match tick {
            TimerTick::Idle => Ok(TickOutcome::Idle),
            TimerTick::Ticked { needs_resync } => {
                if needs_resync {
                    let snapshot = self.api.fetch_progress(self.attempt_id).await?;
                    if let Some(active) = self.active.as_mut() {
                        active
                            .timer
                            .adopt(snapshot.remaining_time_seconds, snapshot.is_paused);
                    }
                }
                let remaining = self
                    .active
                    .as_ref()
                    .map(|a| a.timer.remaining_seconds())
                    .unwrap_or(0);
                Ok(TickOutcome::Running { remaining })
            }
            TimerTick::Expired => {
                tracing::info!("section timer expired; auto-submitting");
                match self.finalize_section(true).await? {
                    FinalizeOutcome::AttemptCompleted => Ok(TickOutcome::AttemptCompleted),
                    _ => Ok(TickOutcome::SectionAdvanced),
                }
            }
        }
    }

    /// Pause the section timer, adopting the server's remaining time.
    pub async fn pause(&mut self) -> Result<TimerState, SessionError> {
        let section_id = self.active_section_id()?;
        let state = self.api.pause_section(self.attempt_id, section_id).await?;
        if let Some(active) = self.active.as_mut() {
            active.timer.adopt(state.remaining_seconds, state.is_paused);
        }
        Ok(state)
    }

    /// Resume the section timer, adopting the server's remaining time.
    /// The server may have independently advanced or capped the timer.
    pub async fn resume(&mut self) -> Result<TimerState, SessionError> {
        let section_id = self.active_section_id()?;
        let state = self.api.resume_section(self.attempt_id, section_id).await?;
        if let Some(active) = self.active.as_mut() {
            active.timer.adopt(state.remaining_seconds, state.is_paused);
        }
        Ok(state)
    }

    /// Finalize the active section and advance to whatever the server says
    /// comes next.
    ///
    /// Single-flight: a call made while another finalize is in flight is a
    /// no-op. A manual submit with unanswered questions is rejected before
    /// any network call. On auto-submit, missing answers are defaulted.
    /// An "already finalized" conflict is success. Any other submit failure
    /// still reconciles against the snapshot first — the request may have
    /// succeeded server-side — and is only surfaced if the server state
    /// shows the section really did not advance.
    pub async fn finalize_section(
        &mut self,
        auto_submit: bool,
    ) -> Result<FinalizeOutcome, SessionError> {
        if !self.guard.try_begin() {
            tracing::debug!("finalize already in flight; ignoring");
            return Ok(FinalizeOutcome::InFlight);
        }
        let result = self.finalize_inner(auto_submit).await;
        self.guard.finish();
        result
    }

    async fn finalize_inner(
        &mut self,
        auto_submit: bool,
    ) -> Result<FinalizeOutcome, SessionError> {
        let (section_id, answers, was_expired) = {
            let active = self.active.as_ref().ok_or(SessionError::NoActiveSection)?;
            if !auto_submit {
                let answered = active
                    .questions
                    .iter()
                    .filter(|q| active.answers.contains_key(&q.id))
                    .count();
                if answered < active.questions.len() {
                    return Err(SessionError::IncompleteAnswers {
                        answered,
                        total: active.questions.len(),
                    });
                }
            }
            (
                active.section.id,
                build_answer_list(&active.questions, &active.answers, DEFAULT_OPTION_KEY),
                active.timer.has_expired(),
            )
        };

        let request = SubmitSectionRequest {
            attempt_id: self.attempt_id,
            section_id,
            answers,
        };
        let submit_err = match self.api.submit_section(&request).await {
            Ok(()) => None,
            Err(e) if e.is_conflict() => {
                tracing::debug!(section_id, "section already finalized; reconciling");
                None
            }
            Err(e) => {
                tracing::warn!(section_id, "submit failed, reconciling before surfacing: {e}");
                Some(e)
            }
        };

        match self.reconcile(auto_submit).await {
            Ok(outcome) => {
                if let Some(e) = submit_err {
                    let advanced = matches!(outcome, FinalizeOutcome::AttemptCompleted)
                        || self.active.as_ref().map_or(true, |a| a.section.id != section_id);
                    if !advanced {
                        // Reconciliation rebuilt the active section; an
                        // already-expired section must not reopen.
                        if was_expired {
                            if let Some(active) = self.active.as_mut() {
                                active.timer.force_expire();
                            }
                        }
                        return Err(e.into());
                    }
                    tracing::warn!(
                        "submit looked failed but server state advanced; treating as success"
                    );
                }
                Ok(outcome)
            }
            // Reconciliation itself failed; prefer the original error.
            Err(reconcile_err) => Err(submit_err.map(Into::into).unwrap_or(reconcile_err)),
        }
    }

    /// Re-derive local state from the authoritative snapshot after a
    /// finalize, and advance or complete accordingly.
    async fn reconcile(&mut self, auto_submit: bool) -> Result<FinalizeOutcome, SessionError> {
        let snapshot = self.api.fetch_progress(self.attempt_id).await?;

        if snapshot.status == AttemptStatus::Completed {
            self.active = None;
            self.completed = true;
            return Ok(FinalizeOutcome::AttemptCompleted);
        }

        let Some(section_id) = snapshot.current_section_id else {
            // No section left: close out the attempt.
            match self.api.complete_attempt(self.attempt_id, auto_submit).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {}
                Err(e) => return Err(e.into()),
            }
            self.active = None;
            self.completed = true;
            return Ok(FinalizeOutcome::AttemptCompleted);
        };

        let listing = self.api.list_sections(Some(self.attempt_id)).await?;
        self.catalog.refresh(listing.sections);

        let section = self
            .catalog
            .by_id(section_id)
            .cloned()
            .ok_or(SessionError::UnknownSection(section_id))?;
        let questions = self.api.fetch_questions(self.attempt_id, section.id).await?;

        let mut timer = SectionTimer::new(snapshot.remaining_time_seconds, snapshot.is_paused);
        match self.api.start_section(self.attempt_id, section.id).await {
            // A fresh server read is fresher than the snapshot.
            Ok(state) => timer.adopt(state.remaining_seconds, state.is_paused),
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(section_id, "advancing to section");
        self.active = Some(ActiveSection {
            section,
            questions,
            question_index: snapshot.current_question_index,
            answers: snapshot.answers,
            timer,
        });
        Ok(FinalizeOutcome::SectionAdvanced)
    }

    /// Rehydrate an interrupted attempt from the snapshot: same section,
    /// same question index, same answers, same remaining time. No
    /// `start_section` call, no timer reset to the section's full limit.
    async fn recover(&mut self, snapshot: ProgressSnapshot) -> Result<(), SessionError> {
        let section_id = snapshot
            .current_section_id
            .ok_or(SessionError::NoActiveSection)?;
        let section = self
            .catalog
            .by_id(section_id)
            .cloned()
            .ok_or(SessionError::UnknownSection(section_id))?;
        let questions = self.api.fetch_questions(self.attempt_id, section.id).await?;

        tracing::info!(
            section_id,
            remaining = snapshot.remaining_time_seconds,
            "recovering in-progress attempt"
        );
        self.active = Some(ActiveSection {
            section,
            questions,
            question_index: snapshot.current_question_index,
            answers: snapshot.answers,
            timer: SectionTimer::new(snapshot.remaining_time_seconds, snapshot.is_paused),
        });
        Ok(())
    }

    /// Activate the first unlocked, not-yet-completed section of a fresh
    /// attempt.
    async fn activate_first_open(&mut self) -> Result<(), SessionError> {
        let Some(section) = self.catalog.first_open().cloned() else {
            self.completed = true;
            return Ok(());
        };
        let questions = self.api.fetch_questions(self.attempt_id, section.id).await?;

        let mut timer = SectionTimer::new(section.time_limit_seconds, false);
        match self.api.start_section(self.attempt_id, section.id).await {
            Ok(state) => timer.adopt(state.remaining_seconds, state.is_paused),
            Err(e) if e.is_conflict() => {
                // Already started server-side; the snapshot has the truth.
                let snapshot = self.api.fetch_progress(self.attempt_id).await?;
                timer.adopt(snapshot.remaining_time_seconds, snapshot.is_paused);
            }
            Err(e) => return Err(e.into()),
        }

        self.active = Some(ActiveSection {
            section,
            questions,
            question_index: 0,
            answers: HashMap::new(),
            timer,
        });
        Ok(())
    }

    fn active_section_id(&self) -> Result<i64, SessionError> {
        self.active
            .as_ref()
            .map(|a| a.section.id)
            .ok_or(SessionError::NoActiveSection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_guard_is_single_flight() {
        let mut guard = SubmitGuard::default();
        assert!(guard.try_begin());
        assert!(guard.in_flight());
        assert!(!guard.try_begin(), "second claim must fail");
        guard.finish();
        assert!(guard.try_begin());
    }
}
