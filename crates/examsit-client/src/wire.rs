//! Wire DTOs and envelope normalization.
//!
//! The assessment server is inconsistent about response shapes: list
//! endpoints sometimes return a bare JSON array and sometimes a wrapper
//! object, the current section arrives as either a bare id or an object,
//! and recorded answers come back as either a map or a list of pairs. All
//! of that ambiguity is absorbed here, at the single boundary that talks to
//! the server; everything past this module sees one canonical shape.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use examsit_core::api::SectionListing;
use examsit_core::model::{
    Attempt, AttemptStatus, ProgressSnapshot, Question, QuestionKind, Section, TimerState,
};
use examsit_core::options::{likert_options, parse_options};

fn default_true() -> bool {
    true
}

/// Sections endpoint: wrapper object with attempt flags, or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SectionsEnvelope {
    Wrapped {
        #[serde(default)]
        attempt_id: Option<i64>,
        #[serde(default = "default_true")]
        can_attempt: bool,
        sections: Vec<Section>,
    },
    Bare(Vec<Section>),
}

impl SectionsEnvelope {
    pub(crate) fn into_listing(self) -> SectionListing {
        match self {
            SectionsEnvelope::Wrapped {
                attempt_id,
                can_attempt,
                sections,
            } => SectionListing {
                attempt_id,
                can_attempt,
                sections,
            },
            SectionsEnvelope::Bare(sections) => SectionListing {
                attempt_id: None,
                can_attempt: true,
                sections,
            },
        }
    }
}

/// Attempt-creation response: `{"attempt_id": n}` or `{"id": n}`, with an
/// optional server-side creation timestamp.
#[derive(Debug, Deserialize)]
pub(crate) struct AttemptCreated {
    #[serde(alias = "id")]
    pub attempt_id: i64,
    #[serde(default, alias = "created_at")]
    pub started_at: Option<DateTime<Utc>>,
}

impl AttemptCreated {
    pub(crate) fn into_attempt(self) -> Attempt {
        Attempt {
            id: self.attempt_id,
            status: AttemptStatus::InProgress,
            started_at: self.started_at,
        }
    }
}

/// Questions endpoint: bare array or `{"questions": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum QuestionsEnvelope {
    Wrapped { questions: Vec<WireQuestion> },
    Bare(Vec<WireQuestion>),
}

impl QuestionsEnvelope {
    pub(crate) fn into_questions(self) -> Vec<Question> {
        let raw = match self {
            QuestionsEnvelope::Wrapped { questions } => questions,
            QuestionsEnvelope::Bare(questions) => questions,
        };
        raw.into_iter().map(WireQuestion::normalize).collect()
    }
}

/// A question as the server sends it: kind as a free-form string, options
/// in any of the encodings `parse_options` understands.
#[derive(Debug, Deserialize)]
pub(crate) struct WireQuestion {
    pub id: i64,
    #[serde(alias = "question_text")]
    pub text: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub options: Value,
}

impl WireQuestion {
    fn normalize(self) -> Question {
        let kind = self
            .kind
            .as_deref()
            .and_then(|k| k.parse::<QuestionKind>().ok())
            .unwrap_or(QuestionKind::MultipleChoice);
        let mut options = parse_options(&self.options);
        if options.is_empty() && kind == QuestionKind::Likert {
            options = likert_options();
        }
        Question {
            id: self.id,
            text: self.text,
            kind,
            options,
        }
    }
}

/// Timer responses from start/pause/resume.
#[derive(Debug, Deserialize)]
pub(crate) struct WireTimer {
    #[serde(alias = "remaining_seconds")]
    pub remaining_time_seconds: u64,
    #[serde(default)]
    pub is_paused: bool,
}

impl WireTimer {
    pub(crate) fn into_state(self) -> TimerState {
        TimerState {
            remaining_seconds: self.remaining_time_seconds,
            is_paused: self.is_paused,
        }
    }
}

/// The current section inside a snapshot: bare id or object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SectionRef {
    Id(i64),
    Object { id: i64 },
}

impl SectionRef {
    fn id(&self) -> i64 {
        match self {
            SectionRef::Id(id) => *id,
            SectionRef::Object { id } => *id,
        }
    }
}

/// Recorded answers inside a snapshot: map of stringified question ids, or
/// a list of pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireAnswers {
    Map(HashMap<String, String>),
    List(Vec<WireAnswerEntry>),
}

impl Default for WireAnswers {
    fn default() -> Self {
        WireAnswers::Map(HashMap::new())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAnswerEntry {
    pub question_id: i64,
    pub selected_option: String,
}

impl WireAnswers {
    fn normalize(self) -> HashMap<i64, String> {
        match self {
            WireAnswers::Map(map) => map
                .into_iter()
                .filter_map(|(k, v)| k.parse::<i64>().ok().map(|id| (id, v)))
                .collect(),
            WireAnswers::List(entries) => entries
                .into_iter()
                .map(|e| (e.question_id, e.selected_option))
                .collect(),
        }
    }
}

/// Progress snapshot as the server sends it.
#[derive(Debug, Deserialize)]
pub(crate) struct WireSnapshot {
    pub status: AttemptStatus,
    #[serde(default, alias = "current_section")]
    pub current_section_id: Option<SectionRef>,
    #[serde(default)]
    pub current_question_index: usize,
    #[serde(default)]
    pub answers: WireAnswers,
    #[serde(default, alias = "remaining_seconds")]
    pub remaining_time_seconds: u64,
    #[serde(default)]
    pub is_paused: bool,
}

impl WireSnapshot {
    pub(crate) fn into_snapshot(self) -> ProgressSnapshot {
        ProgressSnapshot {
            status: self.status,
            current_section_id: self.current_section_id.map(|s| s.id()),
            current_question_index: self.current_question_index,
            answers: self.answers.normalize(),
            remaining_time_seconds: self.remaining_time_seconds,
            is_paused: self.is_paused,
        }
    }
}
