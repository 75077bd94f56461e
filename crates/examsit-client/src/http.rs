//! HTTP implementation of the remote-authority contract.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use examsit_core::api::{AssessmentApi, SectionListing, SubmitSectionRequest};
use examsit_core::error::ApiError;
use examsit_core::model::{Attempt, ProgressSnapshot, Question, TimerState};

use crate::config::ClientConfig;
use crate::wire::{AttemptCreated, QuestionsEnvelope, SectionsEnvelope, WireSnapshot, WireTimer};

/// Assessment server client over reqwest.
pub struct HttpAssessmentApi {
    base_url: String,
    auth_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpAssessmentApi {
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout_secs: config.request_timeout_secs,
            client,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_auth(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.with_auth(self.client.post(format!("{}{path}", self.base_url)))
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }

    fn map_send_err(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout_secs)
        } else {
            ApiError::Network(e.to_string())
        }
    }

    /// Map a non-success response to the error taxonomy.
    ///
    /// 409 is the structured conflict signal. Some deployments still answer
    /// 4xx with an "already ..." message body instead; that substring check
    /// lives here, at the boundary, and nowhere else.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == 409 {
            return Err(ApiError::Conflict(body));
        }
        if (400..500).contains(&status) && body.to_lowercase().contains("already") {
            return Err(ApiError::Conflict(body));
        }
        Err(ApiError::Http {
            status,
            message: body,
        })
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = req.send().await.map_err(|e| self.map_send_err(e))?;
        self.check(response).await
    }

    async fn send_json<B: Serialize>(
        &self,
        req: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        self.send(req.json(body)).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl AssessmentApi for HttpAssessmentApi {
    async fn list_sections(&self, attempt_id: Option<i64>) -> Result<SectionListing, ApiError> {
        let mut req = self.get("/api/assessment/sections");
        if let Some(id) = attempt_id {
            req = req.query(&[("attempt_id", id)]);
        }
        let response = self.send(req).await?;
        Ok(decode::<SectionsEnvelope>(response).await?.into_listing())
    }

    async fn start_attempt(&self) -> Result<Attempt, ApiError> {
        let response = self.send(self.post("/api/assessment/attempts")).await?;
        Ok(decode::<AttemptCreated>(response).await?.into_attempt())
    }

    async fn fetch_questions(
        &self,
        attempt_id: i64,
        section_id: i64,
    ) -> Result<Vec<Question>, ApiError> {
        let path =
            format!("/api/assessment/attempts/{attempt_id}/sections/{section_id}/questions");
        let response = self.send(self.get(&path)).await?;
        Ok(decode::<QuestionsEnvelope>(response).await?.into_questions())
    }

    async fn start_section(
        &self,
        attempt_id: i64,
        section_id: i64,
    ) -> Result<TimerState, ApiError> {
        self.timer_action(attempt_id, section_id, "start").await
    }

    async fn pause_section(
        &self,
        attempt_id: i64,
        section_id: i64,
    ) -> Result<TimerState, ApiError> {
        self.timer_action(attempt_id, section_id, "pause").await
    }

    async fn resume_section(
        &self,
        attempt_id: i64,
        section_id: i64,
    ) -> Result<TimerState, ApiError> {
        self.timer_action(attempt_id, section_id, "resume").await
    }

    async fn submit_section(&self, request: &SubmitSectionRequest) -> Result<(), ApiError> {
        let path = format!(
            "/api/assessment/attempts/{}/sections/{}/submit",
            request.attempt_id, request.section_id
        );
        tracing::debug!(
            section_id = request.section_id,
            answers = request.answers.len(),
            "submitting section"
        );
        self.send_json(self.post(&path), request).await?;
        Ok(())
    }

    async fn record_answer(
        &self,
        attempt_id: i64,
        question_id: i64,
        selected_option: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/api/assessment/attempts/{attempt_id}/answers");
        let body = json!({
            "attempt_id": attempt_id,
            "question_id": question_id,
            "selected_option": selected_option,
        });
        self.send_json(self.post(&path), &body).await?;
        Ok(())
    }

    async fn fetch_progress(&self, attempt_id: i64) -> Result<ProgressSnapshot, ApiError> {
        let path = format!("/api/assessment/attempts/{attempt_id}/progress");
        let response = self.send(self.get(&path)).await?;
        Ok(decode::<WireSnapshot>(response).await?.into_snapshot())
    }

    async fn complete_attempt(
        &self,
        attempt_id: i64,
        auto_submitted: bool,
    ) -> Result<(), ApiError> {
        let path = format!("/api/assessment/attempts/{attempt_id}/complete");
        let body = json!({ "auto_submitted": auto_submitted });
        self.send_json(self.post(&path), &body).await?;
        Ok(())
    }
}

impl HttpAssessmentApi {
    async fn timer_action(
        &self,
        attempt_id: i64,
        section_id: i64,
        action: &str,
    ) -> Result<TimerState, ApiError> {
        let path =
            format!("/api/assessment/attempts/{attempt_id}/sections/{section_id}/{action}");
        let response = self.send(self.post(&path)).await?;
        Ok(decode::<WireTimer>(response).await?.into_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> HttpAssessmentApi {
        HttpAssessmentApi::new(&ClientConfig {
            base_url: server.uri(),
            auth_token: Some("test-token".into()),
            request_timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn list_sections_bare_array() {
        let server = MockServer::start().await;
        let body = serde_json::json!([
            {"id": 1, "order_index": 1, "name": "Verbal", "question_count": 5,
             "time_limit_seconds": 300, "status": "NOT_STARTED"}
        ]);

        Mock::given(method("GET"))
            .and(path("/api/assessment/sections"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let listing = api_for(&server).list_sections(None).await.unwrap();
        assert!(listing.can_attempt);
        assert_eq!(listing.sections.len(), 1);
        assert_eq!(listing.sections[0].name, "Verbal");
    }

    #[tokio::test]
    async fn list_sections_wrapped_with_attempt_scope() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "attempt_id": 12,
            "can_attempt": false,
            "sections": []
        });

        Mock::given(method("GET"))
            .and(path("/api/assessment/sections"))
            .and(query_param("attempt_id", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let listing = api_for(&server).list_sections(Some(12)).await.unwrap();
        assert!(!listing.can_attempt);
        assert_eq!(listing.attempt_id, Some(12));
    }

    #[tokio::test]
    async fn submit_conflict_maps_to_conflict_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/assessment/attempts/1/sections/2/submit"))
            .respond_with(ResponseTemplate::new(409).set_body_string("section already submitted"))
            .mount(&server)
            .await;

        let request = SubmitSectionRequest {
            attempt_id: 1,
            section_id: 2,
            answers: vec![],
        };
        let err = api_for(&server).submit_section(&request).await.unwrap_err();
        assert!(err.is_conflict(), "got: {err}");
    }

    #[tokio::test]
    async fn legacy_400_already_body_maps_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/assessment/attempts/1/sections/2/start"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("Section already started for attempt"),
            )
            .mount(&server)
            .await;

        let err = api_for(&server).start_section(1, 2).await.unwrap_err();
        assert!(err.is_conflict(), "got: {err}");
    }

    #[tokio::test]
    async fn start_attempt_decodes_attempt_with_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/assessment/attempts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "attempt_id": 14,
                "created_at": "2026-08-30T09:15:00Z"
            })))
            .mount(&server)
            .await;

        let attempt = api_for(&server).start_attempt().await.unwrap();
        assert_eq!(attempt.id, 14);
        assert!(attempt.started_at.is_some());
    }

    #[tokio::test]
    async fn server_error_maps_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/assessment/attempts"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let err = api_for(&server).start_attempt().await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }), "got: {err}");
    }

    #[tokio::test]
    async fn pause_returns_authoritative_remaining_time() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/assessment/attempts/1/sections/2/pause"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "remaining_time_seconds": 87,
                "is_paused": true
            })))
            .mount(&server)
            .await;

        let state = api_for(&server).pause_section(1, 2).await.unwrap();
        assert_eq!(state.remaining_seconds, 87);
        assert!(state.is_paused);
    }

    #[tokio::test]
    async fn progress_snapshot_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/assessment/attempts/7/progress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "IN_PROGRESS",
                "current_section": {"id": 3},
                "current_question_index": 2,
                "answers": [{"question_id": 41, "selected_option": "D"}],
                "remaining_time_seconds": 250,
                "is_paused": false
            })))
            .mount(&server)
            .await;

        let snapshot = api_for(&server).fetch_progress(7).await.unwrap();
        assert_eq!(snapshot.current_section_id, Some(3));
        assert_eq!(snapshot.current_question_index, 2);
        assert_eq!(snapshot.answers.get(&41).unwrap(), "D");
        assert_eq!(snapshot.remaining_time_seconds, 250);
    }

    #[tokio::test]
    async fn questions_normalized_through_option_parser() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/assessment/attempts/1/sections/2/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "questions": [
                    {"id": 9, "text": "Agree?", "type": "likert",
                     "options": "A) Strongly Disagree, B) Disagree, C) Neutral, D) Agree, E) Strongly Agree"},
                    {"id": 10, "text": "Pick", "type": "multiple_choice",
                     "options": [{"key": "a", "label": "One"}, {"key": "b", "label": "Two"}]}
                ]
            })))
            .mount(&server)
            .await;

        let questions = api_for(&server).fetch_questions(1, 2).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].options.len(), 5);
        assert_eq!(questions[1].options[0].key, "A");
    }
}
