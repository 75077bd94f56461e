//! examsit-client — Remote-authority adapters for examsit.
//!
//! Implements [`examsit_core::api::AssessmentApi`] over HTTP, plus an
//! in-memory mock server for tests and the client configuration loader.

pub mod config;
pub mod http;
pub mod mock;
mod wire;

pub use config::{load_config, load_config_from, ClientConfig};
pub use http::HttpAssessmentApi;
pub use mock::MockAssessmentApi;
