//! examsit-core — Session orchestration for multi-section timed assessments.
//!
//! This crate defines the data model, the remote-authority contract, and
//! the client-side state machine that drives section sequencing, the
//! predictive timer, single-flight finalization, and crash recovery.

pub mod api;
pub mod catalog;
pub mod error;
pub mod model;
pub mod options;
pub mod session;
pub mod timer;
