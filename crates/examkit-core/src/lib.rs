//! examkit-core: exam content, scoring, and timed sessions.
//!
//! This crate holds the data model, the content parser for both exam
//! encodings, the answer evaluator, the session state machine and its async
//! controller, and the [`ExamBackend`](traits::ExamBackend) trait that
//! transports implement.

pub mod authoring;
pub mod controller;
pub mod error;
pub mod evaluator;
mod markdown;
pub mod model;
pub mod parser;
pub mod review;
pub mod session;
pub mod traits;
