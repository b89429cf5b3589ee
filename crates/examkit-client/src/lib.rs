//! examkit-client: talking to the LMS backend.
//!
//! Provides [`HttpBackend`], the REST implementation of
//! [`ExamBackend`](examkit_core::traits::ExamBackend), together with the
//! [`AuthSession`] it authenticates through and the key-value stores that
//! session can live in.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod store;

pub use auth::{AuthSession, User};
pub use config::{load_config, load_config_from, ClientConfig};
pub use error::StoreError;
pub use http::HttpBackend;
pub use mock::MockBackend;
pub use store::{FileStore, KeyValueStore, MemoryStore};
