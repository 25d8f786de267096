//! services/engine/src/lib.rs
//!
//! The transactional story engine. The calling layer (routing, auth, upload
//! plumbing) talks to [`Engine`]; everything below it runs on an explicit
//! per-operation [`context::RequestContext`].

pub mod config;
pub mod context;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod ops;
pub mod repo;
pub mod seed;

pub use config::Config;
pub use context::{Caller, RequestContext};
pub use coordinator::within_transaction;
pub use engine::Engine;
pub use error::EngineError;
