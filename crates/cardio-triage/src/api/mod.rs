//! HTTP handlers

pub mod chat_api;
pub mod health_api;
pub mod session_api;

pub use chat_api::{chat, ChatRequest};
pub use health_api::health;
pub use session_api::revoke_consent;
