// cardio-triage/crates/cardio-triage/src/lib.rs

pub mod api;
pub mod cache_management;
pub mod config;
pub mod context_engine;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shared_state;
pub mod state_db;
pub mod telemetry;
pub mod triage_service;
pub mod urgency;
pub mod utils;

pub use config::Config;
pub use llm::{DeliveryMode, GenerationBackend, GenerationOutput, LLMWorker, ETHICS_DISCLAIMER};
pub use server::{build_router, run_server};
pub use triage_service::{AskOutcome, TriageService};
pub use urgency::{UrgencyLevel, UrgencyResult};
