//! Request enrichment: local facts, urgency, recalled context, prompt assembly

pub mod orchestrator;
pub mod prompt_builder;

pub use orchestrator::{ContextOrchestrator, PreparedContext};
pub use prompt_builder::{PromptBuilder, PromptRequest};
