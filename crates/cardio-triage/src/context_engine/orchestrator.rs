use std::sync::Arc;

use tracing::debug;

use crate::context_engine::PromptRequest;
use crate::knowledge::LocalKnowledgeMatcher;
use crate::session::{AuditLogger, SessionManager};
use crate::urgency::{UrgencyClassifier, UrgencyResult};

/// Inputs for one generation, with the urgency assessment that shaped them.
#[derive(Debug, Clone)]
pub struct PreparedContext {
    pub request: PromptRequest,
    pub urgency: UrgencyResult,
}

/// Runs the enrichment steps for a consented message, in order.
pub struct ContextOrchestrator {
    matcher: LocalKnowledgeMatcher,
    classifier: Arc<UrgencyClassifier>,
    sessions: SessionManager,
    audit: AuditLogger,
}

impl ContextOrchestrator {
    pub fn new(
        matcher: LocalKnowledgeMatcher,
        classifier: Arc<UrgencyClassifier>,
        sessions: SessionManager,
        audit: AuditLogger,
    ) -> Self {
        Self { matcher, classifier, sessions, audit }
    }

    /// Facts and urgency first, since both go into the prompt. Context is
    /// recalled before the message is remembered so it always names an
    /// earlier question.
    pub async fn prepare(&self, session_id: &str, message: &str) -> PreparedContext {
        let local_facts = self.matcher.collect_facts(message);
        let urgency = self.classifier.assess(message).await;

        let context = self.sessions.recall_context(session_id);
        self.sessions.remember(session_id, message);
        self.audit.log(session_id, message, urgency.level);

        debug!(
            "Prepared context for session {}: {} facts, urgency {}, recalled {}",
            session_id,
            local_facts.len(),
            urgency.level.as_u8(),
            !context.is_empty()
        );

        PreparedContext {
            request: PromptRequest {
                context,
                message: message.to_string(),
                local_facts,
                urgency_note: urgency.prompt_note(),
            },
            urgency,
        }
    }
}
