//! The `ask` operation: consent handling, enrichment and generation for one message.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache_management::ResponseCache;
use crate::config::Config;
use crate::context_engine::ContextOrchestrator;
use crate::knowledge::{KnowledgeBase, LocalKnowledgeMatcher};
use crate::llm::generation::inject_ethics;
use crate::llm::{DeliveryMode, GenerationBackend, GenerationClient, GenerationOutput, LLMWorker};
use crate::session::{AuditLogger, SessionManager};
use crate::state_db::{DatabaseStats, StateDatabase};
use crate::urgency::UrgencyClassifier;

pub fn empty_message_reply() -> String {
    inject_ethics("Please enter a message.")
}

pub fn consent_prompt() -> String {
    inject_ethics(
        "Welcome! Before we start, do you consent to anonymous chat history for better context? \
         (Yes/No) This helps me remember symptoms safely. Reply 'Yes' to proceed.",
    )
}

pub fn consent_acknowledgment() -> String {
    inject_ethics("Consent noted. How can I help with your heart health today?")
}

/// What `ask` hands back. None of these is an error.
#[derive(Debug)]
pub enum AskOutcome {
    EmptyMessage(String),
    /// The session has not consented and the message was not a yes.
    ConsentRequired(String),
    ConsentGranted(String),
    Answer(GenerationOutput),
}

pub struct TriageService {
    sessions: SessionManager,
    orchestrator: ContextOrchestrator,
    generation: GenerationClient,
    knowledge: Arc<KnowledgeBase>,
    db: Arc<StateDatabase>,
}

impl TriageService {
    /// Opens the state database, loads the emergency patterns and connects
    /// the HTTP generation backend.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let db = Arc::new(StateDatabase::new(&cfg.state_db_path)?);
        let knowledge = Arc::new(KnowledgeBase::from_config(cfg));
        let backend: Arc<dyn GenerationBackend> = Arc::new(LLMWorker::from_config(cfg));
        Self::assemble(cfg, backend, db, knowledge)
    }

    pub fn assemble(
        cfg: &Config,
        backend: Arc<dyn GenerationBackend>,
        db: Arc<StateDatabase>,
        knowledge: Arc<KnowledgeBase>,
    ) -> anyhow::Result<Self> {
        let classifier = Arc::new(UrgencyClassifier::from_config(Arc::clone(&backend), cfg)?);
        let sessions = SessionManager::new(Arc::clone(&db));
        let orchestrator = ContextOrchestrator::new(
            LocalKnowledgeMatcher::new(Arc::clone(&knowledge)),
            classifier,
            sessions.clone(),
            AuditLogger::new(Arc::clone(&db)),
        );
        let cache = Arc::new(ResponseCache::new(
            Arc::clone(&db),
            Duration::from_secs(cfg.cache_ttl_seconds),
        ));
        let generation = GenerationClient::from_config(backend, cache, cfg);

        info!("Triage service ready");
        Ok(Self { sessions, orchestrator, generation, knowledge, db })
    }

    pub async fn ask(&self, session_id: &str, message: &str, mode: DeliveryMode) -> AskOutcome {
        if message.trim().is_empty() {
            return AskOutcome::EmptyMessage(empty_message_reply());
        }

        if !self.sessions.has_consent(session_id) {
            return if SessionManager::is_affirmative(message) {
                self.sessions.grant_consent(session_id);
                AskOutcome::ConsentGranted(consent_acknowledgment())
            } else {
                debug!("Session {} asked for consent", session_id);
                self.sessions.deny_consent(session_id);
                AskOutcome::ConsentRequired(consent_prompt())
            };
        }

        let prepared = self.orchestrator.prepare(session_id, message).await;
        AskOutcome::Answer(self.generation.generate(&prepared.request, mode).await)
    }

    pub fn revoke_consent(&self, session_id: &str) -> anyhow::Result<usize> {
        self.sessions.revoke_consent(session_id)
    }

    pub fn backend_endpoint(&self) -> &str {
        self.generation.backend().endpoint()
    }

    pub fn model(&self) -> &str {
        self.generation.backend().model()
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub fn stats(&self) -> anyhow::Result<DatabaseStats> {
        self.db.get_stats()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::knowledge::test_support::write_reference_data;
    use crate::llm::test_support::ScriptedBackend;

    pub struct TestService {
        pub _dir: tempfile::TempDir,
        pub backend: Arc<ScriptedBackend>,
        pub service: Arc<TriageService>,
    }

    pub fn service() -> TestService {
        let dir = tempfile::tempdir().unwrap();
        let knowledge = Arc::new(KnowledgeBase::new(
            write_reference_data(dir.path()),
            Duration::from_secs(60),
        ));
        let db = Arc::new(StateDatabase::new_in_memory().unwrap());
        let backend = Arc::new(ScriptedBackend::default());
        let service =
            TriageService::assemble(&Config::default(), backend.clone(), db, knowledge).unwrap();
        TestService { _dir: dir, backend, service: Arc::new(service) }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::service;
    use super::*;
    use crate::llm::test_support::ScriptedBackend;
    use crate::llm::ETHICS_DISCLAIMER;

    async fn answer_text(outcome: AskOutcome) -> String {
        match outcome {
            AskOutcome::Answer(output) => output.into_text().await,
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_message_is_rejected_politely() {
        let t = service();
        match t.service.ask("s", "   ", DeliveryMode::Complete).await {
            AskOutcome::EmptyMessage(text) => {
                assert_eq!(text, format!("Please enter a message.\n\n{}", ETHICS_DISCLAIMER));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn consent_is_requested_before_anything_else() {
        let t = service();

        let outcome = t.service.ask("s", "I have had chest pain for 10 minutes", DeliveryMode::Complete).await;
        assert!(matches!(outcome, AskOutcome::ConsentRequired(ref text) if text.starts_with("Welcome!")));
        assert_eq!(t.backend.calls(), 0);

        let outcome = t.service.ask("s", " Yes ", DeliveryMode::Complete).await;
        assert!(matches!(outcome, AskOutcome::ConsentGranted(ref text) if text.starts_with("Consent noted.")));
        assert_eq!(t.backend.calls(), 0);
    }

    #[tokio::test]
    async fn consented_question_is_answered_with_disclaimer() {
        let t = service();
        t.service.ask("s", "yes", DeliveryMode::Complete).await;
        t.backend.push_completion(Ok("Keep sodium low.".into()));

        let text = answer_text(t.service.ask("s", "how much salt is ok", DeliveryMode::Complete).await).await;
        assert_eq!(text, inject_ethics("Keep sodium low."));

        let prompt = &t.backend.requests()[0].prompt;
        assert!(prompt.contains("User: how much salt is ok\n"));
        assert!(prompt.contains("Local DB info: Keep sodium under 2,300 mg a day."));
    }

    #[tokio::test]
    async fn emergency_alert_precedes_generation() {
        let t = service();
        t.service.ask("s", "y", DeliveryMode::Incremental).await;
        t.backend.push_completion(Ok("LEVEL 1: possible cardiac event. Confidence: HIGH".into()));
        t.backend.push_stream(Ok(ScriptedBackend::text_events(&["Call ", "now."])));

        let text = answer_text(
            t.service.ask("s", "I have had chest pain for 10 minutes", DeliveryMode::Incremental).await,
        )
        .await;
        assert_eq!(text, inject_ethics("Call now."));

        let requests = t.backend.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].prompt.contains("Symptoms: I have had chest pain for 10 minutes"));
        assert!(requests[1].prompt.contains("\nURGENCY ALERT: 🚨 EMERGENCY! Call 108"));
    }

    #[tokio::test]
    async fn revoked_session_must_consent_again() {
        let t = service();
        t.service.ask("s", "yes", DeliveryMode::Complete).await;
        t.service.revoke_consent("s").unwrap();

        let outcome = t.service.ask("s", "hello", DeliveryMode::Complete).await;
        assert!(matches!(outcome, AskOutcome::ConsentRequired(_)));
    }
}
