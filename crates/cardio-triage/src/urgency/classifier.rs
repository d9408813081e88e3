use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{EmergencyPatternSet, UrgencyLevel, UrgencyResult};
use crate::config::Config;
use crate::llm::{BackendRequest, GenerationBackend, SamplingOptions};
use crate::metrics;

/// Two-stage urgency triage.
///
/// The pattern gate is local and cheap. Only when it fires is the backend
/// asked for a level, and any failure there falls back to non-urgent so the
/// request carries on.
pub struct UrgencyClassifier {
    backend: Arc<dyn GenerationBackend>,
    patterns: EmergencyPatternSet,
    emergency_number: String,
    options: SamplingOptions,
    timeout: Duration,
}

impl UrgencyClassifier {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        patterns: EmergencyPatternSet,
        emergency_number: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            patterns,
            emergency_number: emergency_number.into(),
            options: SamplingOptions { temperature, top_p: None },
            timeout,
        }
    }

    pub fn from_config(backend: Arc<dyn GenerationBackend>, cfg: &Config) -> anyhow::Result<Self> {
        let patterns = EmergencyPatternSet::load(cfg.emergency_patterns_path.as_deref())?;
        Ok(Self::new(
            backend,
            patterns,
            cfg.emergency_number.clone(),
            cfg.classify_temperature,
            Duration::from_secs(cfg.classify_timeout_seconds),
        ))
    }

    pub fn is_potential_emergency(&self, message: &str) -> bool {
        let hit = self.patterns.is_match(message);
        if hit {
            debug!("Emergency gate fired: {:?}", self.patterns.matching_categories(message));
        }
        hit
    }

    fn classification_prompt(&self, message: &str) -> String {
        format!(
            concat!(
                "\n",
                "    Based on AHA 2025 Cardiac Emergency Guidelines, classify this symptom as:\n",
                "    - Level 1: IMMEDIATE EMERGENCY (e.g., persistent chest pain >5 mins, SOB with sweating → Call {number}/ER NOW).\n",
                "    - Level 2: URGENT (e.g., new palpitations → See doctor within 24h).\n",
                "    - Level 3: NON-URGENT (general advice).\n",
                "    \n",
                "    Symptoms: {message}\n",
                "    \n",
                "    Output ONLY: LEVEL [1|2|3]: Brief reason (1 sentence). Confidence: HIGH/MED/LOW.\n",
                "    ",
            ),
            number = self.emergency_number,
            message = message
        )
    }

    /// Reads the level out of a backend reply. Anything without "LEVEL 1" or
    /// "LEVEL 2" in it is non-urgent.
    pub fn parse_classification(&self, reply: &str) -> UrgencyResult {
        let reason = reply.trim();
        let upper = reason.to_uppercase();

        if upper.contains("LEVEL 1") {
            UrgencyResult {
                level: UrgencyLevel::Emergency,
                action: format!(
                    "🚨 EMERGENCY! Call {} or go to nearest hospital IMMEDIATELY. Do not wait.",
                    self.emergency_number
                ),
                confidence: 1.0,
                reason: reason.to_string(),
            }
        } else if upper.contains("LEVEL 2") {
            UrgencyResult {
                level: UrgencyLevel::Urgent,
                action: "⚠️ URGENT: Contact a doctor or clinic within 24 hours.".to_string(),
                confidence: 0.8,
                reason: reason.to_string(),
            }
        } else {
            UrgencyResult::non_urgent()
        }
    }

    /// Asks the backend for a level. Never fails.
    pub async fn classify_urgency(&self, message: &str) -> UrgencyResult {
        let request = BackendRequest {
            prompt: self.classification_prompt(message),
            options: self.options,
            timeout: self.timeout,
        };

        match self.backend.complete(&request).await {
            Ok(reply) => self.parse_classification(&reply),
            Err(e) => {
                warn!("Urgency classification failed, assuming non-urgent: {}", e);
                metrics::inc_backend_failure(e.kind());
                UrgencyResult::non_urgent()
            }
        }
    }

    /// Gate, then classify if the gate fired.
    pub async fn assess(&self, message: &str) -> UrgencyResult {
        let result = if self.is_potential_emergency(message) {
            self.classify_urgency(message).await
        } else {
            UrgencyResult::non_urgent()
        };

        metrics::inc_urgency(result.level.as_u8());
        if result.level != UrgencyLevel::NonUrgent {
            info!("Message classified as urgency level {}", result.level.as_u8());
        }
        result
    }
}
