//! Urgency triage: a local pattern gate, then a backend classification.

pub mod classifier;
pub mod patterns;

pub use classifier::UrgencyClassifier;
pub use patterns::{EmergencyPatternSet, PatternEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyLevel {
    /// Immediate emergency.
    Emergency = 1,
    /// See a doctor the same day.
    Urgent = 2,
    NonUrgent = 3,
}

impl UrgencyLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrgencyResult {
    pub level: UrgencyLevel,
    pub action: String,
    pub confidence: f32,
    /// Backend reasoning, empty for the non-urgent default.
    pub reason: String,
}

impl UrgencyResult {
    pub fn non_urgent() -> Self {
        Self {
            level: UrgencyLevel::NonUrgent,
            action: "General advice follows.".to_string(),
            confidence: 0.5,
            reason: String::new(),
        }
    }

    /// Alert text for the prompt; only levels 1 and 2 carry one.
    pub fn prompt_note(&self) -> Option<String> {
        match self.level {
            UrgencyLevel::Emergency | UrgencyLevel::Urgent => {
                Some(format!("{}\nReason: {}", self.action, self.reason))
            }
            UrgencyLevel::NonUrgent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_urgent_has_no_prompt_note() {
        let result = UrgencyResult::non_urgent();
        assert_eq!(result.level.as_u8(), 3);
        assert_eq!(result.prompt_note(), None);
    }

    #[test]
    fn urgent_note_carries_reason() {
        let result = UrgencyResult {
            level: UrgencyLevel::Urgent,
            action: "See a doctor.".into(),
            confidence: 0.8,
            reason: "LEVEL 2: new palpitations".into(),
        };
        assert_eq!(result.prompt_note().unwrap(), "See a doctor.\nReason: LEVEL 2: new palpitations");
    }
}
