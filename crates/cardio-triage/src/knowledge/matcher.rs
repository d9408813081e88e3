//! Answers a question from the local reference data, without touching the network.

use std::sync::Arc;

use super::{KnowledgeBase, KnowledgeSnapshot};
use crate::utils::TextUtils;

/// FAQ matches must score strictly above this.
pub const FAQ_SCORE_THRESHOLD: u8 = 60;
pub const TIP_CONFIDENCE: f32 = 0.8;
pub const CLINIC_CONFIDENCE: f32 = 0.7;
pub const WHO_CONFIDENCE: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Faq,
    Tip,
    ClinicDirectory,
    WhoFacts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalAnswer {
    pub answer: String,
    pub confidence: f32,
    pub source: AnswerSource,
}

impl KnowledgeSnapshot {
    /// FAQ by fuzzy score, then tip keywords, then the clinic directory.
    pub fn match_question(&self, question: &str) -> Option<LocalAnswer> {
        let q_lower = question.to_lowercase();

        let mut best: Option<(&str, u8)> = None;
        for (key, answer) in &self.faq {
            let score = TextUtils::similarity_ratio(key, &q_lower);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((answer.as_str(), score));
            }
        }
        if let Some((answer, score)) = best {
            if score > FAQ_SCORE_THRESHOLD {
                return Some(LocalAnswer {
                    answer: answer.to_string(),
                    confidence: f32::from(score) / 100.0,
                    source: AnswerSource::Faq,
                });
            }
        }

        if let Some((_, tip)) = self.tips.iter().find(|(key, _)| q_lower.contains(key.as_str())) {
            return Some(LocalAnswer {
                answer: tip.clone(),
                confidence: TIP_CONFIDENCE,
                source: AnswerSource::Tip,
            });
        }

        if q_lower.contains("clinic") || q_lower.contains("hospital") {
            let listing: Vec<String> = self
                .clinics
                .iter()
                .map(|c| format!("{} ({})", c.name, c.phone.as_deref().unwrap_or("N/A")))
                .collect();
            return Some(LocalAnswer {
                answer: format!("Here are some local cardiology clinics: {}", listing.join(", ")),
                confidence: CLINIC_CONFIDENCE,
                source: AnswerSource::ClinicDirectory,
            });
        }

        None
    }

    /// Every symptom phrase found in the question, with its candidate conditions.
    pub fn match_symptoms(&self, question: &str) -> Option<String> {
        let q_lower = question.to_lowercase();
        let lines: Vec<String> = self
            .symptoms
            .iter()
            .filter(|(symptom, _)| q_lower.contains(symptom.as_str()))
            .map(|(symptom, conditions)| {
                format!("'{}': possible -> {}", symptom, conditions.join(", "))
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("; "))
        }
    }

    /// First WHO fact whose key occurs in the question.
    pub fn match_who(&self, question: &str) -> Option<LocalAnswer> {
        let q_lower = question.to_lowercase();
        self.who_facts
            .iter()
            .find(|(key, _)| q_lower.contains(key.as_str()))
            .map(|(_, info)| LocalAnswer {
                answer: info.clone(),
                confidence: WHO_CONFIDENCE,
                source: AnswerSource::WhoFacts,
            })
    }
}

/// Matcher over the current reference snapshot.
#[derive(Clone)]
pub struct LocalKnowledgeMatcher {
    knowledge: Arc<KnowledgeBase>,
}

impl LocalKnowledgeMatcher {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    pub fn match_question(&self, question: &str) -> Option<LocalAnswer> {
        self.knowledge.snapshot().match_question(question)
    }

    pub fn match_symptoms(&self, question: &str) -> Option<String> {
        self.knowledge.snapshot().match_symptoms(question)
    }

    pub fn match_who(&self, question: &str) -> Option<LocalAnswer> {
        self.knowledge.snapshot().match_who(question)
    }

    /// Labelled facts for the prompt: symptoms, then local answer, then WHO.
    /// All three read the same snapshot.
    pub fn collect_facts(&self, question: &str) -> Vec<String> {
        let snapshot = self.knowledge.snapshot();
        let mut facts = Vec::new();

        if let Some(symptoms) = snapshot.match_symptoms(question) {
            facts.push(format!("Symptom matcher: {}", symptoms));
        }
        if let Some(local) = snapshot.match_question(question) {
            facts.push(format!("Local DB info: {}", local.answer));
        }
        if let Some(who) = snapshot.match_who(question) {
            facts.push(format!("WHO data: {}", who.answer));
        }
        facts
    }
}
