//! Assembles the generation prompt.
//!
//! The section order is fixed: persona and ethics preamble, recalled context,
//! the user message, the urgency alert, then local facts. The exact bytes
//! matter because the response cache is keyed on them.

use crate::llm::ETHICS_DISCLAIMER;

/// Everything the prompt is built from, gathered before generation starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptRequest {
    /// Recalled session context, empty when there is none.
    pub context: String,
    pub message: String,
    pub local_facts: Vec<String>,
    pub urgency_note: Option<String>,
}

impl PromptRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(&self, request: &PromptRequest) -> String {
        let mut prompt = format!(
            "\nYou are DoctorAI, a virtual cardiologist. Follow WHO 2025 AI Ethics: Be transparent, empathetic, equitable. Use simple English. NEVER diagnose—say 'possible' or 'suggest consulting'.\n\
             If emergent, prioritize safety over advice.\n\
             End EVERY response with the following disclaimer: {}\n\n\
             {}\n\
             User: {}\n",
            ETHICS_DISCLAIMER, request.context, request.message
        );

        if let Some(note) = request.urgency_note.as_deref().filter(|n| !n.is_empty()) {
            prompt.push_str(&format!(
                "\nURGENCY ALERT: {}\nInclude this prominently at the beginning of your response to ensure user safety.",
                note
            ));
        }

        if !request.local_facts.is_empty() {
            prompt.push_str(&format!(
                "\nRELEVANT DATA FROM LOCAL DB/WHO/SYMPTOM MATCHES:\n{}\nIncorporate this information accurately into your response to provide comprehensive guidance.",
                request.local_facts.join("\n")
            ));
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_prompt_ends_with_user_line() {
        let prompt = PromptBuilder.build(&PromptRequest::new("Is coffee bad for my heart?"));

        assert!(prompt.starts_with("\nYou are DoctorAI, a virtual cardiologist."));
        assert!(prompt.contains(ETHICS_DISCLAIMER));
        assert!(prompt.ends_with("\n\n\nUser: Is coffee bad for my heart?\n"));
        assert!(!prompt.contains("URGENCY ALERT"));
        assert!(!prompt.contains("RELEVANT DATA"));
    }

    #[test]
    fn sections_follow_fixed_order() {
        let request = PromptRequest {
            context: "Earlier you asked: 'palpitations at night'".into(),
            message: "chest pain now".into(),
            local_facts: vec!["Symptom matcher: a".into(), "WHO data: b".into()],
            urgency_note: Some("call now\nReason: r".into()),
        };
        let prompt = PromptBuilder.build(&request);

        let context = prompt.find("Earlier you asked").unwrap();
        let user = prompt.find("User: chest pain now").unwrap();
        let alert = prompt.find("URGENCY ALERT: call now\nReason: r").unwrap();
        let data = prompt.find("MATCHES:\nSymptom matcher: a\nWHO data: b\nIncorporate").unwrap();
        assert!(context < user && user < alert && alert < data);
    }

    #[test]
    fn prompt_is_deterministic() {
        let request = PromptRequest {
            local_facts: vec!["Local DB info: x".into()],
            ..PromptRequest::new("hi")
        };
        assert_eq!(PromptBuilder.build(&request), PromptBuilder.build(&request.clone()));
    }
}
