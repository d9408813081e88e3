//! State handed to every HTTP handler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::triage_service::TriageService;

/// Request counters kept in-process, alongside the Prometheus ones.
#[derive(Debug, Default)]
pub struct AtomicCounters {
    pub total_requests: AtomicUsize,
    pub answered_messages: AtomicUsize,
    pub consent_prompts: AtomicUsize,
}

impl AtomicCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_total_requests(&self) -> usize {
        self.total_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_answered_messages(&self) -> usize {
        self.answered_messages.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_consent_prompts(&self) -> usize {
        self.consent_prompts.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Clone)]
pub struct UnifiedAppState {
    pub triage: Arc<TriageService>,
    pub counters: Arc<AtomicCounters>,
    pub config: Arc<Config>,
}

impl UnifiedAppState {
    pub fn new(triage: Arc<TriageService>, config: Config) -> Self {
        Self {
            triage,
            counters: Arc::new(AtomicCounters::new()),
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_return_new_value() {
        let counters = AtomicCounters::new();
        assert_eq!(counters.inc_total_requests(), 1);
        assert_eq!(counters.inc_total_requests(), 2);
        assert_eq!(counters.inc_consent_prompts(), 1);
        assert_eq!(counters.answered_messages.load(Ordering::Relaxed), 0);
    }
}
