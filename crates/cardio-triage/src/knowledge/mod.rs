//! Read-only cardiology reference data
//!
//! FAQ pairs, tips, the clinic directory, the symptom map and WHO facts are
//! plain JSON documents on disk. They are loaded into one immutable snapshot
//! that is cached in-process and reloaded after the refresh interval, so edits
//! to the files show up without a restart. A document that is missing or
//! corrupt loads as empty; it never fails a request.

pub mod matcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::KnowledgeError;

pub use matcher::{AnswerSource, LocalAnswer, LocalKnowledgeMatcher};

#[derive(Debug, Clone)]
pub struct KnowledgePaths {
    pub faq: PathBuf,
    pub tips: PathBuf,
    pub clinics: PathBuf,
    pub symptoms: PathBuf,
    pub who_facts: PathBuf,
}

impl KnowledgePaths {
    pub fn new(local_db: &Path, who_facts: &Path) -> Self {
        Self {
            faq: local_db.join("cardio_faq.json"),
            tips: local_db.join("cardio_tips.json"),
            clinics: local_db.join("clinics.json"),
            symptoms: local_db.join("symptom_disease_map.json"),
            who_facts: who_facts.to_path_buf(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.local_db_path, &cfg.who_data_path)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Clinic {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Every reference document, in file order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeSnapshot {
    pub faq: Vec<(String, String)>,
    pub tips: Vec<(String, String)>,
    pub clinics: Vec<Clinic>,
    pub symptoms: Vec<(String, Vec<String>)>,
    pub who_facts: Vec<(String, String)>,
}

impl KnowledgeSnapshot {
    pub fn load(paths: &KnowledgePaths) -> Self {
        let snapshot = Self {
            faq: or_empty(load_text_map(&paths.faq)),
            tips: or_empty(load_text_map(&paths.tips)),
            clinics: or_empty(load_clinics(&paths.clinics)),
            symptoms: or_empty(load_symptom_map(&paths.symptoms)),
            who_facts: or_empty(load_text_map(&paths.who_facts)),
        };
        info!(
            "Loaded reference data: {} FAQ, {} tips, {} clinics, {} symptoms, {} WHO facts",
            snapshot.faq.len(),
            snapshot.tips.len(),
            snapshot.clinics.len(),
            snapshot.symptoms.len(),
            snapshot.who_facts.len()
        );
        snapshot
    }
}

/// The explicit default for an unusable document.
fn or_empty<T: Default>(loaded: Result<T, KnowledgeError>) -> T {
    match loaded {
        Ok(value) => value,
        Err(KnowledgeError::Missing(path)) => {
            debug!("Reference document {} not present, treating as empty", path.display());
            T::default()
        }
        Err(e) => {
            warn!("{}; treating as empty", e);
            T::default()
        }
    }
}

fn read_document(path: &Path) -> Result<Value, KnowledgeError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            KnowledgeError::Missing(path.to_path_buf())
        } else {
            KnowledgeError::Unreadable { path: path.to_path_buf(), source }
        }
    })?;
    serde_json::from_str(&raw).map_err(|source| KnowledgeError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn read_object(path: &Path) -> Result<Map<String, Value>, KnowledgeError> {
    serde_json::from_value(read_document(path)?).map_err(|source| KnowledgeError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn load_text_map(path: &Path) -> Result<Vec<(String, String)>, KnowledgeError> {
    Ok(read_object(path)?
        .into_iter()
        .map(|(key, value)| (key, value_text(value)))
        .collect())
}

fn load_symptom_map(path: &Path) -> Result<Vec<(String, Vec<String>)>, KnowledgeError> {
    Ok(read_object(path)?
        .into_iter()
        .map(|(symptom, conditions)| {
            let conditions = match conditions {
                Value::Array(items) => items.into_iter().map(value_text).collect(),
                single => vec![value_text(single)],
            };
            (symptom, conditions)
        })
        .collect())
}

fn load_clinics(path: &Path) -> Result<Vec<Clinic>, KnowledgeError> {
    serde_json::from_value(read_document(path)?).map_err(|source| KnowledgeError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Reference data with a timed in-process cache in front of the files.
pub struct KnowledgeBase {
    paths: KnowledgePaths,
    snapshots: Cache<(), Arc<KnowledgeSnapshot>>,
}

impl KnowledgeBase {
    pub fn new(paths: KnowledgePaths, refresh: Duration) -> Self {
        Self {
            paths,
            snapshots: Cache::builder()
                .max_capacity(1)
                .time_to_live(refresh)
                .build(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            KnowledgePaths::from_config(cfg),
            Duration::from_secs(cfg.knowledge_refresh_seconds),
        )
    }

    pub fn snapshot(&self) -> Arc<KnowledgeSnapshot> {
        self.snapshots
            .get_with((), || Arc::new(KnowledgeSnapshot::load(&self.paths)))
    }

    /// Forces the next `snapshot` to re-read the files.
    pub fn invalidate(&self) {
        self.snapshots.invalidate(&());
    }
}
