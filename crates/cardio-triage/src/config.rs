// cardio-triage/crates/cardio-triage/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub model: String,
    pub api_host: String,
    pub api_port: u16,
    pub generate_timeout_seconds: u64,
    pub classify_timeout_seconds: u64,
    pub generation_temperature: f32,
    pub generation_top_p: f32,
    pub classify_temperature: f32,
    pub local_db_path: PathBuf,
    pub who_data_path: PathBuf,
    pub state_db_path: PathBuf,
    pub emergency_patterns_path: Option<PathBuf>,
    pub emergency_number: String,
    pub cache_ttl_seconds: u64,
    pub cache_error_responses: bool,
    pub knowledge_refresh_seconds: u64,
    pub max_concurrent_requests: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:11434/api/generate".to_string(),
            model: "llama3:8b".to_string(),
            api_host: "0.0.0.0".to_string(),
            api_port: 5000,
            generate_timeout_seconds: 60,
            classify_timeout_seconds: 10,
            generation_temperature: 0.2,
            generation_top_p: 0.9,
            classify_temperature: 0.1,
            local_db_path: PathBuf::from("local_db"),
            who_data_path: PathBuf::from("data_sources/who_cardiology_data.json"),
            state_db_path: PathBuf::from("local_db/state.db"),
            emergency_patterns_path: None,
            emergency_number: "108".to_string(),
            cache_ttl_seconds: 3600,
            cache_error_responses: false,
            knowledge_refresh_seconds: 30,
            max_concurrent_requests: 32,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let defaults = Self::default();

        let emergency_patterns_path = env::var("EMERGENCY_PATTERNS_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            backend_url: env::var("OLLAMA_URL").unwrap_or(defaults.backend_url),
            model: env::var("OLLAMA_MODEL").unwrap_or(defaults.model),
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_var("API_PORT", defaults.api_port)?,
            generate_timeout_seconds: parse_var(
                "GENERATE_TIMEOUT_SECONDS",
                defaults.generate_timeout_seconds,
            )?,
            classify_timeout_seconds: parse_var(
                "CLASSIFY_TIMEOUT_SECONDS",
                defaults.classify_timeout_seconds,
            )?,
            generation_temperature: parse_var(
                "GENERATION_TEMPERATURE",
                defaults.generation_temperature,
            )?,
            generation_top_p: parse_var("GENERATION_TOP_P", defaults.generation_top_p)?,
            classify_temperature: parse_var("CLASSIFY_TEMPERATURE", defaults.classify_temperature)?,
            local_db_path: env::var("LOCAL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_db_path),
            who_data_path: env::var("WHO_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.who_data_path),
            state_db_path: env::var("STATE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_db_path),
            emergency_patterns_path,
            emergency_number: env::var("EMERGENCY_NUMBER").unwrap_or(defaults.emergency_number),
            cache_ttl_seconds: parse_var("CACHE_TTL_SECONDS", defaults.cache_ttl_seconds)?,
            cache_error_responses: parse_var(
                "CACHE_ERROR_RESPONSES",
                defaults.cache_error_responses,
            )?,
            knowledge_refresh_seconds: parse_var(
                "KNOWLEDGE_REFRESH_SECONDS",
                defaults.knowledge_refresh_seconds,
            )?,
            max_concurrent_requests: parse_var(
                "MAX_CONCURRENT_REQUESTS",
                defaults.max_concurrent_requests,
            )?,
        })
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- Backend URL: {}", self.backend_url);
        info!("- Model: {}", self.model);
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- Generate Timeout: {}s", self.generate_timeout_seconds);
        info!("- Classify Timeout: {}s", self.classify_timeout_seconds);
        info!(
            "- Sampling: generation t={} top_p={}, classification t={}",
            self.generation_temperature, self.generation_top_p, self.classify_temperature
        );
        info!("- Local DB: {}", self.local_db_path.display());
        info!("- WHO Data: {}", self.who_data_path.display());
        info!("- State DB: {}", self.state_db_path.display());
        match &self.emergency_patterns_path {
            Some(path) => info!("- Emergency Patterns: {}", path.display()),
            None => info!("- Emergency Patterns: embedded default"),
        }
        info!("- Emergency Number: {}", self.emergency_number);
        info!("- Cache TTL: {}s (cache errors: {})", self.cache_ttl_seconds, self.cache_error_responses);
        info!("- Knowledge Refresh: {}s", self.knowledge_refresh_seconds);
        info!("- Max Concurrent Requests: {}", self.max_concurrent_requests);
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
