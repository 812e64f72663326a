//! Server settings read from the environment.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use versecrew_tools::DEFAULT_FLOWISE_URL;

const DEFAULT_GEMINI_API_KEY: &str = "default-key";
const DEFAULT_LLM_MODEL: &str = "gemini-pro";
const DEFAULT_TEMPERATURE: f32 = 0.5;
const DEFAULT_FROM_EMAIL: &str = "noreply@example.com";
const DEFAULT_CREW_ID: &str = "biblical";
const DEFAULT_DATABASE_PATH: &str = "data/versecrew.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MAX_CONCURRENT_RUNS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub serper_api_key: String,
    pub gemini_api_key: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub openai_api_base: Option<String>,
    pub flowise_url: String,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_from_email: String,
    pub crew_preset_dir: Option<PathBuf>,
    pub crew_id: String,
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub max_concurrent_runs: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let Some(serper_api_key) = get("SERPER_API_KEY") else {
            bail!("SERPER_API_KEY environment variable not set");
        };

        let llm_temperature = match get("LLM_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .with_context(|| format!("LLM_TEMPERATURE is not a number: {raw}"))?,
            None => DEFAULT_TEMPERATURE,
        };

        let max_concurrent_runs = match get("MAX_CONCURRENT_RUNS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("MAX_CONCURRENT_RUNS must be a positive integer: {raw}"))?,
            None => DEFAULT_MAX_CONCURRENT_RUNS,
        };

        Ok(Self {
            serper_api_key,
            gemini_api_key: or("GEMINI_API_KEY", DEFAULT_GEMINI_API_KEY),
            llm_model: or("LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_temperature,
            openai_api_base: get("OPENAI_API_BASE"),
            flowise_url: or("FLOWISE_URL", DEFAULT_FLOWISE_URL),
            sendgrid_api_key: get("SENDGRID_API_KEY"),
            sendgrid_from_email: or("SENDGRID_FROM_EMAIL", DEFAULT_FROM_EMAIL),
            crew_preset_dir: get("CREW_PRESET_DIR").map(PathBuf::from),
            crew_id: or("CREW_ID", DEFAULT_CREW_ID),
            database_path: PathBuf::from(or("DATABASE_PATH", DEFAULT_DATABASE_PATH)),
            bind_addr: or("BIND_ADDR", DEFAULT_BIND_ADDR),
            max_concurrent_runs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("SERPER_API_KEY", "serper")])).unwrap();
        assert_eq!(config.serper_api_key, "serper");
        assert_eq!(config.gemini_api_key, "default-key");
        assert_eq!(config.llm_model, "gemini-pro");
        assert_eq!(config.llm_temperature, 0.5);
        assert_eq!(config.openai_api_base, None);
        assert_eq!(config.flowise_url, DEFAULT_FLOWISE_URL);
        assert_eq!(config.sendgrid_api_key, None);
        assert_eq!(config.crew_id, "biblical");
        assert_eq!(config.database_path, PathBuf::from("data/versecrew.db"));
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.max_concurrent_runs, 2);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("SERPER_API_KEY", "serper"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("LLM_TEMPERATURE", " 0.2 "),
            ("OPENAI_API_BASE", "http://localhost:11434/v1"),
            ("SENDGRID_API_KEY", "sg"),
            ("CREW_PRESET_DIR", "/etc/versecrew/crews"),
            ("SENDGRID_FROM_EMAIL", ""),
            ("MAX_CONCURRENT_RUNS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.llm_temperature, 0.2);
        assert_eq!(config.openai_api_base.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(config.sendgrid_api_key.as_deref(), Some("sg"));
        assert_eq!(config.crew_preset_dir, Some(PathBuf::from("/etc/versecrew/crews")));
        assert_eq!(config.sendgrid_from_email, "noreply@example.com");
        assert_eq!(config.max_concurrent_runs, 4);
    }

    #[test]
    fn test_missing_serper_key_fails() {
        let err = ServerConfig::from_lookup(lookup(&[("SERPER_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }

    #[test]
    fn test_bad_temperature_fails() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("SERPER_API_KEY", "serper"),
            ("LLM_TEMPERATURE", "warm"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("LLM_TEMPERATURE"));
    }

    #[test]
    fn test_max_concurrent_runs_must_be_positive() {
        for raw in ["0", "-1", "many"] {
            let err = ServerConfig::from_lookup(lookup(&[
                ("SERPER_API_KEY", "serper"),
                ("MAX_CONCURRENT_RUNS", raw),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("MAX_CONCURRENT_RUNS"), "{raw}");
        }
    }
}
