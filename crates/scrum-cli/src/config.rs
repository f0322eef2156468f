//! Configuration file support

use scrum_ai::Model;
use scrum_facilitator::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for scrum
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat backend (ollama, openai)
    pub provider: Option<String>,
    /// Model name passed to the backend
    pub model: Option<String>,
    /// Backend base URL
    pub base_url: Option<String>,
    /// Custom system prompt file path
    pub system_prompt_file: Option<String>,
    /// Stream replies as they are generated
    pub stream: Option<bool>,
    /// Pause before each backend call as if typing
    pub typing_delay: Option<bool>,
    /// Planning annotation style (phased, simple)
    pub planning_variant: Option<String>,
    /// What to do with the history when a backend call fails
    pub failure_policy: Option<FailurePolicy>,
    /// Write a JSONL transcript of every session
    pub transcript: Option<bool>,
    /// Speech recognition endpoint used by /voice
    pub speech_url: Option<String>,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scrum")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SCRUM_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            provider: Some("ollama".to_string()),
            model: Some(Model::OLLAMA_DEFAULT_MODEL.to_string()),
            base_url: Some(Model::OLLAMA_BASE_URL.to_string()),
            stream: Some(false),
            typing_delay: Some(true),
            planning_variant: Some("phased".to_string()),
            failure_policy: Some(FailurePolicy::RecordApology),
            transcript: Some(false),
            ..Default::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// Model name, checking config then `MODEL_NAME`
    pub fn model_name(&self, provider: &str) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        if let Ok(model) = std::env::var("MODEL_NAME") {
            return model;
        }
        match provider {
            "openai" => "gpt-4o-mini".to_string(),
            _ => Model::OLLAMA_DEFAULT_MODEL.to_string(),
        }
    }

    /// Backend URL, checking config then `OLLAMA_API_URL` for Ollama
    pub fn base_url(&self, provider: &str) -> String {
        if let Some(url) = &self.base_url {
            return url.clone();
        }
        match provider {
            "openai" => "https://api.openai.com/v1".to_string(),
            _ => std::env::var("OLLAMA_API_URL")
                .unwrap_or_else(|_| Model::OLLAMA_BASE_URL.to_string()),
        }
    }

    /// Get API key for a provider, checking config then env
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        match provider {
            "openai" => self
                .api_keys
                .openai
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            _ => None,
        }
    }

    /// Whether planning should use the single fixed prefix
    pub fn simple_planning(&self) -> bool {
        self.planning_variant
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("simple"))
    }

    /// Read the custom system prompt, if one is configured
    pub fn system_prompt(&self) -> std::io::Result<Option<String>> {
        match &self.system_prompt_file {
            Some(path) => fs::read_to_string(expand_home(path)).map(Some),
            None => Ok(None),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# scrum configuration file
# Place at ~/.config/scrum/config.toml (Linux) or set SCRUM_CONFIG_PATH

# Chat backend (ollama, openai)
provider = "ollama"

# Model name (falls back to $MODEL_NAME, then "mistral")
model = "mistral"

# Backend URL (falls back to $OLLAMA_API_URL for ollama)
base_url = "http://localhost:11434/api"

# Stream replies as they are generated
stream = false

# Pause 1-4 seconds before replying in standup and planning
typing_delay = true

# Planning prefixes: "phased" (one per phase) or "simple" (one for all)
planning_variant = "phased"

# On backend failure: "record" keeps the apology in the backend history,
# "transcript-only" only shows it
failure_policy = "record"

# Write a JSONL transcript of every session
transcript = false

# Speech recognition endpoint used by /voice (optional)
# speech_url = "http://localhost:5000/api/speech-to-text"

# Custom system prompt file (optional)
# system_prompt_file = "~/.config/scrum/system_prompt.txt"

# API keys (optional - can also use environment variables)
[api_keys]
# openai = "sk-..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.provider.as_deref(), Some("ollama"));
        assert_eq!(config.model.as_deref(), Some("mistral"));
        assert_eq!(config.failure_policy, Some(FailurePolicy::RecordApology));
        assert_eq!(config.typing_delay, Some(true));
        assert!(!config.simple_planning());
        assert!(config.speech_url.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
            planning_variant = "Simple"
            failure_policy = "transcript-only"

            [api_keys]
            openai = "sk-test"
            "#,
        )
        .unwrap();
        assert!(config.simple_planning());
        assert_eq!(config.failure_policy, Some(FailurePolicy::TranscriptOnly));
        assert_eq!(config.get_api_key("openai").as_deref(), Some("sk-test"));
        assert_eq!(config.get_api_key("ollama"), None);
    }

    #[test]
    fn test_explicit_values_win() {
        let config = Config {
            model: Some("llama3".into()),
            base_url: Some("http://gpu-box:11434/api".into()),
            ..Default::default()
        };
        assert_eq!(config.model_name("ollama"), "llama3");
        assert_eq!(config.base_url("ollama"), "http://gpu-box:11434/api");
        assert_eq!(
            Config::default().base_url("openai"),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/scrum/config.toml"));
        assert!(config.provider.is_none());
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("scrum-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "provider = [not toml").unwrap();
        let config = Config::load_from(&path);
        assert!(config.provider.is_none());
        fs::remove_file(path).unwrap();
    }
}
