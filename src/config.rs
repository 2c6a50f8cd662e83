use serde::Deserialize;
use std::path::PathBuf;

/// Minimum interval in ms between model API calls.
pub const RATE_LIMIT_MS: u64 = 200;

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub translate: TranslateConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    /// One of "gemini", "openai", "anthropic".
    pub provider: String,
    pub api_key_env: String,
    /// Optional API base URL override (e.g. a local OpenAI-compatible server).
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub top_p: f32,
    /// Only sent to providers that accept it (gemini).
    pub top_k: u32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TranslateConfig {
    /// Target languages offered for translation.
    pub languages: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// Override the history file (default: ~/.codescope/history.jsonl)
    pub path: Option<PathBuf>,
    pub max_size_mb: u64,
}

// --- Defaults ---

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "gemini".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            base_url: None,
            model: "gemini-1.5-flash".into(),
            timeout_ms: 60_000,
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            languages: ["Python", "JavaScript", "Java", "C++", "C#", "Ruby", "Go"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            max_size_mb: 10,
        }
    }
}

// --- Methods ---

impl Config {
    pub fn load() -> Self {
        let config_path = Self::config_path();

        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {e}", config_path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {e}", config_path.display());
                }
            }
        }

        Config::default()
    }

    pub fn config_path() -> PathBuf {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(|d| PathBuf::from(d).join("codescope").join("config.toml"))
            .or_else(|| dirs::config_dir().map(|d| d.join("codescope").join("config.toml")))
            .unwrap_or_else(|| PathBuf::from("~/.config/codescope/config.toml"))
    }

    pub fn history_path(&self) -> PathBuf {
        if let Some(ref path) = self.history.path {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".codescope")
            .join("history.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_gemini_setup() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.llm.top_k, 64);
        assert_eq!(config.llm.max_output_tokens, 8192);
        assert_eq!(config.translate.languages.len(), 7);
        assert!(config.translate.languages.iter().any(|l| l == "C#"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"

[translate]
languages = ["Rust", "Go"]
"#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_ms, 60_000);
        assert_eq!(config.translate.languages, vec!["Rust", "Go"]);
        assert!(config.history.enabled);
    }

    #[test]
    fn test_history_path_override() {
        let config = Config {
            history: HistoryConfig {
                path: Some(PathBuf::from("/tmp/codescope-history.jsonl")),
                ..HistoryConfig::default()
            },
            ..Config::default()
        };
        assert_eq!(
            config.history_path(),
            PathBuf::from("/tmp/codescope-history.jsonl")
        );
    }
}
