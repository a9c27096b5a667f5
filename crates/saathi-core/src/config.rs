//! Companion configuration loaded from TOML file and environment.
//!
//! One canonical mood taxonomy and one canonical language policy are selected
//! here at startup; the contract-enforcement code never branches per variant.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reply-language policy for the conversational prompt. Named configuration,
/// selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePolicy {
    /// Reply in English only.
    EnglishOnly,
    /// Reply in English or Roman-script Hinglish, mirroring the user.
    HinglishAware,
}

impl Default for LanguagePolicy {
    fn default() -> Self {
        Self::HinglishAware
    }
}

impl LanguagePolicy {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "english_only" | "english" | "en" => LanguagePolicy::EnglishOnly,
            _ => LanguagePolicy::HinglishAware,
        }
    }
}

fn default_app_name() -> String {
    "Saathi".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_storage_path() -> String {
    "./data".to_string()
}

fn default_llm_mode() -> String {
    "mock".to_string()
}

fn default_crisis_mood_score() -> u8 {
    2
}

fn default_pulse_cache_ttl_secs() -> u64 {
    1800
}

/// Global companion configuration.
///
/// | Key / Env | Default | Description |
/// |-----------|---------|-------------|
/// | `SAATHI_MODEL` | gemini-2.5-flash | Generative model id. |
/// | `SAATHI_LLM_MODE` | mock | "mock" (offline stub) or "gemini". |
/// | `SAATHI_LANGUAGE_POLICY` | hinglish_aware | Reply-language policy. |
/// | `SAATHI_MOOD_NORMALIZE` | false | Re-clamp mood score into the label band. |
/// | `SAATHI_CRISIS_MOOD_SCORE` | 2 | Score used in the fixed crisis payload. |
/// | `PULSE_CACHE_TTL` | 1800 | Pulse summary cache TTL in seconds. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    /// Application identity used in logs.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Generative model id.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base directory for the embedded session store.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// LLM mode: "mock" (offline stub) or "gemini".
    #[serde(default = "default_llm_mode")]
    pub llm_mode: String,
    /// Reply-language policy.
    #[serde(default)]
    pub language_policy: LanguagePolicy,
    /// When true, mood scores are re-clamped into the label's canonical band.
    /// Default OFF: the model's numeric judgment is trusted once in [1, 10].
    #[serde(default)]
    pub mood_normalize: bool,
    /// Mood score carried by the fixed crisis payload (distressed band).
    #[serde(default = "default_crisis_mood_score")]
    pub crisis_mood_score: u8,
    /// Pulse summary cache TTL in seconds.
    #[serde(default = "default_pulse_cache_ttl_secs")]
    pub pulse_cache_ttl_secs: u64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            model: default_model(),
            storage_path: default_storage_path(),
            llm_mode: default_llm_mode(),
            language_policy: LanguagePolicy::default(),
            mood_normalize: false,
            crisis_mood_score: default_crisis_mood_score(),
            pulse_cache_ttl_secs: default_pulse_cache_ttl_secs(),
        }
    }
}

impl CompanionConfig {
    /// Load config from file and environment.
    /// Precedence: env `SAATHI_CONFIG` path > `config/saathi.toml` > defaults,
    /// with `SAATHI__*` environment variables overriding file values.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("SAATHI_CONFIG").unwrap_or_else(|_| "config/saathi".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", default_app_name())?
            .set_default("model", default_model())?
            .set_default("storage_path", default_storage_path())?
            .set_default("llm_mode", default_llm_mode())?
            .set_default("language_policy", "hinglish_aware")?
            .set_default("mood_normalize", false)?
            .set_default("crisis_mood_score", default_crisis_mood_score() as i64)?
            .set_default("pulse_cache_ttl_secs", default_pulse_cache_ttl_secs() as i64)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("SAATHI").separator("__"))
            .build()?;

        let mut cfg: Self = built.try_deserialize()?;
        cfg.clamp();
        Ok(cfg)
    }

    /// Environment-only loader for contexts without a config file.
    /// Unset or invalid values fall back to the documented defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self {
            app_name: env_string("SAATHI_APP_NAME", &default_app_name()),
            model: env_string("SAATHI_MODEL", &default_model()),
            storage_path: env_string("SAATHI_STORAGE_PATH", &default_storage_path()),
            llm_mode: env_string("SAATHI_LLM_MODE", &default_llm_mode()),
            language_policy: LanguagePolicy::parse(&env_string(
                "SAATHI_LANGUAGE_POLICY",
                "hinglish_aware",
            )),
            mood_normalize: env_bool("SAATHI_MOOD_NORMALIZE", false),
            crisis_mood_score: env_u64("SAATHI_CRISIS_MOOD_SCORE", 2) as u8,
            pulse_cache_ttl_secs: env_u64("PULSE_CACHE_TTL", default_pulse_cache_ttl_secs()),
        };
        cfg.clamp();
        cfg
    }

    /// Clamps numeric fields to valid ranges.
    pub fn clamp(&mut self) {
        self.crisis_mood_score = self.crisis_mood_score.clamp(1, 10);
        self.pulse_cache_ttl_secs = self.pulse_cache_ttl_secs.max(1);
    }

    /// True when the offline stub client should be used instead of the
    /// Gemini bridge.
    pub fn is_mock_mode(&self) -> bool {
        self.llm_mode.trim().eq_ignore_ascii_case("mock")
    }
}

impl CompanionConfig {
    /// Load configuration from a specific TOML file, or create the default
    /// file if it does not exist yet.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let mut cfg: Self = toml::from_str(&content)?;
            cfg.clamp();
            Ok(cfg)
        } else {
            let cfg = Self::default();
            cfg.save_to_path(path)?;
            Ok(cfg)
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let cfg = CompanionConfig::default();
        assert!(!cfg.mood_normalize);
        assert_eq!(cfg.crisis_mood_score, 2);
        assert_eq!(cfg.pulse_cache_ttl_secs, 1800);
        assert!(cfg.is_mock_mode());
    }

    #[test]
    fn language_policy_parse() {
        assert_eq!(LanguagePolicy::parse("english_only"), LanguagePolicy::EnglishOnly);
        assert_eq!(LanguagePolicy::parse("EN"), LanguagePolicy::EnglishOnly);
        assert_eq!(LanguagePolicy::parse("anything"), LanguagePolicy::HinglishAware);
    }

    #[test]
    fn file_round_trip_creates_default_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("saathi.toml");

        let created = CompanionConfig::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.model, "gemini-2.5-flash");

        let mut edited = created.clone();
        edited.llm_mode = "gemini".to_string();
        edited.save_to_path(&path).unwrap();

        let reloaded = CompanionConfig::load_from_path(&path).unwrap();
        assert!(!reloaded.is_mock_mode());
    }

    #[test]
    fn clamp_bounds_crisis_score() {
        let mut cfg = CompanionConfig {
            crisis_mood_score: 0,
            ..Default::default()
        };
        cfg.clamp();
        assert_eq!(cfg.crisis_mood_score, 1);

        cfg.crisis_mood_score = 42;
        cfg.clamp();
        assert_eq!(cfg.crisis_mood_score, 10);
    }
}
