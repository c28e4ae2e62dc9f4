use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub supabase: SupabaseSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// AI scoring feature flags and model location.
#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    /// Master switch for the ML path. Off by default: the legacy heuristic
    /// remains the production scorer until the model is rolled out.
    #[serde(default)]
    pub enabled: bool,
    /// When true (default), ML scores are blended with the legacy score and
    /// ML failures degrade to the legacy score instead of erroring.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            fallback_enabled: true,
            model_path: default_model_path(),
            model_version: default_model_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool { true }
fn default_model_path() -> String { "models/compatibility.onnx".to_string() }
fn default_model_version() -> String { "v1".to_string() }
fn default_cache_ttl() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

/// Resolved flags handed to the predictor at construction.
///
/// The core never reads the environment itself; the hosting application
/// resolves configuration once and passes this in.
#[derive(Debug, Clone, Copy)]
pub struct PredictorSettings {
    pub ai_enabled: bool,
    pub fallback_enabled: bool,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            ai_enabled: false,
            fallback_enabled: true,
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl From<&Settings> for PredictorSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            ai_enabled: settings.ai.enabled,
            fallback_enabled: settings.ai.fallback_enabled,
            cache_enabled: settings.cache.enabled,
            cache_ttl_secs: settings.cache.ttl_secs,
        }
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with CONECTA_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with CONECTA_)
            // e.g., CONECTA_AI__ENABLED -> ai.enabled
            .add_source(
                Environment::with_prefix("CONECTA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CONECTA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ai_settings() {
        let ai = AiSettings::default();
        assert!(!ai.enabled);
        assert!(ai.fallback_enabled);
        assert_eq!(ai.model_version, "v1");
    }

    #[test]
    fn test_default_cache_settings() {
        let cache = CacheSettings::default();
        assert!(cache.enabled);
        assert_eq!(cache.ttl_secs, 3600);
    }

    #[test]
    fn test_predictor_settings_defaults() {
        let settings = PredictorSettings::default();
        assert!(!settings.ai_enabled);
        assert!(settings.fallback_enabled);
        assert!(settings.cache_enabled);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }
}
