use crate::error::AppError;
use crate::evaluator::DonePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "GOALTRACK_CONFIG_PATH";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub debounce_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub done_policy: DonePolicy,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub done_policy: Option<DonePolicy>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub debounce_ms: Option<u64>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("goaltrack")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("goaltrack")
            .join(CONFIG_FILE_NAME))
    }
}

/// Defaults plus the error when the file exists but cannot be used.
/// A missing file is not an error.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    validate(&config, path)?;
    Ok(config)
}

fn validate(config: &Config, path: &Path) -> Result<(), AppError> {
    if config.analysis.endpoint.trim().is_empty() {
        return Err(AppError::invalid_data(format!(
            "{}: analysis.endpoint cannot be empty",
            path.display()
        )));
    }
    if config.analysis.timeout_secs == 0 {
        return Err(AppError::invalid_data(format!(
            "{}: analysis.timeout_secs must be positive",
            path.display()
        )));
    }
    Ok(())
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(policy) = overrides.done_policy {
        merged.done_policy = policy;
    }

    let analysis = &mut merged.analysis;
    if let Some(endpoint) = overrides.endpoint.as_ref() {
        analysis.endpoint = endpoint.clone();
    }
    if let Some(model) = overrides.model.as_ref() {
        analysis.model = model.clone();
    }
    if let Some(api_key_env) = overrides.api_key_env.as_ref() {
        analysis.api_key_env = api_key_env.clone();
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        analysis.timeout_secs = timeout_secs;
    }
    if let Some(debounce_ms) = overrides.debounce_ms {
        analysis.debounce_ms = debounce_ms;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        AnalysisConfig, Config, ConfigOverrides, DEFAULT_DEBOUNCE_MS, load_config_from_path,
        load_config_with_fallback_from_path, merge_overrides,
    };
    use crate::evaluator::DonePolicy;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("goaltrack-{nanos}-{file_name}"))
    }

    #[test]
    fn missing_config_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert_eq!(result.config.done_policy, DonePolicy::Lifetime);
        assert_eq!(result.config.analysis.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(result.error.is_none());
    }

    #[test]
    fn invalid_config_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.unwrap().code(), "invalid_data");
    }

    #[test]
    fn reads_partial_file_and_fills_defaults() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "done_policy": "current_period",
            "analysis": { "model": "gpt-4o-mini" }
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.done_policy, DonePolicy::CurrentPeriod);
        assert_eq!(loaded.analysis.model, "gpt-4o-mini");
        assert_eq!(loaded.analysis.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn rejects_zero_timeout() {
        let path = temp_path("zero-timeout.json");
        fs::write(&path, r#"{ "analysis": { "timeout_secs": 0 } }"#).unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.message().contains("timeout_secs"));
    }

    #[test]
    fn rejects_unknown_policy() {
        let path = temp_path("bad-policy.json");
        fs::write(&path, r#"{ "done_policy": "sometimes" }"#).unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            done_policy: DonePolicy::Lifetime,
            analysis: AnalysisConfig {
                model: "base-model".into(),
                ..AnalysisConfig::default()
            },
        };
        let overrides = ConfigOverrides {
            done_policy: Some(DonePolicy::CurrentPeriod),
            debounce_ms: Some(250),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(base.done_policy, DonePolicy::Lifetime);
        assert_eq!(merged.done_policy, DonePolicy::CurrentPeriod);
        assert_eq!(merged.analysis.debounce_ms, 250);
        assert_eq!(merged.analysis.model, "base-model");
    }

    #[test]
    fn merge_with_empty_overrides_returns_clone() {
        let base = Config::default();
        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }
}
