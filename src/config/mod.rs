use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::filter::FilterLevel;
use crate::history::DEFAULT_HISTORY_LIMIT;

pub const ENV_PREFIX: &str = "OVERLAY_EDITOR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Filter level a new session starts at.
    pub default_level: FilterLevel,
    /// MRU entries shown; twice as many are remembered.
    pub mru_window: usize,
    /// Prototype linked into newly created documents.
    pub default_prototype: Option<String>,
    pub history_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates scanned between two looks at the stop flag.
    pub cancel_check_interval: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Config {
    /// Layer an optional file and `OVERLAY_EDITOR__*` environment variables
    /// over the defaults. Without an explicit path, `overlay-editor.{toml,json,..}`
    /// in the working directory is read when present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path),
            None => config::File::with_name("overlay-editor").required(false),
        };
        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_level: FilterLevel::All,
            mru_window: 10,
            default_prototype: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { cancel_check_interval: 64 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "overlay_editor=info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.session.default_level, FilterLevel::All);
        assert_eq!(config.session.mru_window, 10);
        assert_eq!(config.session.default_prototype, None);
        assert_eq!(config.session.history_limit, 200);

        assert_eq!(config.search.cancel_check_interval, 64);

        assert_eq!(config.logging.filter, "overlay_editor=info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_config_clone() {
        let config1 = Config::default();
        let config2 = config1.clone();

        assert_eq!(config1, config2);
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "session": {
                "default_level": "overrides",
                "mru_window": 4,
                "default_prototype": "base"
            },
            "logging": {
                "json": true
            }
        }"#;

        let config: Result<Config, _> = serde_json::from_str(json);
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.session.default_level, FilterLevel::Overrides);
        assert_eq!(config.session.mru_window, 4);
        assert_eq!(config.session.default_prototype.as_deref(), Some("base"));
        assert_eq!(config.session.history_limit, 200);
        assert_eq!(config.search.cancel_check_interval, 64);
        assert!(config.logging.json);
    }

    #[test]
    fn test_config_rejects_unknown_level() {
        let json = r#"{ "session": { "default_level": "everything" } }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_config_to_toml() {
        let toml = Config::default().to_toml().unwrap();

        assert!(toml.contains("[session]"));
        assert!(toml.contains("default_level = \"all\""));
        assert!(toml.contains("cancel_check_interval = 64"));
        assert!(!toml.contains("default_prototype"));
    }
}
