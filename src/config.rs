use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

/// Prefix of every environment variable that overrides a setting
pub const ENV_PREFIX: &str = "FTMTR_";

pub const DEFAULT_ARGOS_INDEX_URL: &str =
    "https://raw.githubusercontent.com/argosopentech/argospm-index/main/index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for logs, downloads and temporary files
    pub data_root: PathBuf,
    pub translate: TranslateConfig,
    pub argos: ArgosConfig,
    pub apertium: ApertiumConfig,
    pub transcriber: TranscriberConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Default engine name (argos, apertium)
    pub engine: String,
    /// Default source language; entities may carry their own
    pub source_language: Option<String>,
    /// Default target language
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgosConfig {
    /// Path to the argos-translate binary
    pub binary_path: String,
    /// Installed package directory; `<data_root>/argos/packages` when unset
    pub packages_dir: Option<PathBuf>,
    /// Remote package index
    pub index_url: String,
    /// Timeout in seconds for one translation call
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApertiumConfig {
    /// Path to the apertium binary
    pub binary_path: String,
    /// Timeout in seconds for one translation call
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to whisper-cli
    pub binary_path: String,
    /// Directory holding whisper.cpp models
    pub model_root: PathBuf,
    /// Model file name inside `model_root`
    pub model: String,
    /// Timeout in seconds for audio extraction and for transcription
    pub timeout: u64,
    /// Two-letter language code or `auto`
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(".ftm-translate"),
            translate: TranslateConfig::default(),
            argos: ArgosConfig::default(),
            apertium: ApertiumConfig::default(),
            transcriber: TranscriberConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            engine: "argos".to_string(),
            source_language: None,
            target_language: "en".to_string(),
        }
    }
}

impl Default for ArgosConfig {
    fn default() -> Self {
        Self {
            binary_path: "argos-translate".to_string(),
            packages_dir: None,
            index_url: DEFAULT_ARGOS_INDEX_URL.to_string(),
            timeout: 300,
        }
    }
}

impl Default for ApertiumConfig {
    fn default() -> Self {
        Self {
            binary_path: "apertium".to_string(),
            timeout: 300,
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper-cli".to_string(),
            model_root: PathBuf::from("./models"),
            model: "ggml-medium-q8_0.bin".to_string(),
            timeout: 60 * 60,
            language: "auto".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
        }
    }
}

impl ArgosConfig {
    /// Limit for one `argos-translate` run
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl ApertiumConfig {
    /// Limit for one apertium call
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl TranscriberConfig {
    /// Limit for audio extraction and for transcription, each
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Full path of the whisper.cpp model file
    pub fn model_path(&self) -> PathBuf {
        self.model_root.join(&self.model)
    }
}

impl Config {
    /// Load settings: explicit file, else `./config.toml` if present, else
    /// defaults; `FTMTR_*` variables (also read from `.env`) win over both.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new("config.toml").exists() => {
                info!("Found config.toml in current directory, loading...");
                Self::from_file("config.toml")?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Effective settings as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Override settings from `FTMTR_*` variables looked up through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| var(&format!("{}{}", ENV_PREFIX, name));
        let seconds = |name: &str, value: String| {
            value.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("{}{} must be a number of seconds", ENV_PREFIX, name))
            })
        };

        if let Some(v) = get("DATA_ROOT") {
            self.data_root = PathBuf::from(v);
        }
        if let Some(v) = get("ENGINE") {
            self.translate.engine = v;
        }
        if let Some(v) = get("SOURCE_LANGUAGE") {
            self.translate.source_language = Some(v);
        }
        if let Some(v) = get("TARGET_LANGUAGE") {
            self.translate.target_language = v;
        }
        if let Some(v) = get("ARGOS_EXECUTABLE") {
            self.argos.binary_path = v;
        }
        if let Some(v) = get("ARGOS_PACKAGES_DIR") {
            self.argos.packages_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("ARGOS_INDEX_URL") {
            self.argos.index_url = v;
        }
        if let Some(v) = get("ARGOS_TIMEOUT") {
            self.argos.timeout = seconds("ARGOS_TIMEOUT", v)?;
        }
        if let Some(v) = get("APERTIUM_EXECUTABLE") {
            self.apertium.binary_path = v;
        }
        if let Some(v) = get("APERTIUM_TIMEOUT") {
            self.apertium.timeout = seconds("APERTIUM_TIMEOUT", v)?;
        }
        if let Some(v) = get("WHISPER_EXECUTABLE") {
            self.transcriber.binary_path = v;
        }
        if let Some(v) = get("WHISPER_MODEL_ROOT") {
            self.transcriber.model_root = PathBuf::from(v);
        }
        if let Some(v) = get("WHISPER_MODEL") {
            self.transcriber.model = v;
        }
        if let Some(v) = get("WHISPER_TIMEOUT") {
            self.transcriber.timeout = seconds("WHISPER_TIMEOUT", v)?;
        }
        if let Some(v) = get("WHISPER_LANGUAGE") {
            self.transcriber.language = v;
        }
        if let Some(v) = get("FFMPEG_EXECUTABLE") {
            self.media.binary_path = v;
        }

        Ok(())
    }

    /// Argos package directory, `<data_root>/argos/packages` unless set
    pub fn argos_packages_dir(&self) -> PathBuf {
        self.argos
            .packages_dir
            .clone()
            .unwrap_or_else(|| self.data_root.join("argos").join("packages"))
    }

    /// Directory of the rolling log files
    pub fn log_dir(&self) -> PathBuf {
        self.data_root.join("log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [translate]
            engine = "apertium"
            source_language = "de"
            "#,
        )
        .unwrap();

        assert_eq!(config.translate.engine, "apertium");
        assert_eq!(config.translate.source_language.as_deref(), Some("de"));
        assert_eq!(config.translate.target_language, "en");
        assert_eq!(config.transcriber.model, "ggml-medium-q8_0.bin");
        assert_eq!(config.transcriber.timeout, 3600);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("FTMTR_ENGINE", "apertium"),
            ("FTMTR_TARGET_LANGUAGE", "fr"),
            ("FTMTR_WHISPER_TIMEOUT", "120"),
            ("FTMTR_DATA_ROOT", "/tmp/ftm"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.translate.engine, "apertium");
        assert_eq!(config.translate.target_language, "fr");
        assert_eq!(config.transcriber.timeout(), Duration::from_secs(120));
        assert_eq!(
            config.argos_packages_dir(),
            PathBuf::from("/tmp/ftm/argos/packages")
        );
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|key| {
            (key == "FTMTR_APERTIUM_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let parsed: Config = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.argos.index_url, DEFAULT_ARGOS_INDEX_URL);
    }
}
