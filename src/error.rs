use std::time::Duration;
use thiserror::Error;

/// Failure of an external program invocation
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("`{program}` is not installed or not on PATH")]
    NotFound { program: String },

    #[error("{description} timed out after {}s", .timeout.as_secs())]
    Timeout { description: String, timeout: Duration },

    #[error("{description} failed ({status}): {stderr}")]
    Failed {
        description: String,
        status: String,
        stderr: String,
    },

    #[error("{description}: {source}")]
    Io {
        description: String,
        #[source]
        source: std::io::Error,
    },
}

/// Engine-internal failure kinds. These never cross the dispatch boundary
/// as-is; see [`ProcessingError`].
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{engine} is not installed: {detail}")]
    EngineNotInstalled { engine: String, detail: String },

    #[error("Apertium language pair `{pair}` is not installed. Available pairs: {available}...")]
    PairNotInstalled { pair: String, available: String },

    #[error("No argos package available for `{source_lang}` -> `{target_lang}`")]
    PackageNotFound {
        source_lang: String,
        target_lang: String,
    },

    #[error("Argos source language `{0}` is not installed")]
    SourceNotFound(String),

    #[error("Argos target language `{0}` is not installed")]
    TargetNotFound(String),

    #[error("No argos translation from `{source_lang}` to `{target_lang}`")]
    NoTransformation {
        source_lang: String,
        target_lang: String,
    },

    #[error("Unsupported engine: `{0}`")]
    UnsupportedEngine(String),

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Translation timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Package archive error: {0}")]
    Archive(String),
}

impl EngineError {
    /// Map a failed external invocation of `engine` onto the engine taxonomy.
    pub fn from_command(engine: &str, err: CommandError) -> Self {
        match err {
            CommandError::NotFound { program } => EngineError::EngineNotInstalled {
                engine: engine.to_string(),
                detail: format!("`{}` not found", program),
            },
            CommandError::Timeout { .. } => EngineError::Timeout(err.to_string()),
            CommandError::Failed { .. } => EngineError::TranslationFailed(err.to_string()),
            CommandError::Io { source, .. } => EngineError::Io(source),
        }
    }
}

/// The one error kind callers above the dispatcher see.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ProcessingError {
    message: String,
    #[source]
    source: Option<EngineError>,
}

impl ProcessingError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The engine failure this error was raised for, if any.
    pub fn engine_error(&self) -> Option<&EngineError> {
        self.source.as_ref()
    }
}

impl From<EngineError> for ProcessingError {
    fn from(err: EngineError) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Media processing error: {0}")]
    Media(String),
}

pub type Result<T> = std::result::Result<T, Error>;
