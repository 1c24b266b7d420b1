// Translation engines behind one contract:
// - argos: managed-model engine, language packages installed on demand
// - apertium: rule-based engine driven through its command line
//
// `dispatch` routes a request to the right engine and caches one translator
// per (engine, source, target).

pub mod apertium;
pub mod argos;
pub mod dispatch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{Instrument, Span};

pub use dispatch::{Dispatcher, TranslatorKey};

use crate::error::EngineError;
use crate::language::LanguagePair;

/// The two supported translation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Argos,
    Apertium,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Argos => "argos",
            Engine::Apertium => "apertium",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "argos" => Ok(Engine::Argos),
            "apertium" => Ok(Engine::Apertium),
            _ => Err(EngineError::UnsupportedEngine(s.to_string())),
        }
    }
}

/// Memoized outcome of the readiness check. Only success is stored; a failed
/// check leaves the cell empty so the next call probes again.
pub type Readiness = OnceCell<bool>;

/// Main trait for translation engines.
///
/// Implementors provide the uncached pair check and the raw translation;
/// [`Translator::ensure_pair`] and [`Translator::translate`] add the
/// memoization and the readiness gate.
#[async_trait]
pub trait Translator: Send + Sync {
    fn engine(&self) -> Engine;

    fn pair(&self) -> &LanguagePair;

    /// Span carrying engine and language context for every event
    fn span(&self) -> &Span;

    fn readiness(&self) -> &Readiness;

    /// Confirm (and possibly provision) the language pair
    async fn check_pair(&self) -> Result<(), EngineError>;

    /// Translate with the pair known to be ready
    async fn translate_text(&self, text: &str) -> Result<String, EngineError>;

    /// Cached check that the language pair is usable
    async fn ensure_pair(&self) -> Result<bool, EngineError> {
        let ready = self
            .readiness()
            .get_or_try_init(|| async { self.check_pair().await.map(|_| true) })
            .instrument(self.span().clone())
            .await?;
        Ok(*ready)
    }

    /// Translate `text`; `None` when the pair never became ready
    async fn translate(&self, text: &str) -> Result<Option<String>, EngineError> {
        if !self.ensure_pair().await? {
            return Ok(None);
        }
        self.translate_text(text)
            .instrument(self.span().clone())
            .await
            .map(Some)
    }
}

/// Span shared by every translator implementation
pub(crate) fn translator_span(engine: Engine, pair: &LanguagePair) -> Span {
    tracing::info_span!(
        "translator",
        engine = %engine,
        source_lang = pair.source(),
        target_lang = pair.target()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyTranslator {
        pair: LanguagePair,
        span: Span,
        readiness: Readiness,
        checks: AtomicUsize,
        fail_first: usize,
    }

    impl FlakyTranslator {
        fn new(fail_first: usize) -> Self {
            let pair = LanguagePair::new("de", "en");
            Self {
                span: translator_span(Engine::Argos, &pair),
                pair,
                readiness: Readiness::new(),
                checks: AtomicUsize::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl Translator for FlakyTranslator {
        fn engine(&self) -> Engine {
            Engine::Argos
        }

        fn pair(&self) -> &LanguagePair {
            &self.pair
        }

        fn span(&self) -> &Span {
            &self.span
        }

        fn readiness(&self) -> &Readiness {
            &self.readiness
        }

        async fn check_pair(&self) -> Result<(), EngineError> {
            let attempt = self.checks.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(EngineError::SourceNotFound("de".to_string()));
            }
            Ok(())
        }

        async fn translate_text(&self, text: &str) -> Result<String, EngineError> {
            Ok(text.to_uppercase())
        }
    }

    #[test]
    fn test_engine_names() {
        assert_eq!("argos".parse::<Engine>().unwrap(), Engine::Argos);
        assert_eq!(" Apertium ".parse::<Engine>().unwrap(), Engine::Apertium);
        assert!(matches!(
            "unknown".parse::<Engine>(),
            Err(EngineError::UnsupportedEngine(name)) if name == "unknown"
        ));
    }

    #[tokio::test]
    async fn test_readiness_is_checked_once_on_success() {
        let translator = FlakyTranslator::new(0);
        assert!(translator.ensure_pair().await.unwrap());
        assert!(translator.ensure_pair().await.unwrap());
        assert_eq!(translator.translate("hallo").await.unwrap(), Some("HALLO".to_string()));
        assert_eq!(translator.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_readiness_is_retried() {
        let translator = FlakyTranslator::new(1);
        assert!(translator.ensure_pair().await.is_err());
        assert!(translator.ensure_pair().await.unwrap());
        assert_eq!(translator.checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_translate_propagates_readiness_failure() {
        let translator = FlakyTranslator::new(usize::MAX);
        let result = translator.translate("hallo").await;
        assert!(matches!(result, Err(EngineError::SourceNotFound(_))));
    }
}
