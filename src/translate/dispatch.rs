use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

use crate::config::Config;
use crate::error::ProcessingError;
use crate::language::LanguagePair;
use super::apertium::{ApertiumEngine, ApertiumTranslator};
use super::argos::{ArgosRegistry, ArgosTranslator, ModelRegistry, PackageIndex, RemotePackageIndex};
use super::{Engine, Translator};

/// Cache key: one translator per engine and language pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslatorKey {
    pub engine: Engine,
    pub source: String,
    pub target: String,
}

/// Routes translation requests to an engine and owns the translator cache.
///
/// Translators are created at most once per [`TranslatorKey`] for the
/// dispatcher's lifetime, so install and probe costs are paid once per run.
pub struct Dispatcher {
    argos_registry: Arc<dyn ModelRegistry>,
    argos_index: Arc<dyn PackageIndex>,
    apertium: Arc<ApertiumEngine>,
    download_dir: PathBuf,
    default_engine: String,
    default_target: String,
    translators: Mutex<HashMap<TranslatorKey, Arc<dyn Translator>>>,
}

impl Dispatcher {
    /// Dispatcher over the configured argos and apertium installations
    pub fn new(config: &Config) -> Result<Self, ProcessingError> {
        let registry = ArgosRegistry::new(&config.argos, config.argos_packages_dir());
        let index = RemotePackageIndex::new(&config.argos.index_url)?;
        let tmp_dir = config.data_root.join("tmp");
        let apertium = ApertiumEngine::new(&config.apertium).with_temp_dir(tmp_dir.clone());

        Ok(Self::with_backends(
            Arc::new(registry),
            Arc::new(index),
            Arc::new(apertium),
            tmp_dir,
        )
        .with_defaults(&config.translate.engine, &config.translate.target_language))
    }

    /// Dispatcher over explicit backends, with `argos` and `en` as defaults
    pub fn with_backends(
        argos_registry: Arc<dyn ModelRegistry>,
        argos_index: Arc<dyn PackageIndex>,
        apertium: Arc<ApertiumEngine>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            argos_registry,
            argos_index,
            apertium,
            download_dir,
            default_engine: Engine::Argos.to_string(),
            default_target: "en".to_string(),
            translators: Mutex::new(HashMap::new()),
        }
    }

    /// Engine and target language used when a caller leaves them out
    pub fn with_defaults(mut self, engine: &str, target: &str) -> Self {
        self.default_engine = engine.to_string();
        self.default_target = target.to_string();
        self
    }

    /// Target language used when a caller leaves it out
    pub fn default_target(&self) -> &str {
        &self.default_target
    }

    /// Resolve the cached translator for `engine` and the language pair.
    ///
    /// Unknown engines fail here, before any network or process call.
    pub fn translator(
        &self,
        engine: &str,
        source: &str,
        target: &str,
    ) -> Result<Arc<dyn Translator>, ProcessingError> {
        let engine: Engine = engine.parse()?;
        let key = TranslatorKey {
            engine,
            source: source.to_string(),
            target: target.to_string(),
        };

        let mut translators = self
            .translators
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let translator = translators
            .entry(key)
            .or_insert_with_key(|key| self.build(key))
            .clone();
        Ok(translator)
    }

    fn build(&self, key: &TranslatorKey) -> Arc<dyn Translator> {
        debug!("Creating {} translator for {} -> {}", key.engine, key.source, key.target);
        let pair = LanguagePair::new(key.source.clone(), key.target.clone());
        match key.engine {
            Engine::Argos => Arc::new(ArgosTranslator::new(
                pair,
                self.argos_registry.clone(),
                self.argos_index.clone(),
                self.download_dir.clone(),
            )),
            Engine::Apertium => Arc::new(ApertiumTranslator::new(pair, self.apertium.clone())),
        }
    }

    /// Translate `text`, raising every failure as a [`ProcessingError`].
    ///
    /// `target` and `engine` fall back to the dispatcher defaults.
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: Option<&str>,
        engine: Option<&str>,
    ) -> Result<Option<String>, ProcessingError> {
        let translator = self.translator(
            engine.unwrap_or(&self.default_engine),
            source,
            target.unwrap_or(&self.default_target),
        )?;
        translator.translate(text).await.map_err(ProcessingError::from)
    }

    /// Translate `text`, logging engine failures and returning `None` for
    /// them. Only dispatch failures such as an unsupported engine propagate.
    pub async fn translate_or_skip(
        &self,
        text: &str,
        source: &str,
        target: Option<&str>,
        engine: Option<&str>,
    ) -> Result<Option<String>, ProcessingError> {
        let translator = self.translator(
            engine.unwrap_or(&self.default_engine),
            source,
            target.unwrap_or(&self.default_target),
        )?;

        match translator.translate(text).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(parent: translator.span(), "{}", ProcessingError::from(e));
                Ok(None)
            }
        }
    }

    /// Number of translators created so far
    pub fn cached_translators(&self) -> usize {
        self.translators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::config::ApertiumConfig;
    use crate::translate::argos::tests::{language, package};
    use crate::translate::argos::{MockModelRegistry, MockPackageIndex};

    pub(crate) fn apertium_engine(binary_path: &str) -> Arc<ApertiumEngine> {
        Arc::new(ApertiumEngine::new(&ApertiumConfig {
            binary_path: binary_path.to_string(),
            timeout: 10,
        }))
    }

    /// Dispatcher whose argos engine knows de -> en and echoes `[en] <text>`
    pub(crate) fn dispatcher_with_argos(installs: usize) -> Dispatcher {
        let mut registry = MockModelRegistry::new();
        registry
            .expect_installed_languages()
            .returning(|| Ok(vec![language("de", &["en"]), language("en", &[])]));
        registry.expect_install_from_path().times(installs).returning(|_| Ok(()));
        registry
            .expect_run()
            .returning(|t, text| {
                if text.contains("explode") {
                    Err(EngineError::TranslationFailed("engine crashed".to_string()))
                } else {
                    Ok(format!("[{}] {}", t.to_code, text))
                }
            });
        let mut index = MockPackageIndex::new();
        index.expect_available_packages().never();

        Dispatcher::with_backends(
            Arc::new(registry),
            Arc::new(index),
            apertium_engine("/nonexistent/apertium"),
            std::env::temp_dir(),
        )
    }

    #[test]
    fn test_same_key_returns_same_translator() {
        let dispatcher = dispatcher_with_argos(0);
        let first = dispatcher.translator("argos", "de", "en").unwrap();
        let second = dispatcher.translator("argos", "de", "en").unwrap();
        let other = dispatcher.translator("apertium", "de", "en").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(dispatcher.cached_translators(), 2);
    }

    #[tokio::test]
    async fn test_repeated_translation_installs_once() {
        let mut seq = mockall::Sequence::new();
        let mut registry = MockModelRegistry::new();
        registry
            .expect_installed_languages()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![]));
        registry.expect_install_from_path().times(1).returning(|_| Ok(()));
        registry
            .expect_installed_languages()
            .returning(|| Ok(vec![language("de", &["en"]), language("en", &[])]));
        registry.expect_run().returning(|_, text| Ok(text.to_uppercase()));
        let mut index = MockPackageIndex::new();
        index
            .expect_available_packages()
            .times(1)
            .returning(|| Ok(vec![package("de", "en")]));
        index
            .expect_download()
            .times(1)
            .returning(|p, dir| Ok(dir.join(p.filename())));

        let dispatcher = Dispatcher::with_backends(
            Arc::new(registry),
            Arc::new(index),
            apertium_engine("/nonexistent/apertium"),
            std::env::temp_dir().join("ftm-translate-tests"),
        );

        for _ in 0..3 {
            let result = dispatcher.translate("hallo", "de", Some("en"), Some("argos")).await;
            assert_eq!(result.unwrap().as_deref(), Some("HALLO"));
        }
        assert_eq!(dispatcher.cached_translators(), 1);
    }

    #[tokio::test]
    async fn test_unknown_engine_fails_before_any_engine_call() {
        let mut registry = MockModelRegistry::new();
        registry.expect_installed_languages().never();
        let mut index = MockPackageIndex::new();
        index.expect_available_packages().never();
        let dispatcher = Dispatcher::with_backends(
            Arc::new(registry),
            Arc::new(index),
            apertium_engine("/nonexistent/apertium"),
            std::env::temp_dir(),
        );

        let err = dispatcher
            .translate("hallo", "de", Some("en"), Some("unknown"))
            .await
            .unwrap_err();
        assert!(matches!(err.engine_error(), Some(EngineError::UnsupportedEngine(_))));
        assert_eq!(err.message(), "Unsupported engine: `unknown`");

        let skipped = dispatcher
            .translate_or_skip("hallo", "de", Some("en"), Some("unknown"))
            .await;
        assert!(skipped.is_err());
        assert_eq!(dispatcher.cached_translators(), 0);
    }

    #[tokio::test]
    async fn test_engine_failures_are_normalized() {
        let dispatcher = dispatcher_with_argos(0);

        let err = dispatcher
            .translate("hallo", "de", Some("en"), Some("apertium"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.engine_error(),
            Some(EngineError::EngineNotInstalled { .. })
        ));

        let skipped = dispatcher
            .translate_or_skip("hallo", "de", Some("en"), Some("apertium"))
            .await
            .unwrap();
        assert_eq!(skipped, None);
    }

    #[tokio::test]
    async fn test_defaults_fill_missing_arguments() {
        let dispatcher = dispatcher_with_argos(0).with_defaults("argos", "en");
        let result = dispatcher.translate("Hallo", "de", None, None).await.unwrap();
        assert_eq!(result.as_deref(), Some("[en] Hallo"));
    }
}
