// Managed-model engine built on argos-translate language packages.
//
// - registry: installed packages on disk, and running a translation
// - index: the remote package index packages are downloaded from

pub mod index;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Span};

pub use index::RemotePackageIndex;
pub use registry::ArgosRegistry;

use crate::error::EngineError;
use crate::language::LanguagePair;
use super::{Engine, Readiness, Translator, translator_span};

/// A direct translation between two installed languages
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub from_code: String,
    pub to_code: String,
    pub package_path: PathBuf,
}

/// A language known to the local registry, with the direct translations
/// installed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledLanguage {
    pub code: String,
    pub name: String,
    pub translations: Vec<Transformation>,
}

impl InstalledLanguage {
    pub fn translation_to(&self, target: &InstalledLanguage) -> Option<&Transformation> {
        self.translations.iter().find(|t| t.to_code == target.code)
    }
}

/// A package offered by the remote index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailablePackage {
    pub from_code: String,
    pub to_code: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub to_name: String,
    #[serde(default)]
    pub package_version: String,
    #[serde(default)]
    pub links: Vec<String>,
}

impl AvailablePackage {
    /// File name of the downloaded archive
    pub fn filename(&self) -> String {
        format!(
            "translate-{}_{}-{}.argosmodel",
            self.from_code,
            self.to_code,
            self.package_version.replace('.', "_")
        )
    }
}

/// Locally installed models
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Installed languages in registry order
    async fn installed_languages(&self) -> Result<Vec<InstalledLanguage>, EngineError>;

    /// Install a downloaded package archive
    async fn install_from_path(&self, path: &Path) -> Result<(), EngineError>;

    /// Run one installed translation over `text`
    async fn run(&self, transformation: &Transformation, text: &str) -> Result<String, EngineError>;
}

/// Remote catalogue of installable packages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageIndex: Send + Sync {
    async fn available_packages(&self) -> Result<Vec<AvailablePackage>, EngineError>;

    /// Download `package` into `dest_dir` and return the archive path
    async fn download(&self, package: &AvailablePackage, dest_dir: &Path) -> Result<PathBuf, EngineError>;
}

/// Neural translator over argos language packages. A missing pair is
/// fetched from the package index and installed on first use.
pub struct ArgosTranslator {
    pair: LanguagePair,
    source_code: String,
    target_code: String,
    registry: Arc<dyn ModelRegistry>,
    index: Arc<dyn PackageIndex>,
    download_dir: PathBuf,
    readiness: Readiness,
    span: Span,
}

impl ArgosTranslator {
    pub fn new(
        pair: LanguagePair,
        registry: Arc<dyn ModelRegistry>,
        index: Arc<dyn PackageIndex>,
        download_dir: PathBuf,
    ) -> Self {
        let (source_code, target_code) = pair.alpha2();
        let span = translator_span(Engine::Argos, &pair);
        span.in_scope(|| info!("Initializing translator ..."));

        Self {
            pair,
            source_code,
            target_code,
            registry,
            index,
            download_dir,
            readiness: Readiness::new(),
            span,
        }
    }

    fn find_language<'a>(languages: &'a [InstalledLanguage], code: &str) -> Option<&'a InstalledLanguage> {
        languages.iter().find(|lang| lang.code == code)
    }

    fn has_direct_translation(&self, languages: &[InstalledLanguage]) -> bool {
        match (
            Self::find_language(languages, &self.source_code),
            Self::find_language(languages, &self.target_code),
        ) {
            (Some(source), Some(target)) => source.translation_to(target).is_some(),
            _ => false,
        }
    }

    async fn install_pair(&self) -> Result<(), EngineError> {
        info!("Language pair not installed, searching package index ...");
        let package = self
            .index
            .available_packages()
            .await?
            .into_iter()
            .find(|p| p.from_code == self.source_code && p.to_code == self.target_code)
            .ok_or_else(|| EngineError::PackageNotFound {
                source_lang: self.source_code.clone(),
                target_lang: self.target_code.clone(),
            })?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let download = tempfile::tempdir_in(&self.download_dir)?;

        info!(
            "Installing argos package {} -> {} ({})",
            package.from_code, package.to_code, package.package_version
        );
        let archive = self.index.download(&package, download.path()).await?;
        self.registry.install_from_path(&archive).await?;
        info!("Installed argos package {}", package.filename());
        Ok(())
    }
}

#[async_trait]
impl Translator for ArgosTranslator {
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
        let languages = self.registry.installed_languages().await?;
        if self.has_direct_translation(&languages) {
            return Ok(());
        }
        self.install_pair().await
    }

    async fn translate_text(&self, text: &str) -> Result<String, EngineError> {
        // the registry may change between calls, so resolve it every time
        let languages = self.registry.installed_languages().await?;

        let source = Self::find_language(&languages, &self.source_code)
            .ok_or_else(|| EngineError::SourceNotFound(self.source_code.clone()))?;
        let target = Self::find_language(&languages, &self.target_code)
            .ok_or_else(|| EngineError::TargetNotFound(self.target_code.clone()))?;
        let transformation = source
            .translation_to(target)
            .ok_or_else(|| EngineError::NoTransformation {
                source_lang: self.source_code.clone(),
                target_lang: self.target_code.clone(),
            })?;

        self.registry.run(transformation, text).await
    }
}
