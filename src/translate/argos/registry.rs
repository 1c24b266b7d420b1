use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ArgosConfig;
use crate::error::EngineError;
use crate::process::ExternalCommand;
use super::{InstalledLanguage, ModelRegistry, Transformation};

const ENGINE: &str = "argos-translate";
const METADATA_FILE: &str = "metadata.json";

/// `metadata.json` found at the root of every argos package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub from_code: String,
    pub to_code: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub to_name: String,
    #[serde(default)]
    pub package_version: String,
}

/// Argos packages installed in one directory. Translations run through the
/// `argos-translate` command line pointed at that directory.
pub struct ArgosRegistry {
    packages_dir: PathBuf,
    binary_path: String,
    timeout: Duration,
}

impl ArgosRegistry {
    pub fn new(config: &ArgosConfig, packages_dir: PathBuf) -> Self {
        Self {
            packages_dir,
            binary_path: config.binary_path.clone(),
            timeout: config.timeout(),
        }
    }

    /// Directory the packages are installed into
    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    /// Installed packages, ordered by package directory name.
    /// Blocks on the file system.
    pub fn installed_packages(&self) -> Vec<(PathBuf, PackageMetadata)> {
        Self::scan_packages(&self.packages_dir)
    }

    fn scan_packages(packages_dir: &Path) -> Vec<(PathBuf, PackageMetadata)> {
        if !packages_dir.is_dir() {
            return Vec::new();
        }

        WalkDir::new(packages_dir)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() == METADATA_FILE)
            .filter_map(|entry| {
                let content = fs::read_to_string(entry.path()).ok()?;
                match serde_json::from_str::<PackageMetadata>(&content) {
                    Ok(metadata) => {
                        let package_dir = entry.path().parent()?.to_path_buf();
                        Some((package_dir, metadata))
                    }
                    Err(e) => {
                        warn!("Skipping argos package {}: {}", entry.path().display(), e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Group packages into languages, in first-seen order
    fn languages_from_packages(packages: Vec<(PathBuf, PackageMetadata)>) -> Vec<InstalledLanguage> {
        let mut languages: Vec<InstalledLanguage> = Vec::new();

        fn entry<'a>(
            languages: &'a mut Vec<InstalledLanguage>,
            code: &str,
            name: &str,
        ) -> &'a mut InstalledLanguage {
            let idx = match languages.iter().position(|l| l.code == code) {
                Some(idx) => idx,
                None => {
                    languages.push(InstalledLanguage {
                        code: code.to_string(),
                        name: name.to_string(),
                        translations: Vec::new(),
                    });
                    languages.len() - 1
                }
            };
            &mut languages[idx]
        }

        for (package_path, metadata) in packages {
            entry(&mut languages, &metadata.to_code, &metadata.to_name);
            entry(&mut languages, &metadata.from_code, &metadata.from_name)
                .translations
                .push(Transformation {
                    from_code: metadata.from_code.clone(),
                    to_code: metadata.to_code.clone(),
                    package_path,
                });
        }

        languages
    }

    fn extract_archive(archive_path: &Path, packages_dir: &Path) -> Result<(), EngineError> {
        fs::create_dir_all(packages_dir)?;

        let file = fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| EngineError::Archive(format!("{}: {}", archive_path.display(), e)))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| EngineError::Archive(e.to_string()))?;
            let Some(relative) = entry.enclosed_name() else {
                warn!("Skipping unsafe archive entry {}", entry.name());
                continue;
            };
            let outpath = packages_dir.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut outfile = fs::File::create(&outpath)?;
                std::io::copy(&mut entry, &mut outfile)?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ModelRegistry for ArgosRegistry {
    async fn installed_languages(&self) -> Result<Vec<InstalledLanguage>, EngineError> {
        let packages_dir = self.packages_dir.clone();
        let packages = tokio::task::spawn_blocking(move || Self::scan_packages(&packages_dir))
            .await
            .map_err(std::io::Error::other)?;
        debug!("Found {} installed argos packages", packages.len());
        Ok(Self::languages_from_packages(packages))
    }

    async fn install_from_path(&self, path: &Path) -> Result<(), EngineError> {
        info!("Installing {} into {}", path.display(), self.packages_dir.display());
        let archive = path.to_path_buf();
        let packages_dir = self.packages_dir.clone();

        tokio::task::spawn_blocking(move || Self::extract_archive(&archive, &packages_dir))
            .await
            .map_err(|e| EngineError::Archive(format!("Extraction task failed: {}", e)))?
    }

    async fn run(&self, transformation: &Transformation, text: &str) -> Result<String, EngineError> {
        let output = ExternalCommand::new(
            &self.binary_path,
            format!("Argos translation {} -> {}", transformation.from_code, transformation.to_code),
        )
        .arg("--from-lang")
        .arg(&transformation.from_code)
        .arg("--to-lang")
        .arg(&transformation.to_code)
        .env("ARGOS_PACKAGES_DIR", self.packages_dir.to_string_lossy())
        .stdin(text)
        .timeout(self.timeout)
        .execute()
        .await
        .map_err(|e| EngineError::from_command(ENGINE, e))?;

        Ok(output.stdout.trim_end_matches(['\n', '\r']).to_string())
    }
}
