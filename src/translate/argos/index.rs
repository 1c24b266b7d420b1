use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::EngineError;
use super::{AvailablePackage, PackageIndex};

/// The argospm package index, fetched over HTTP
pub struct RemotePackageIndex {
    client: Client,
    index_url: String,
}

impl RemotePackageIndex {
    pub fn new<S: Into<String>>(index_url: S) -> Result<Self, EngineError> {
        let client = Client::builder()
            .user_agent(concat!("ftm-translate/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30 * 60))
            .build()?;

        Ok(Self {
            client,
            index_url: index_url.into(),
        })
    }
}

#[async_trait]
impl PackageIndex for RemotePackageIndex {
    async fn available_packages(&self) -> Result<Vec<AvailablePackage>, EngineError> {
        debug!("Fetching argos package index from {}", self.index_url);
        let packages: Vec<AvailablePackage> = self
            .client
            .get(&self.index_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Package index lists {} packages", packages.len());
        Ok(packages)
    }

    async fn download(&self, package: &AvailablePackage, dest_dir: &Path) -> Result<PathBuf, EngineError> {
        let url = package.links.first().ok_or_else(|| {
            EngineError::Archive(format!("Package {} has no download link", package.filename()))
        })?;
        let local_path = dest_dir.join(package.filename());

        info!("Downloading {} ...", url);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(package.filename());

        let mut response = self.client.get(url).send().await?.error_for_status()?;
        if let Some(length) = response.content_length() {
            pb.set_length(length);
        }

        let mut file = tokio::fs::File::create(&local_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;

        pb.finish_with_message(format!("Downloaded {}", package.filename()));
        info!("Downloaded {} to {}", package.filename(), local_path.display());

        Ok(local_path)
    }
}
