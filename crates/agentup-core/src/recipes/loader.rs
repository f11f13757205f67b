//! Load recipe files from a URL or the local filesystem.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use url::Url;

use super::{RecipeFile, RecipeFileFetcher, http_runtime, user_agent};

pub struct RecipeFileLoader {
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for RecipeFileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeFileLoader").finish_non_exhaustive()
    }
}

impl RecipeFileLoader {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            runtime: http_runtime()?,
        })
    }

    async fn download(&self, url: &Url) -> anyhow::Result<String> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to download recipe file from {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to download recipe file: HTTP {} from {}",
                response.status(),
                url
            );
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))
    }
}

impl RecipeFileFetcher for RecipeFileLoader {
    fn fetch_from_url(&self, url: &Url) -> anyhow::Result<RecipeFile> {
        tracing::debug!(url = %url, "fetching recipe file");
        let content = self.runtime.block_on(self.download(url))?;
        RecipeFile::parse(&content).with_context(|| format!("Invalid recipe file at {}", url))
    }

    fn load_from_path(&self, path: &Path) -> anyhow::Result<RecipeFile> {
        tracing::debug!(path = %path.display(), "loading recipe file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe file: {}", path.display()))?;
        RecipeFile::parse(&content)
            .with_context(|| format!("Invalid recipe file: {}", path.display()))
    }
}
