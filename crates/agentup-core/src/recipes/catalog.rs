//! HTTP client for the backend recipe catalog.

use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use url::Url;

use super::{RecipeFetcher, RecipeFile, http_runtime, user_agent};
use crate::types::{DiscoveryManifest, Recipe};

const API_KEY_HEADER: &str = "Api-Key";

/// Fetches recipes and recommendations from the catalog service.
///
/// Endpoints (relative to the configured base url):
/// - `GET recipes/{name}` returns one recipe document
/// - `POST recommendations` with the discovery manifest returns a list
pub struct CatalogClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid catalog url: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Catalog url cannot be used as a base: {}", base_url);
        }

        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
            runtime: http_runtime()?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.header(API_KEY_HEADER, &self.api_key)
        }
    }

    async fn get_recipe(&self, name: &str) -> anyhow::Result<RecipeFile> {
        let url = self.endpoint(&["recipes", name]);
        tracing::debug!(recipe = %name, url = %url, "fetching recipe");

        let response = self
            .authorized(self.http.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("Failed to reach recipe catalog at {}", url))?;

        if response.status() == StatusCode::NOT_FOUND {
            anyhow::bail!("Recipe '{}' not found in catalog", name);
        }
        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch recipe '{}': HTTP {} from {}",
                name,
                response.status(),
                url
            );
        }

        let file: RecipeFile = response
            .json()
            .await
            .with_context(|| format!("Failed to parse recipe '{}' from catalog", name))?;
        file.validate()?;
        Ok(file)
    }

    async fn post_recommendations(
        &self,
        manifest: &DiscoveryManifest,
    ) -> anyhow::Result<Vec<RecipeFile>> {
        let url = self.endpoint(&["recommendations"]);
        tracing::debug!(url = %url, "fetching recommendations");

        let response = self
            .authorized(self.http.post(url.clone()).json(manifest))
            .send()
            .await
            .with_context(|| format!("Failed to reach recipe catalog at {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch recommendations: HTTP {} from {}",
                response.status(),
                url
            );
        }

        let files: Vec<RecipeFile> = response
            .json()
            .await
            .context("Failed to parse recommendations response")?;
        for file in &files {
            file.validate()?;
        }
        Ok(files)
    }
}

impl RecipeFetcher for CatalogClient {
    fn fetch_recipe(&self, name: &str) -> anyhow::Result<Recipe> {
        let file = self.runtime.block_on(self.get_recipe(name))?;
        Ok(file.into())
    }

    fn fetch_recommendations(&self, manifest: &DiscoveryManifest) -> anyhow::Result<Vec<Recipe>> {
        let files = self.runtime.block_on(self.post_recommendations(manifest))?;
        Ok(files.into_iter().map(Recipe::from).collect())
    }
}
