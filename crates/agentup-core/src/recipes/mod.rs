//! Recipe sources: the backend catalog and standalone recipe files.

pub mod catalog;
pub mod file;
pub mod loader;

use std::path::Path;

use url::Url;

use crate::types::{DiscoveryManifest, Recipe};

pub use catalog::CatalogClient;
pub use file::RecipeFile;
pub use loader::RecipeFileLoader;

/// Supplies recipe definitions and recommendations.
pub trait RecipeFetcher: Send + Sync {
    fn fetch_recipe(&self, name: &str) -> anyhow::Result<Recipe>;

    fn fetch_recommendations(&self, manifest: &DiscoveryManifest) -> anyhow::Result<Vec<Recipe>>;
}

/// Loads recipe files named explicitly by the operator.
pub trait RecipeFileFetcher: Send + Sync {
    fn fetch_from_url(&self, url: &Url) -> anyhow::Result<RecipeFile>;

    fn load_from_path(&self, path: &Path) -> anyhow::Result<RecipeFile>;
}

/// Interpret an explicit recipe location: `http(s)` URLs are fetched,
/// anything else is a filesystem path.
pub fn recipe_from_location(
    fetcher: &dyn RecipeFileFetcher,
    location: &str,
) -> anyhow::Result<Recipe> {
    let file = match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetcher.fetch_from_url(&url)?,
        _ => fetcher.load_from_path(Path::new(location))?,
    };
    Ok(file.into())
}

/// Runtime used to drive async HTTP calls from synchronous collaborators.
pub(crate) fn http_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("agentup-http")
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))
}

pub(crate) fn user_agent() -> String {
    format!("agentup/{}", env!("CARGO_PKG_VERSION"))
}
