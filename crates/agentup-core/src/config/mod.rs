//! Configuration: credential profiles, catalog and validation endpoints, and
//! bundle recipe policy, loaded from `config.toml`.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use schema::{
    BundleSettings, CatalogSettings, Profile, Settings, ValidationSettings,
    DEFAULT_INFRA_AGENT_RECIPE, DEFAULT_LOGGING_RECIPE,
};
pub use store::ConfigStore;
