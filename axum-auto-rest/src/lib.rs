//! # axum-auto-rest
//!
//! Exposes the tables, views, stored procedures and functions of a SQL schema
//! as REST endpoints, easily integrable as an Axum layer.
//!
//! ## Features
//!
//! - Schema discovery of tables, views, procedures and functions at startup
//! - Per-category include/exclude policy, path prefixes and per-object aliases
//! - `GET` routes for tables and views, `POST` routes for procedures and functions
//! - Request values bound through the driver, never spliced into SQL text
//! - Support for MySQL and SQLite
//!
//! ## Security Warning
//!
//! - No authentication/authorization built-in
//! - Every admitted object is readable or invocable by any client
//! - Restrict exposure through the `build` policies before deploying
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::Router;
//! use axum_auto_rest::{AutoRestConfig, AutoRestLayer, MySqlProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AutoRestConfig::load("config.json")?;
//!     let database = MySqlProvider::connect(&config.mysql).await?;
//!
//!     let app = Router::new()
//!         .merge(AutoRestLayer::build(database, &config).await?.into_router());
//!
//!     // Serve the application...
//!     Ok(())
//! }
//! ```

// Public modules
pub mod api;
pub mod catalog;
pub mod config;
pub mod database;
pub mod layer;
pub mod policy;
pub mod report;
pub mod routes;
pub mod template;

// Public exports
pub use catalog::{Catalog, CatalogEntry, DatabaseObjectCategory};
pub use config::{AutoRestConfig, BuildConfig, Mode, MySqlSettings, ServerSettings};
pub use layer::AutoRestLayer;
pub use policy::{CategoryPolicy, IncludeMode, ObjectOverride, ParameterBinding};
pub use routes::{HttpMethod, RouteDescriptor, SynthesisRecord};
pub use template::QueryTemplate;

// Re-export database providers
pub use database::traits::{DatabaseError, DatabaseProvider};

#[cfg(feature = "mysql")]
pub use database::mysql::MySqlProvider;

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

// Error type
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot read configuration file {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cannot load {category} catalog: {source}")]
    Catalog {
        category: DatabaseObjectCategory,
        #[source]
        source: DatabaseError,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, Error>;
