//! AutoRestLayer - Main Axum integration layer
//!
//! This module provides the main entry point: discover a schema, synthesize
//! its routes and hand them out as a mergeable Axum router.

use crate::api::create_api_router;
use crate::catalog::Catalog;
use crate::config::{AutoRestConfig, BuildConfig, Mode, ServerSettings};
use crate::database::traits::DatabaseProvider;
use crate::report;
use crate::routes::{resolve_routes, synthesize, RouteDescriptor, SynthesisRecord};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[cfg(feature = "mysql")]
use crate::database::mysql::MySqlProvider;

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteProvider;

/// Generated REST surface of one schema
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_auto_rest::{AutoRestLayer, BuildConfig, ServerSettings};
/// use sqlx::SqlitePool;
///
/// # async fn example() -> axum_auto_rest::Result<()> {
/// let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
/// let server = ServerSettings { port: 3000, base_path: "/api".to_string() };
/// let layer = AutoRestLayer::sqlite(pool, "main", &BuildConfig::default(), &server).await?;
/// let app = Router::new().merge(layer.into_router());
/// # Ok(())
/// # }
/// ```
pub struct AutoRestLayer<DB: DatabaseProvider> {
    base_path: String,
    database: Arc<DB>,
    records: Vec<SynthesisRecord>,
    routes: Vec<RouteDescriptor>,
    permissive_cors: bool,
}

impl<DB: DatabaseProvider> AutoRestLayer<DB> {
    /// Discover the configured schema and generate its routes
    ///
    /// Fails without generating anything when any of the four catalog
    /// fetches fails.
    pub async fn build(database: DB, config: &AutoRestConfig) -> crate::Result<Self> {
        let layer =
            Self::discover(database, &config.mysql.database, &config.build, &config.express)
                .await?;
        Ok(layer.permissive_cors(config.mode == Mode::Dev))
    }

    /// Discover `schema` and generate its routes under `server`'s base path
    ///
    /// # Arguments
    ///
    /// * `database` - The database provider implementation
    /// * `schema` - Schema whose objects are exposed
    /// * `build` - Per-category exposure policies
    /// * `server` - Listener settings, used for the base path and logged URLs
    pub async fn discover(
        database: DB,
        schema: &str,
        build: &BuildConfig,
        server: &ServerSettings,
    ) -> crate::Result<Self> {
        let catalog = Catalog::fetch(&database, schema).await?;
        tracing::info!(schema, objects = catalog.len(), "catalog loaded");

        let records = synthesize(&catalog, build, |identifier| {
            database.quote_identifier(identifier)
        });
        report::emit(&records, server);
        let routes = resolve_routes(&records);

        Ok(Self {
            base_path: server.mount_path(),
            database: Arc::new(database),
            records,
            routes,
            permissive_cors: false,
        })
    }

    /// Allow any origin, method and header on the generated routes
    pub fn permissive_cors(mut self, enabled: bool) -> Self {
        self.permissive_cors = enabled;
        self
    }

    /// Synthesis outcome of every catalog entry, admitted or ignored
    pub fn records(&self) -> &[SynthesisRecord] {
        &self.records
    }

    /// Routes that will be served, in registration order
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// Every route is mounted under the base path. A base path of `/` mounts
    /// them at the root.
    pub fn into_router(self) -> Router {
        let api_router = create_api_router(self.database, &self.routes);

        let router = if self.base_path.is_empty() {
            api_router
        } else {
            Router::new().nest(&self.base_path, api_router)
        };

        if self.permissive_cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }
}

#[cfg(feature = "mysql")]
impl AutoRestLayer<MySqlProvider> {
    /// Generate routes for the configured MySQL schema over an existing pool
    pub async fn mysql(pool: sqlx::MySqlPool, config: &AutoRestConfig) -> crate::Result<Self> {
        Self::build(MySqlProvider::new(pool), config).await
    }
}

#[cfg(feature = "sqlite")]
impl AutoRestLayer<SqliteProvider> {
    /// Generate routes for an attached SQLite schema, usually `main`
    pub async fn sqlite(
        pool: sqlx::SqlitePool,
        schema: &str,
        build: &BuildConfig,
        server: &ServerSettings,
    ) -> crate::Result<Self> {
        Self::discover(SqliteProvider::new(pool), schema, build, server).await
    }
}
