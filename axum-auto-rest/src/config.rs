//! Configuration file
//!
//! The file is JSON with four top-level blocks: `mode`, `express` (listener),
//! `mysql` (connection pool) and `build` (one exposure policy per category).
//! Existing configuration files depend on these exact key names.

use crate::catalog::DatabaseObjectCategory;
use crate::policy::CategoryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRestConfig {
    /// `dev` enables permissive CORS
    #[serde(default)]
    pub mode: Mode,

    /// HTTP listener settings
    pub express: ServerSettings,

    /// Database connection settings
    pub mysql: MySqlSettings,

    /// Per-category exposure policies
    pub build: BuildConfig,
}

/// Deployment mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Dev,
    #[default]
    #[serde(other)]
    Prod,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// TCP port to listen on
    pub port: u16,

    /// Path under which every generated route is mounted
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_base_path() -> String {
    "/".to_string()
}

impl ServerSettings {
    /// Base path with a leading and no trailing slash; empty when routes are mounted at the root
    pub fn mount_path(&self) -> String {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// URL under which a generated route is reachable from the local machine
    pub fn public_url(&self, path: &str) -> String {
        format!("http://localhost:{}{}/{}", self.port, self.mount_path(), path)
    }
}

/// Database connection and pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MySqlSettings {
    pub host: String,

    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Schema whose objects are exposed; also the connection's default database
    pub database: String,

    #[serde(default)]
    pub charset: Option<String>,

    /// Maximum number of live connections in the pool
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,

    /// Milliseconds to wait for a pooled connection before failing
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: u64,
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_connection_limit() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    10_000
}

/// Exposure policies, one per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub tables: CategoryPolicy,
    pub views: CategoryPolicy,
    pub procedures: CategoryPolicy,
    pub functions: CategoryPolicy,
}

impl BuildConfig {
    /// Policy governing a category
    pub fn policy(&self, category: DatabaseObjectCategory) -> &CategoryPolicy {
        match category {
            DatabaseObjectCategory::Table => &self.tables,
            DatabaseObjectCategory::View => &self.views,
            DatabaseObjectCategory::Procedure => &self.procedures,
            DatabaseObjectCategory::Function => &self.functions,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tables: CategoryPolicy::include_all(),
            views: CategoryPolicy::include_all(),
            procedures: CategoryPolicy::include_all(),
            functions: CategoryPolicy::include_all(),
        }
    }
}

impl AutoRestConfig {
    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| crate::Error::Config {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::from_json(&contents)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse configuration from JSON text
    pub fn from_json(contents: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::IncludeMode;

    const SAMPLE: &str = r#"{
        "mode": "dev",
        "express": { "port": 3000, "basePath": "/api" },
        "mysql": {
            "host": "localhost",
            "user": "root",
            "password": "secret",
            "port": 3306,
            "database": "shop",
            "charset": "utf8mb4",
            "connectionLimit": 5,
            "acquireTimeout": 2000
        },
        "build": {
            "tables": { "prefix": null, "include": "all", "except": { "audit_log": true }, "config": {} },
            "views": { "prefix": "view_", "include": "all", "except": {}, "config": {
                "monthly_sales": { "alias": "sales", "ignorePrefix": true }
            } },
            "procedures": { "prefix": null, "include": "none", "except": { "CalcTotal": true }, "config": {
                "CalcTotal": { "aliasParams": { "qty": "quantity" } }
            } },
            "functions": { "prefix": "fn_", "include": "all", "except": {}, "config": {} }
        }
    }"#;

    #[test]
    fn test_parse_full_configuration() {
        let config = AutoRestConfig::from_json(SAMPLE).unwrap();

        assert_eq!(config.mode, Mode::Dev);
        assert_eq!(config.express.port, 3000);
        assert_eq!(config.express.base_path, "/api");
        assert_eq!(config.mysql.database, "shop");
        assert_eq!(config.mysql.connection_limit, 5);
        assert_eq!(config.mysql.acquire_timeout, 2000);
        assert_eq!(config.build.procedures.include, IncludeMode::None);
        assert_eq!(
            config.build.policy(DatabaseObjectCategory::View).prefix.as_deref(),
            Some("view_")
        );
        assert!(!config.build.tables.should_expose("audit_log"));
    }

    #[test]
    fn test_defaults_for_optional_keys() {
        let json = r#"{
            "express": { "port": 8080 },
            "mysql": { "host": "db", "user": "app", "database": "shop" },
            "build": {
                "tables": { "include": "all" },
                "views": { "include": "all" },
                "procedures": { "include": "none" },
                "functions": { "include": "none" }
            }
        }"#;

        let config = AutoRestConfig::from_json(json).unwrap();
        assert_eq!(config.mode, Mode::Prod);
        assert_eq!(config.express.base_path, "/");
        assert_eq!(config.mysql.port, 3306);
        assert_eq!(config.mysql.connection_limit, 10);
        assert!(config.mysql.password.is_none());
    }

    #[test]
    fn test_unknown_mode_is_production() {
        let config: Mode = serde_json::from_str("\"staging\"").unwrap();
        assert_eq!(config, Mode::Prod);
    }

    #[test]
    fn test_missing_build_block_is_rejected() {
        let json = r#"{
            "express": { "port": 8080 },
            "mysql": { "host": "db", "user": "app", "database": "shop" }
        }"#;

        assert!(AutoRestConfig::from_json(json).is_err());
    }

    #[test]
    fn test_public_url() {
        let mut server = ServerSettings {
            port: 3000,
            base_path: "/api".to_string(),
        };
        assert_eq!(server.public_url("users"), "http://localhost:3000/api/users");

        server.base_path = "/".to_string();
        assert_eq!(server.mount_path(), "");
        assert_eq!(server.public_url("users"), "http://localhost:3000/users");

        server.base_path = "v1/".to_string();
        assert_eq!(server.mount_path(), "/v1");
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let error = AutoRestConfig::load("/nonexistent/auto-rest.json").unwrap_err();

        assert!(error.to_string().contains("/nonexistent/auto-rest.json"));
    }
}
