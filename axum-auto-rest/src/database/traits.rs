//! Database provider trait
//!
//! This trait defines the interface that all database implementations must provide.

use crate::catalog::CatalogEntry;
use crate::template::QueryTemplate;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Database provider trait for catalog discovery and template execution
///
/// Implementations own the connection pool. They are constructed by the
/// application and shared with the router behind an `Arc`.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// List the base tables of a schema
    async fn fetch_tables(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError>;

    /// List the views of a schema
    async fn fetch_views(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError>;

    /// List the stored procedures of a schema with their ordered parameter names
    ///
    /// Procedures without parameters must be included with an empty list.
    async fn fetch_procedures(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError>;

    /// List the stored functions of a schema with their ordered parameter names
    ///
    /// Functions without parameters must be included with an empty list.
    async fn fetch_functions(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError>;

    /// Execute a query template with named parameter values
    ///
    /// # Arguments
    ///
    /// * `template` - Statement text with `:name` placeholders
    /// * `parameters` - Values keyed by placeholder name
    ///
    /// # Returns
    ///
    /// Every returned row as a JSON object keyed by column name
    async fn run(
        &self,
        template: &QueryTemplate,
        parameters: &Map<String, Value>,
    ) -> Result<Vec<Value>, DatabaseError>;

    /// Quote an identifier (object name) for use in generated statements
    fn quote_identifier(&self, identifier: &str) -> String;
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Statement rejected or failed by the database
    #[error("Database error: {message}")]
    Query {
        message: String,
        /// SQLSTATE or vendor code, when the driver reports one
        code: Option<String>,
    },

    /// No connection could be acquired from the pool
    #[error("Connection unavailable: {0}")]
    Acquire(String),

    /// Row value could not be converted to JSON
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatabaseError {
    /// Short machine readable kind used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseError::Query { .. } => "query",
            DatabaseError::Acquire(_) => "acquire",
            DatabaseError::Serialization(_) => "serialization",
        }
    }

    /// Driver reported error code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::Acquire(error.to_string())
            }
            sqlx::Error::Database(database_error) => DatabaseError::Query {
                message: database_error.message().to_string(),
                code: database_error.code().map(|code| code.into_owned()),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::Serialization(error.to_string())
            }
            other => DatabaseError::Query {
                message: other.to_string(),
                code: None,
            },
        }
    }
}
