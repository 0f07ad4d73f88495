//! SQLite database provider implementation
//!
//! SQLite has no stored routines, so only tables and views are discovered.

use crate::catalog::{CatalogEntry, DatabaseObjectCategory};
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::template::{BoundValue, QueryTemplate};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Quote an identifier (table or column name) to prevent SQL injection
    ///
    /// SQLite uses double quotes for identifiers. This function escapes any
    /// double quotes in the identifier by doubling them.
    fn quote(identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    async fn fetch_objects(
        &self,
        schema: &str,
        object_type: &str,
        category: DatabaseObjectCategory,
    ) -> Result<Vec<CatalogEntry>, DatabaseError> {
        // The schema name cannot be bound, only quoted
        let query = format!(
            "SELECT name FROM {}.sqlite_master WHERE type = ? AND name NOT LIKE 'sqlite_%' ORDER BY name",
            Self::quote(schema)
        );

        let rows = sqlx::query(&query)
            .bind(object_type)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                Ok(CatalogEntry::readable(category, name))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(entries)
    }

    fn bind_value<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: BoundValue,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            BoundValue::Null => query.bind(None::<String>),
            BoundValue::Bool(flag) => query.bind(flag),
            BoundValue::Integer(integer) => query.bind(integer),
            // SQLite integers are signed 64-bit; the exact digits go through as text
            BoundValue::Unsigned(unsigned) => query.bind(unsigned.to_string()),
            BoundValue::Float(float) => query.bind(float),
            BoundValue::Text(text) => query.bind(text),
        }
    }

    /// Convert a SQLite row to a JSON object
    fn row_to_json(row: &SqliteRow) -> Result<Value, DatabaseError> {
        let mut map = Map::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(Value::Object(map))
    }

    /// Extract a column value from a SQLite row and convert to JSON
    ///
    /// SQLite is dynamically typed, so the storage class of the value decides
    /// the JSON type. The declared type is only consulted for booleans.
    fn extract_column_value(
        row: &SqliteRow,
        column: &sqlx::sqlite::SqliteColumn,
    ) -> Result<Value, DatabaseError> {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        if raw.is_null() {
            return Ok(Value::Null);
        }

        let storage_class = raw.type_info().name().to_uppercase();
        let declared_type = column.type_info().name().to_uppercase();

        let value = match (declared_type.as_str(), storage_class.as_str()) {
            ("BOOLEAN" | "BOOL", "INTEGER") => {
                Value::Bool(row.try_get_unchecked::<bool, _>(index)?)
            }
            (_, "INTEGER") => Value::Number(row.try_get_unchecked::<i64, _>(index)?.into()),
            (_, "REAL") => {
                let value = row.try_get_unchecked::<f64, _>(index)?;
                serde_json::Number::from_f64(value)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            (_, "BLOB") => {
                let value = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                Value::String(format!("[BLOB: {} bytes]", value.len()))
            }
            _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
        };

        Ok(value)
    }
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    async fn fetch_tables(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        self.fetch_objects(schema, "table", DatabaseObjectCategory::Table)
            .await
    }

    async fn fetch_views(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        self.fetch_objects(schema, "view", DatabaseObjectCategory::View)
            .await
    }

    async fn fetch_procedures(&self, _schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        Ok(Vec::new())
    }

    async fn fetch_functions(&self, _schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        Ok(Vec::new())
    }

    async fn run(
        &self,
        template: &QueryTemplate,
        parameters: &Map<String, Value>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let compiled = template.compile(parameters);

        // Held until the end of this function, returned to the pool on drop
        let mut connection = self.pool.acquire().await?;

        let mut query = sqlx::query(&compiled.sql);
        for value in compiled.values {
            query = Self::bind_value(query, value);
        }

        let rows = query.fetch_all(&mut *connection).await?;

        rows.iter().map(Self::row_to_json).collect()
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        Self::quote(identifier)
    }
}
