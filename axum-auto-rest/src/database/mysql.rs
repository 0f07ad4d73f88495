//! MySQL database provider implementation

use crate::catalog::{group_routine_parameters, CatalogEntry, DatabaseObjectCategory};
use crate::config::MySqlSettings;
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::template::{BoundValue, QueryTemplate};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Column, MySqlPool, Row, TypeInfo, ValueRef};
use std::time::Duration;

// information_schema columns are cast to CHAR because some server versions
// report them as binary strings
const TABLES_QUERY: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR) AS name
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ?
      AND TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME
"#;

const VIEWS_QUERY: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR) AS name
    FROM information_schema.VIEWS
    WHERE TABLE_SCHEMA = ?
    ORDER BY TABLE_NAME
"#;

// The outer join keeps routines that have no parameter rows; ordinal 0 is a
// function's return value and is not a parameter
const ROUTINES_QUERY: &str = r#"
    SELECT
        CAST(r.ROUTINE_NAME AS CHAR) AS routine_name,
        CAST(p.PARAMETER_NAME AS CHAR) AS parameter_name
    FROM information_schema.ROUTINES r
    LEFT JOIN information_schema.PARAMETERS p
      ON p.SPECIFIC_SCHEMA = r.ROUTINE_SCHEMA
      AND p.SPECIFIC_NAME = r.SPECIFIC_NAME
      AND p.ROUTINE_TYPE = r.ROUTINE_TYPE
      AND p.ORDINAL_POSITION > 0
    WHERE r.ROUTINE_SCHEMA = ?
      AND r.ROUTINE_TYPE = ?
    ORDER BY r.ROUTINE_NAME, p.ORDINAL_POSITION
"#;

/// MySQL database provider
pub struct MySqlProvider {
    pool: MySqlPool,
}

impl MySqlProvider {
    /// Create a new MySQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - MySQL connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool sized and timed by the `mysql` configuration block
    pub async fn connect(settings: &MySqlSettings) -> Result<Self, DatabaseError> {
        let mut options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .database(&settings.database);

        if let Some(password) = settings.password.as_deref() {
            options = options.password(password);
        }
        if let Some(charset) = settings.charset.as_deref() {
            options = options.charset(charset);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(settings.connection_limit)
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout))
            .connect_with(options)
            .await?;

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            max_connections = settings.connection_limit,
            acquire_timeout_ms = settings.acquire_timeout,
            "Connected to MySQL"
        );

        Ok(Self::new(pool))
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Quote an identifier with backticks, doubling embedded backticks
    fn quote(identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    async fn fetch_named_objects(
        &self,
        query: &str,
        schema: &str,
        category: DatabaseObjectCategory,
    ) -> Result<Vec<CatalogEntry>, DatabaseError> {
        let rows = sqlx::query(query)
            .bind(schema)
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

    async fn fetch_routines(
        &self,
        schema: &str,
        routine_type: &str,
        category: DatabaseObjectCategory,
    ) -> Result<Vec<CatalogEntry>, DatabaseError> {
        let rows = sqlx::query(ROUTINES_QUERY)
            .bind(schema)
            .bind(routine_type)
            .fetch_all(&self.pool)
            .await?;

        let pairs = rows
            .iter()
            .map(|row| {
                let routine: String = row.try_get("routine_name")?;
                let parameter: Option<String> = row.try_get("parameter_name")?;
                Ok((routine, parameter))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(group_routine_parameters(category, pairs))
    }

    fn bind_value(
        query: Query<'_, MySql, MySqlArguments>,
        value: BoundValue,
    ) -> Query<'_, MySql, MySqlArguments> {
        match value {
            BoundValue::Null => query.bind(None::<String>),
            BoundValue::Bool(flag) => query.bind(flag),
            BoundValue::Integer(integer) => query.bind(integer),
            BoundValue::Unsigned(unsigned) => query.bind(unsigned),
            BoundValue::Float(float) => query.bind(float),
            BoundValue::Text(text) => query.bind(text),
        }
    }

    /// Convert a MySQL row to a JSON object
    fn row_to_json(row: &MySqlRow) -> Result<Value, DatabaseError> {
        let mut map = Map::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(Value::Object(map))
    }

    /// Extract a column value from a MySQL row and convert to JSON
    fn extract_column_value(
        row: &MySqlRow,
        column: &sqlx::mysql::MySqlColumn,
    ) -> Result<Value, DatabaseError> {
        let index = column.ordinal();

        if row.try_get_raw(index)?.is_null() {
            return Ok(Value::Null);
        }

        let type_name = column.type_info().name();

        let value = match type_name {
            "NULL" => Value::Null,
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                Value::Number(row.try_get_unchecked::<i64, _>(index)?.into())
            }
            name if name.ends_with(" UNSIGNED") => {
                Value::Number(row.try_get_unchecked::<u64, _>(index)?.into())
            }
            "FLOAT" => {
                let value = row.try_get_unchecked::<f32, _>(index)?;
                serde_json::Number::from_f64(value as f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            "DOUBLE" => {
                let value = row.try_get_unchecked::<f64, _>(index)?;
                serde_json::Number::from_f64(value)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
            "DATETIME" => Value::String(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
            "TIMESTAMP" => Value::String(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
            "TIME" => Value::String(row.try_get::<NaiveTime, _>(index)?.to_string()),
            "JSON" => {
                let text = row.try_get_unchecked::<String, _>(index)?;
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            "BIT" => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                let bits = bytes
                    .iter()
                    .fold(0u64, |accumulator, byte| (accumulator << 8) | u64::from(*byte));
                Value::Number(bits.into())
            }
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB"
            | "GEOMETRY" => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                match String::from_utf8(bytes) {
                    Ok(text) => Value::String(text),
                    Err(error) => {
                        Value::String(format!("[BLOB: {} bytes]", error.as_bytes().len()))
                    }
                }
            }
            // DECIMAL keeps its precision as text, like every character type
            _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
        };

        Ok(value)
    }
}

#[async_trait]
impl DatabaseProvider for MySqlProvider {
    async fn fetch_tables(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        self.fetch_named_objects(TABLES_QUERY, schema, DatabaseObjectCategory::Table)
            .await
    }

    async fn fetch_views(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        self.fetch_named_objects(VIEWS_QUERY, schema, DatabaseObjectCategory::View)
            .await
    }

    async fn fetch_procedures(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        self.fetch_routines(schema, "PROCEDURE", DatabaseObjectCategory::Procedure)
            .await
    }

    async fn fetch_functions(&self, schema: &str) -> Result<Vec<CatalogEntry>, DatabaseError> {
        self.fetch_routines(schema, "FUNCTION", DatabaseObjectCategory::Function)
            .await
    }

    async fn run(
        &self,
        template: &QueryTemplate,
        parameters: &Map<String, Value>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let compiled = template.compile(parameters);

        // Returned to the pool when dropped, on success and on error alike
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
