//! Schema catalog types and discovery
//!
//! The catalog is the set of database objects discovered once at startup.
//! It is never refreshed while the process runs.

use crate::database::traits::{DatabaseError, DatabaseProvider};
use serde::Serialize;
use std::fmt;

/// Kind of database object that can be exposed as a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseObjectCategory {
    Table,
    View,
    Procedure,
    Function,
}

impl DatabaseObjectCategory {
    /// All categories in synthesis order
    pub const ALL: [DatabaseObjectCategory; 4] = [
        DatabaseObjectCategory::Table,
        DatabaseObjectCategory::View,
        DatabaseObjectCategory::Procedure,
        DatabaseObjectCategory::Function,
    ];

    /// Procedures and functions take an ordered parameter list and are invoked
    pub fn is_invocable(self) -> bool {
        matches!(
            self,
            DatabaseObjectCategory::Procedure | DatabaseObjectCategory::Function
        )
    }

    /// Plural label used in startup output and in the `build` configuration block
    pub fn plural(self) -> &'static str {
        match self {
            DatabaseObjectCategory::Table => "tables",
            DatabaseObjectCategory::View => "views",
            DatabaseObjectCategory::Procedure => "procedures",
            DatabaseObjectCategory::Function => "functions",
        }
    }
}

impl fmt::Display for DatabaseObjectCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatabaseObjectCategory::Table => "table",
            DatabaseObjectCategory::View => "view",
            DatabaseObjectCategory::Procedure => "procedure",
            DatabaseObjectCategory::Function => "function",
        };
        formatter.write_str(label)
    }
}

/// A single discovered database object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Kind of object
    pub category: DatabaseObjectCategory,

    /// Object name, unique within its category
    pub name: String,

    /// Declared parameter names in ordinal order (always empty for tables and views)
    pub parameters: Vec<String>,
}

impl CatalogEntry {
    /// Create an entry for a table or view
    pub fn readable(category: DatabaseObjectCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Create an entry for a procedure or function
    pub fn invocable(
        category: DatabaseObjectCategory,
        name: impl Into<String>,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            category,
            name: name.into(),
            parameters,
        }
    }
}

/// Fold `(routine, parameter)` metadata rows into one entry per routine
///
/// Rows must already be ordered by ordinal position within each routine.
/// Routines keep their first-appearance order. A row with no parameter name
/// (the outer-joined row of a routine without parameters) still creates the
/// entry, so zero-parameter routines are never dropped.
pub fn group_routine_parameters(
    category: DatabaseObjectCategory,
    rows: impl IntoIterator<Item = (String, Option<String>)>,
) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = Vec::new();

    for (routine, parameter) in rows {
        let position = match entries.iter().position(|entry| entry.name == routine) {
            Some(position) => position,
            None => {
                entries.push(CatalogEntry::invocable(category, routine, Vec::new()));
                entries.len() - 1
            }
        };

        if let Some(parameter) = parameter.filter(|name| !name.is_empty()) {
            entries[position].parameters.push(parameter);
        }
    }

    entries
}

/// Every object discovered in the configured schema
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tables: Vec<CatalogEntry>,
    pub views: Vec<CatalogEntry>,
    pub procedures: Vec<CatalogEntry>,
    pub functions: Vec<CatalogEntry>,
}

impl Catalog {
    /// Run the four catalog fetches concurrently
    ///
    /// All four must succeed. A single failed fetch fails the whole catalog,
    /// since serving a partial route table is unsafe.
    pub async fn fetch<DB: DatabaseProvider>(database: &DB, schema: &str) -> crate::Result<Self> {
        let (tables, views, procedures, functions) = tokio::try_join!(
            Self::fetch_category(database, schema, DatabaseObjectCategory::Table),
            Self::fetch_category(database, schema, DatabaseObjectCategory::View),
            Self::fetch_category(database, schema, DatabaseObjectCategory::Procedure),
            Self::fetch_category(database, schema, DatabaseObjectCategory::Function),
        )?;

        Ok(Self {
            tables,
            views,
            procedures,
            functions,
        })
    }

    async fn fetch_category<DB: DatabaseProvider>(
        database: &DB,
        schema: &str,
        category: DatabaseObjectCategory,
    ) -> crate::Result<Vec<CatalogEntry>> {
        let result: Result<Vec<CatalogEntry>, DatabaseError> = match category {
            DatabaseObjectCategory::Table => database.fetch_tables(schema).await,
            DatabaseObjectCategory::View => database.fetch_views(schema).await,
            DatabaseObjectCategory::Procedure => database.fetch_procedures(schema).await,
            DatabaseObjectCategory::Function => database.fetch_functions(schema).await,
        };

        match result {
            Ok(entries) => {
                tracing::debug!(category = %category, count = entries.len(), "catalog fetched");
                Ok(entries)
            }
            Err(source) => {
                tracing::error!(category = %category, schema, error = %source, "catalog fetch failed");
                Err(crate::Error::Catalog { category, source })
            }
        }
    }

    /// Entries of one category
    pub fn entries(&self, category: DatabaseObjectCategory) -> &[CatalogEntry] {
        match category {
            DatabaseObjectCategory::Table => &self.tables,
            DatabaseObjectCategory::View => &self.views,
            DatabaseObjectCategory::Procedure => &self.procedures,
            DatabaseObjectCategory::Function => &self.functions,
        }
    }

    /// Total number of discovered objects
    pub fn len(&self) -> usize {
        DatabaseObjectCategory::ALL
            .iter()
            .map(|category| self.entries(*category).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(routine: &str, parameter: Option<&str>) -> (String, Option<String>) {
        (routine.to_string(), parameter.map(str::to_string))
    }

    #[test]
    fn test_group_routine_parameters_keeps_ordinal_order() {
        let entries = group_routine_parameters(
            DatabaseObjectCategory::Procedure,
            vec![
                row("CalcTotal", Some("qty")),
                row("CalcTotal", Some("price")),
                row("Archive", Some("before")),
            ],
        );

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "CalcTotal");
        assert_eq!(entries[0].parameters, vec!["qty", "price"]);
        assert_eq!(entries[1].name, "Archive");
        assert_eq!(entries[1].parameters, vec!["before"]);
    }

    #[test]
    fn test_group_routine_parameters_keeps_parameterless_routines() {
        let entries = group_routine_parameters(
            DatabaseObjectCategory::Function,
            vec![row("Now", None), row("Twice", Some("value"))],
        );

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Now");
        assert!(entries[0].parameters.is_empty());
        assert_eq!(entries[0].category, DatabaseObjectCategory::Function);
        assert_eq!(entries[1].parameters, vec!["value"]);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(DatabaseObjectCategory::View.to_string(), "view");
        assert_eq!(DatabaseObjectCategory::Procedure.plural(), "procedures");
        assert!(DatabaseObjectCategory::Function.is_invocable());
        assert!(!DatabaseObjectCategory::Table.is_invocable());
    }
}
