//! Route synthesis
//!
//! Turns catalog entries into route descriptors. One uniform function handles
//! every category: the category picks the policy, the HTTP method and the
//! statement shape.

use crate::catalog::{Catalog, CatalogEntry, DatabaseObjectCategory};
use crate::config::BuildConfig;
use crate::policy::{CategoryPolicy, ParameterBinding};
use crate::template::QueryTemplate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Output field name of function routes
pub const FUNCTION_RESULT_FIELD: &str = "result";

/// HTTP method of a generated route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Readable objects are fetched, invocable objects are posted to
    pub fn for_category(category: DatabaseObjectCategory) -> Self {
        if category.is_invocable() {
            HttpMethod::Post
        } else {
            HttpMethod::Get
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A route generated for one admitted catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    pub method: HttpMethod,

    /// Percent-encoded path segment, without leading slash
    pub path: String,

    pub template: QueryTemplate,

    pub source: CatalogEntry,
}

impl RouteDescriptor {
    /// Path as registered on the router
    pub fn route_path(&self) -> String {
        format!("/{}", self.path)
    }
}

/// Outcome of synthesis for one catalog entry, admitted or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRecord {
    pub category: DatabaseObjectCategory,

    pub name: String,

    /// Present when the policy admitted the entry
    pub route: Option<RouteDescriptor>,
}

impl SynthesisRecord {
    pub fn is_admitted(&self) -> bool {
        self.route.is_some()
    }

    /// Parameter bindings of an admitted invocable entry
    pub fn bindings(&self) -> &[ParameterBinding] {
        self.route
            .as_ref()
            .map(|route| route.template.bindings.as_slice())
            .unwrap_or(&[])
    }
}

/// Build the statement for an entry
///
/// Tables and views are read whole. Procedures are called and functions are
/// selected, both with one placeholder per parameter named after its exposed
/// name.
fn build_template(
    entry: &CatalogEntry,
    bindings: Vec<ParameterBinding>,
    quote: &impl Fn(&str) -> String,
) -> QueryTemplate {
    let object = quote(&entry.name);

    match entry.category {
        DatabaseObjectCategory::Table | DatabaseObjectCategory::View => {
            QueryTemplate::new(format!("SELECT * FROM {}", object))
        }
        DatabaseObjectCategory::Procedure => {
            let placeholders = QueryTemplate::placeholder_list(&bindings);
            QueryTemplate::with_bindings(format!("CALL {}({})", object, placeholders), bindings)
        }
        DatabaseObjectCategory::Function => {
            let placeholders = QueryTemplate::placeholder_list(&bindings);
            QueryTemplate::with_bindings(
                format!(
                    "SELECT {}({}) AS {}",
                    object,
                    placeholders,
                    quote(FUNCTION_RESULT_FIELD)
                ),
                bindings,
            )
        }
    }
}

/// Apply a category policy to one entry
pub fn synthesize_entry(
    entry: &CatalogEntry,
    policy: &CategoryPolicy,
    quote: &impl Fn(&str) -> String,
) -> SynthesisRecord {
    let route = policy.should_expose(&entry.name).then(|| {
        let bindings = if entry.category.is_invocable() {
            policy.compute_parameter_binding(&entry.name, &entry.parameters)
        } else {
            Vec::new()
        };

        RouteDescriptor {
            method: HttpMethod::for_category(entry.category),
            path: policy.compute_path(&entry.name),
            template: build_template(entry, bindings, quote),
            source: entry.clone(),
        }
    });

    SynthesisRecord {
        category: entry.category,
        name: entry.name.clone(),
        route,
    }
}

/// Synthesize every entry of the catalog
///
/// Records come out in registration order: tables, views, procedures,
/// functions, and catalog order within each category.
pub fn synthesize(
    catalog: &Catalog,
    build: &BuildConfig,
    quote: impl Fn(&str) -> String,
) -> Vec<SynthesisRecord> {
    DatabaseObjectCategory::ALL
        .iter()
        .flat_map(|category| {
            let policy = build.policy(*category);
            catalog
                .entries(*category)
                .iter()
                .map(move |entry| (entry, policy))
        })
        .map(|(entry, policy)| synthesize_entry(entry, policy, &quote))
        .collect()
}

/// Admitted routes in registration order with duplicates resolved
///
/// When two routes share a method and path the later one wins; the earlier
/// one is dropped with a warning.
pub fn resolve_routes(records: &[SynthesisRecord]) -> Vec<RouteDescriptor> {
    let mut routes: Vec<RouteDescriptor> = Vec::new();
    let mut positions: HashMap<(HttpMethod, String), usize> = HashMap::new();

    for route in records.iter().filter_map(|record| record.route.as_ref()) {
        let key = (route.method, route.path.clone());
        match positions.get(&key) {
            Some(&position) => {
                tracing::warn!(
                    method = %route.method,
                    path = %route.path,
                    shadowed = %routes[position].source.name,
                    by = %route.source.name,
                    "duplicate route path, keeping the last registration"
                );
                routes[position] = route.clone();
            }
            None => {
                positions.insert(key, routes.len());
                routes.push(route.clone());
            }
        }
    }

    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{IncludeMode, ObjectOverride};

    fn backticks(identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn sample_catalog() -> Catalog {
        Catalog {
            tables: vec![
                CatalogEntry::readable(DatabaseObjectCategory::Table, "Orders"),
                CatalogEntry::readable(DatabaseObjectCategory::Table, "Users"),
            ],
            views: vec![CatalogEntry::readable(
                DatabaseObjectCategory::View,
                "monthly_sales",
            )],
            procedures: vec![
                CatalogEntry::invocable(
                    DatabaseObjectCategory::Procedure,
                    "CalcTotal",
                    vec!["qty".to_string(), "price".to_string()],
                ),
                CatalogEntry::invocable(DatabaseObjectCategory::Procedure, "Cleanup", vec![]),
            ],
            functions: vec![CatalogEntry::invocable(
                DatabaseObjectCategory::Function,
                "Twice",
                vec!["value".to_string()],
            )],
        }
    }

    #[test]
    fn test_readable_objects_become_get_routes() {
        let entry = CatalogEntry::readable(DatabaseObjectCategory::View, "monthly_sales");
        let record = synthesize_entry(&entry, &CategoryPolicy::include_all(), &backticks);

        let route = record.route.unwrap();
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.path, "monthly_sales");
        assert_eq!(route.route_path(), "/monthly_sales");
        assert_eq!(route.template.sql, "SELECT * FROM `monthly_sales`");
        assert!(route.template.placeholders().is_empty());
    }

    #[test]
    fn test_procedure_placeholders_follow_parameter_aliases() {
        let mut policy = CategoryPolicy::include_all();
        let mut alias_params = HashMap::new();
        alias_params.insert("qty".to_string(), "quantity".to_string());
        policy.config.insert(
            "CalcTotal".to_string(),
            ObjectOverride {
                alias_params: Some(alias_params),
                ..ObjectOverride::default()
            },
        );

        let entry = CatalogEntry::invocable(
            DatabaseObjectCategory::Procedure,
            "CalcTotal",
            vec!["qty".to_string(), "price".to_string()],
        );
        let route = synthesize_entry(&entry, &policy, &backticks).route.unwrap();

        assert_eq!(route.method, HttpMethod::Post);
        assert_eq!(route.template.sql, "CALL `CalcTotal`(:quantity, :price)");
        assert_eq!(route.template.placeholders(), vec!["quantity", "price"]);
        let sources: Vec<&str> = route
            .template
            .bindings
            .iter()
            .map(|binding| binding.source.as_str())
            .collect();
        assert_eq!(sources, vec!["qty", "price"]);
    }

    #[test]
    fn test_function_result_is_aliased() {
        let entry = CatalogEntry::invocable(
            DatabaseObjectCategory::Function,
            "Twice",
            vec!["value".to_string()],
        );
        let route = synthesize_entry(&entry, &CategoryPolicy::include_all(), &backticks)
            .route
            .unwrap();

        assert_eq!(route.method, HttpMethod::Post);
        assert_eq!(route.template.sql, "SELECT `Twice`(:value) AS `result`");
    }

    #[test]
    fn test_parameterless_routines_have_no_placeholders() {
        let procedure = CatalogEntry::invocable(DatabaseObjectCategory::Procedure, "Cleanup", vec![]);
        let function = CatalogEntry::invocable(DatabaseObjectCategory::Function, "Now", vec![]);
        let policy = CategoryPolicy::include_all();

        let procedure_route = synthesize_entry(&procedure, &policy, &backticks).route.unwrap();
        let function_route = synthesize_entry(&function, &policy, &backticks).route.unwrap();

        assert_eq!(procedure_route.template.sql, "CALL `Cleanup`()");
        assert!(procedure_route.template.placeholders().is_empty());
        assert_eq!(function_route.template.sql, "SELECT `Now`() AS `result`");
        assert!(function_route.template.bindings.is_empty());
    }

    #[test]
    fn test_ignored_entries_still_produce_a_record() {
        let mut policy = CategoryPolicy::include_all();
        policy.except.insert("Orders".to_string(), true);
        let entry = CatalogEntry::readable(DatabaseObjectCategory::Table, "Orders");

        let record = synthesize_entry(&entry, &policy, &backticks);

        assert!(!record.is_admitted());
        assert_eq!(record.name, "Orders");
        assert!(record.bindings().is_empty());
    }

    #[test]
    fn test_synthesize_covers_catalog_in_category_order() {
        let mut build = BuildConfig::default();
        build.tables.except.insert("Orders".to_string(), true);
        build.functions.include = IncludeMode::None;

        let records = synthesize(&sample_catalog(), &build, backticks);
        let summary: Vec<(&str, bool)> = records
            .iter()
            .map(|record| (record.name.as_str(), record.is_admitted()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Orders", false),
                ("Users", true),
                ("monthly_sales", true),
                ("CalcTotal", true),
                ("Cleanup", true),
                ("Twice", false),
            ]
        );
    }

    #[test]
    fn test_resolve_routes_keeps_last_duplicate() {
        let mut build = BuildConfig::default();
        build.views.config.insert(
            "monthly_sales".to_string(),
            ObjectOverride {
                alias: Some("Users".to_string()),
                ..ObjectOverride::default()
            },
        );

        let records = synthesize(&sample_catalog(), &build, backticks);
        let routes = resolve_routes(&records);

        let users: Vec<&RouteDescriptor> =
            routes.iter().filter(|route| route.path == "Users").collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].source.name, "monthly_sales");
        assert_eq!(users[0].source.category, DatabaseObjectCategory::View);
        assert_eq!(routes.len(), 5);
    }

    #[test]
    fn test_same_path_with_different_methods_is_not_a_duplicate() {
        let mut build = BuildConfig::default();
        build.procedures.config.insert(
            "Cleanup".to_string(),
            ObjectOverride {
                alias: Some("Users".to_string()),
                ..ObjectOverride::default()
            },
        );

        let routes = resolve_routes(&synthesize(&sample_catalog(), &build, backticks));
        let users: Vec<HttpMethod> = routes
            .iter()
            .filter(|route| route.path == "Users")
            .map(|route| route.method)
            .collect();

        assert_eq!(users, vec![HttpMethod::Get, HttpMethod::Post]);
    }
}
