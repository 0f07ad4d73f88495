//! REST API endpoints
//!
//! Every generated route is served by one of two handlers: `read` for tables
//! and views, `invoke` for procedures and functions. Both close over the
//! route's fixed query template.

use axum::{
    extract::{Query, Request},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::routes::{HttpMethod, RouteDescriptor};

pub mod invoke;
pub mod read;

// Re-export handlers for convenience
pub use invoke::{decode_body, invoke_handler};
pub use read::read_handler;

/// Method router serving one generated route
fn method_router<DB: DatabaseProvider>(
    database: Arc<DB>,
    route: &RouteDescriptor,
) -> MethodRouter {
    let template = Arc::new(route.template.clone());

    match route.method {
        HttpMethod::Get => get(move |query: Query<HashMap<String, String>>| {
            read_handler(database.clone(), template.clone(), query)
        }),
        HttpMethod::Post => post(move |request: Request| {
            invoke_handler(database.clone(), template.clone(), request)
        }),
    }
}

/// Create the API router with one route per descriptor
///
/// Descriptors must have unique (method, path) pairs; routes sharing a path
/// are merged into a single method router.
///
/// # Arguments
///
/// * `database` - Arc-wrapped database provider implementation
/// * `routes` - Route descriptors in registration order
///
/// # Returns
///
/// An Axum Router serving every descriptor
pub fn create_api_router<DB: DatabaseProvider>(
    database: Arc<DB>,
    routes: &[RouteDescriptor],
) -> Router {
    let mut paths: Vec<(String, Vec<&RouteDescriptor>)> = Vec::new();

    for route in routes {
        let path = route.route_path();
        match paths.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, group)) => group.push(route),
            None => paths.push((path, vec![route])),
        }
    }

    paths
        .into_iter()
        .fold(Router::new(), |router, (path, group)| {
            let mut group = group.into_iter();
            let Some(first) = group.next() else {
                return router;
            };

            let handler = group.fold(method_router(database.clone(), first), |handler, route| {
                handler.merge(method_router(database.clone(), route))
            });

            router.route(&path, handler)
        })
}

/// Render a database error as HTTP 500 with the error in the body
pub fn error_response(error: &DatabaseError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": error.to_string(),
            "kind": error.kind(),
            "code": error.code(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_error_response_carries_database_error() {
        let error = DatabaseError::Query {
            message: "Unknown column 'x'".to_string(),
            code: Some("42S22".to_string()),
        };

        let response = error_response(&error);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Database error: Unknown column 'x'");
        assert_eq!(body["kind"], "query");
        assert_eq!(body["code"], "42S22");
    }

    #[tokio::test]
    async fn test_acquire_error_has_no_code() {
        let response = error_response(&DatabaseError::Acquire("pool timed out".to_string()));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["kind"], "acquire");
        assert!(body["code"].is_null());
    }
}
