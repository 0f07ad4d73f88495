//! Read endpoint for tables and views

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error_response;
use crate::database::traits::DatabaseProvider;
use crate::template::QueryTemplate;

/// Handler for `GET /<path>` of a table or view
///
/// URL query parameters are offered to the template as named values. The
/// generated read statements have no placeholders, so they are ignored
/// unless the template declares one.
///
/// Response:
/// ```json
/// [
///   { "id": 1, "name": "Alice" },
///   { "id": 2, "name": "Bob" }
/// ]
/// ```
///
/// On failure the response is HTTP 500 with the database error in the body.
pub async fn read_handler<DB: DatabaseProvider>(
    database: Arc<DB>,
    template: Arc<QueryTemplate>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let parameters: Map<String, Value> = query
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect();

    match database.run(&template, &parameters).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => {
            tracing::error!(sql = %template.sql, error = %error, "read failed");
            error_response(&error)
        }
    }
}
