//! Invocation endpoint for stored procedures and functions

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error_response;
use crate::database::traits::DatabaseProvider;
use crate::template::QueryTemplate;

/// Decode the request body into named parameter values
///
/// JSON bodies must be objects; an empty JSON body counts as `{}`. Form
/// bodies yield string values. A body of any other content type, or no body
/// at all, supplies no values.
pub async fn decode_body(request: Request) -> Result<Map<String, Value>, Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let bytes = Bytes::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        if bytes.is_empty() {
            return Ok(Map::new());
        }

        let Json(body) =
            Json::<Map<String, Value>>::from_bytes(&bytes).map_err(IntoResponse::into_response)?;
        Ok(body)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(body) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(body
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect())
    } else {
        Ok(Map::new())
    }
}

/// Handler for `POST /<path>` of a procedure or function
///
/// Request body (keys are the exposed parameter names):
/// ```json
/// { "quantity": 3, "price": 9.5 }
/// ```
///
/// Response for a procedure is its result set; for a function:
/// ```json
/// [{ "result": 28.5 }]
/// ```
///
/// On failure the response is HTTP 500 with the database error in the body.
pub async fn invoke_handler<DB: DatabaseProvider>(
    database: Arc<DB>,
    template: Arc<QueryTemplate>,
    request: Request,
) -> Response {
    let parameters = match decode_body(request).await {
        Ok(parameters) => parameters,
        Err(rejection) => return rejection,
    };

    match database.run(&template, &parameters).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => {
            tracing::error!(sql = %template.sql, error = %error, "invocation failed");
            error_response(&error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/CalcTotal");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_decode_json_body() {
        let parameters = decode_body(request(
            Some("application/json"),
            r#"{ "quantity": 3, "note": "it's" }"#,
        ))
        .await
        .unwrap();

        assert_eq!(parameters["quantity"], 3);
        assert_eq!(parameters["note"], "it's");
    }

    #[tokio::test]
    async fn test_decode_form_body() {
        let parameters = decode_body(request(
            Some("application/x-www-form-urlencoded"),
            "quantity=3&price=9.5",
        ))
        .await
        .unwrap();

        assert_eq!(parameters["quantity"], "3");
        assert_eq!(parameters["price"], "9.5");
    }

    #[tokio::test]
    async fn test_missing_body_supplies_no_values() {
        let parameters = decode_body(request(None, "")).await.unwrap();

        assert!(parameters.is_empty());
    }

    #[tokio::test]
    async fn test_empty_json_body_supplies_no_values() {
        let parameters = decode_body(request(Some("application/json"), ""))
            .await
            .unwrap();

        assert!(parameters.is_empty());
    }

    #[tokio::test]
    async fn test_json_body_must_be_an_object() {
        let rejection = decode_body(request(Some("application/json"), "[1, 2]"))
            .await
            .unwrap_err();

        assert!(rejection.status().is_client_error());
    }
}
