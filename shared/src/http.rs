//! HTTP helpers for Lambda functions.
//!
//! Every response leaving a handler goes through [`json_response`] so the
//! content type and CORS headers are present on success and failure alike.

use lambda_http::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::models::ErrorResponse;
use crate::{Error, Result};

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> std::result::Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Log the error and turn it into the generic failure envelope.
pub fn error_response(err: &Error) -> std::result::Result<Response<Body>, lambda_http::Error> {
    error!(error = %err, status = err.status_code(), "Request failed");
    json_response(
        err.status_code(),
        &ErrorResponse {
            message: err.public_message(),
        },
    )
}

/// Read a required, non-blank path parameter.
pub fn path_parameter<'a>(event: &'a Request, name: &str) -> Result<&'a str> {
    event
        .path_parameters_ref()
        .and_then(|params| params.first(name))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Validation(format!("Missing path parameter: {}", name)))
}

/// Parse a required JSON request body.
pub fn json_body<T: DeserializeOwned>(event: &Request) -> Result<T> {
    let body = event.body().as_ref();
    if body.is_empty() {
        return Err(Error::Validation("Missing request body".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::Validation(format!("Invalid request body: {}", e)))
}

/// Parse an optional JSON request body, falling back to the default when absent.
pub fn optional_json_body<T: DeserializeOwned + Default>(event: &Request) -> Result<T> {
    if event.body().as_ref().iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    json_body(event)
}
