//! Mapping between wire responses, the structured error taxonomy, and the
//! serialized boundary form used by split cloud-function deployments.

use crate::errors::error::HttpClientError;
use crate::types::HeaderValues;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serialized form of a structured error as it crosses the cloud-function
/// boundary. The callee writes this shape; the caller unwraps it back into
/// an [`HttpClientError`] instead of treating it as an ordinary body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_variables: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn from_error(error: &HttpClientError) -> Self {
        let error_variables = match error {
            HttpClientError::Remote { headers, body, .. } => Some(serde_json::json!({
                "response": {
                    "headers": headers,
                    "body": body,
                }
            })),
            HttpClientError::Relayed { variables, .. } => variables.clone(),
            _ => None,
        };
        ErrorResponse {
            error: error.to_string(),
            error_code: error.error_code(),
            error_variables,
        }
    }

    pub fn into_error(self) -> HttpClientError {
        HttpClientError::Relayed {
            code: self.error_code,
            message: self.error,
            variables: self.error_variables,
        }
    }
}

/// Builds the error for an error-range response. The body is decoded as
/// JSON when possible and kept as raw text otherwise.
pub(crate) fn remote_error(
    status: StatusCode,
    headers: HashMap<String, HeaderValues>,
    body: &[u8],
) -> HttpClientError {
    HttpClientError::Remote {
        status: status.as_u16(),
        reason: status.canonical_reason().map(str::to_string),
        headers,
        body: decode_body(body),
    }
}

/// Decodes a buffered body: empty bodies vanish, JSON bodies become values,
/// anything else is preserved as text.
pub(crate) fn decode_body(body: &[u8]) -> Option<serde_json::Value> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(_) => Some(serde_json::Value::String(
            String::from_utf8_lossy(body).into_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_remote_error_with_json_body() {
        let error = remote_error(
            StatusCode::BAD_REQUEST,
            HashMap::new(),
            br#"{"key":"value"}"#,
        );
        match error {
            HttpClientError::Remote {
                status,
                reason,
                body,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(reason.as_deref(), Some("Bad Request"));
                assert_eq!(body, Some(serde_json::json!({"key": "value"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_remote_error_with_text_body() {
        let error = remote_error(StatusCode::BAD_REQUEST, HashMap::new(), b"text");
        match error {
            HttpClientError::Remote { body, .. } => {
                assert_eq!(body, Some(serde_json::Value::String("text".to_string())));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_remote_error_without_body() {
        let error = remote_error(StatusCode::BAD_REQUEST, HashMap::new(), b"");
        match error {
            HttpClientError::Remote { body, .. } => assert_eq!(body, None),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_response_round_trip() {
        let error = HttpClientError::Remote {
            status: 401,
            reason: Some("Unauthorized".to_string()),
            headers: HashMap::from([(
                "content-type".to_string(),
                HeaderValues::Single("text/plain".to_string()),
            )]),
            body: Some(serde_json::Value::String("denied".to_string())),
        };

        let boundary = ErrorResponse::from_error(&error);
        assert_eq!(boundary.error_code, "401");
        assert!(boundary.error.contains("denied"));
        let response = &boundary.error_variables.as_ref().unwrap()["response"];
        assert_eq!(response["body"], serde_json::json!("denied"));

        let unwrapped = boundary.into_error();
        assert_eq!(unwrapped.error_code(), "401");
        assert!(unwrapped.to_string().contains("denied"));
    }
}
