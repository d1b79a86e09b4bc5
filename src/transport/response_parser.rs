//! Maps the raw wire response into a typed result, honoring the
//! execution environment's response-handling policy. The body stream is
//! consumed exactly once on every path; dropping the response releases
//! the connection.

use crate::environment::{DocumentCreationRequest, ExecutionEnvironment};
use crate::errors::{mapping, ErrorResponse, HttpClientError, HttpClientResult};
use crate::types::{HeaderValues, HttpClientResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::TryStreamExt;
use http::header::{HeaderMap, CONTENT_TYPE, SET_COOKIE};
use std::collections::HashMap;

pub struct ResponseParser;

impl ResponseParser {
    pub async fn map(
        response: reqwest::Response,
        store_response: bool,
        environment: &ExecutionEnvironment,
    ) -> HttpClientResult<HttpClientResponse> {
        let status = response.status();
        let headers = aggregate_headers(response.headers());
        let reason = status.canonical_reason().map(str::to_string);

        if status.is_client_error() || status.is_server_error() {
            let body = response
                .bytes()
                .await
                .map_err(|e| HttpClientError::from_transport(e, "error response body"))?;
            if environment.is_cloud_function_caller() {
                // The boundary serializes structured errors; unwrap them
                // instead of reporting the raw HTTP exchange.
                if let Ok(relayed) = serde_json::from_slice::<ErrorResponse>(&body) {
                    return Err(relayed.into_error());
                }
            }
            return Err(mapping::remote_error(status, headers, &body));
        }

        if store_response && environment.store_response_selected() {
            if let Some(store) = environment.document_store() {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let content = response
                    .bytes_stream()
                    .map_err(|e| HttpClientError::from_transport(e, "response body stream"));
                let document = store
                    .create(DocumentCreationRequest {
                        content_type,
                        file_name: None,
                        content: Box::pin(content),
                    })
                    .await?;
                return Ok(HttpClientResponse {
                    status: status.as_u16(),
                    reason,
                    headers,
                    body: None,
                    document: Some(document),
                });
            }

            // No storage on this side of the function boundary: encode the
            // body so it survives re-serialization.
            let body = response
                .bytes()
                .await
                .map_err(|e| HttpClientError::from_transport(e, "response body"))?;
            let body = (!body.is_empty())
                .then(|| serde_json::Value::String(BASE64.encode(&body)));
            return Ok(HttpClientResponse {
                status: status.as_u16(),
                reason,
                headers,
                body,
                document: None,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpClientError::from_transport(e, "response body"))?;
        Ok(HttpClientResponse {
            status: status.as_u16(),
            reason,
            headers,
            body: mapping::decode_body(&body),
            document: None,
        })
    }
}

/// Aggregates wire headers: one value yields a scalar, several an ordered
/// list. `Set-Cookie` is always a list. Names are the canonical lowercase
/// form.
pub(crate) fn aggregate_headers(headers: &HeaderMap) -> HashMap<String, HeaderValues> {
    let mut aggregated: HashMap<String, HeaderValues> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match aggregated.entry(name.as_str().to_string()) {
            std::collections::hash_map::Entry::Occupied(mut entry) => entry.get_mut().push(value),
            std::collections::hash_map::Entry::Vacant(entry) => {
                if *name == SET_COOKIE {
                    entry.insert(HeaderValues::Multiple(vec![value]));
                } else {
                    entry.insert(HeaderValues::Single(value));
                }
            }
        }
    }
    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_header_yields_scalar() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Custom", HeaderValue::from_static("value"));
        let aggregated = aggregate_headers(&headers);
        assert_eq!(
            aggregated.get("x-custom"),
            Some(&HeaderValues::Single("value".to_string()))
        );
    }

    #[test]
    fn test_repeated_header_yields_ordered_list() {
        let mut headers = HeaderMap::new();
        headers.append("my-header", HeaderValue::from_static("Test-Value-1"));
        headers.append("my-header", HeaderValue::from_static("Test-Value-2"));
        let aggregated = aggregate_headers(&headers);
        assert_eq!(
            aggregated.get("my-header"),
            Some(&HeaderValues::Multiple(vec![
                "Test-Value-1".to_string(),
                "Test-Value-2".to_string()
            ]))
        );
    }

    #[test]
    fn test_set_cookie_is_always_a_list() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("key=value"));
        let aggregated = aggregate_headers(&headers);
        assert_eq!(
            aggregated.get("set-cookie"),
            Some(&HeaderValues::Multiple(vec!["key=value".to_string()]))
        );

        headers.append(SET_COOKIE, HeaderValue::from_static("key2=value2"));
        let aggregated = aggregate_headers(&headers);
        assert_eq!(
            aggregated.get("set-cookie"),
            Some(&HeaderValues::Multiple(vec![
                "key=value".to_string(),
                "key2=value2".to_string()
            ]))
        );
    }

    #[test]
    fn test_decode_body_json_then_text_fallback() {
        assert_eq!(
            mapping::decode_body(br#"{"a":1}"#),
            Some(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            mapping::decode_body(b"not { json"),
            Some(serde_json::Value::String("not { json".to_string()))
        );
        assert_eq!(mapping::decode_body(b""), None);
    }
}
