//! Translates the declarative request description into a concrete wire
//! request: header materialization, authentication contribution, and
//! content-type-driven body serialization.

use crate::auth::apply_authentication;
use crate::errors::{HttpClientError, HttpClientResult};
use crate::types::{HttpClientRequest, HttpMethod};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEncoding {
    Json,
    FormUrlEncoded,
    Multipart,
    Text,
}

pub struct RequestBuilder;

impl RequestBuilder {
    /// Builds the wire request. `method` and `body_allowed` are passed
    /// separately so redirect rewrites (303 to GET) reuse the same path.
    pub(crate) async fn build(
        client: &reqwest::Client,
        mut url: Url,
        request: &HttpClientRequest,
        method: HttpMethod,
        body_allowed: bool,
    ) -> HttpClientResult<reqwest::Request> {
        let mut headers = materialize_headers(request)?;
        apply_authentication(client, &request.authentication, &mut headers, &mut url).await?;

        let body = request
            .body
            .as_ref()
            .filter(|_| body_allowed && method.supports_body());

        let mut builder = client.request(method.as_reqwest(), url);

        if let Some(body) = body {
            let encoding = classify_body(headers.get(CONTENT_TYPE), body);
            match encoding {
                BodyEncoding::Multipart => {
                    // The transport generates the boundary, so a configured
                    // content type must not win over it.
                    headers.remove(CONTENT_TYPE);
                    builder = builder.headers(headers).multipart(multipart_form(body)?);
                }
                BodyEncoding::FormUrlEncoded => {
                    builder = builder.headers(headers).form(&form_fields(body)?);
                }
                BodyEncoding::Text => {
                    builder = builder.headers(headers).body(scalar_text(body));
                }
                BodyEncoding::Json => {
                    if !headers.contains_key(CONTENT_TYPE) {
                        headers.insert(
                            CONTENT_TYPE,
                            HeaderValue::from_static(mime::APPLICATION_JSON.as_ref()),
                        );
                    }
                    builder = builder.headers(headers).json(body);
                }
            }
        } else {
            builder = builder.headers(headers);
        }

        builder
            .build()
            .map_err(|e| HttpClientError::InvalidRequest(format!("Cannot build request: {e}")))
    }
}

/// Materializes configured headers. A `null` value becomes an empty value;
/// a `null` `Content-Type` is dropped entirely so the body's default
/// content semantics apply.
fn materialize_headers(request: &HttpClientRequest) -> HttpClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let Some(configured) = &request.headers else {
        return Ok(headers);
    };
    for (name, value) in configured {
        if value.is_none() && name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            HttpClientError::InvalidRequest(format!("Invalid header name '{name}': {e}"))
        })?;
        let header_value =
            HeaderValue::from_str(value.as_deref().unwrap_or("")).map_err(|e| {
                HttpClientError::InvalidRequest(format!("Invalid value for header '{name}': {e}"))
            })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

/// Content-type detection is case-insensitive in name (HeaderMap) and
/// value. Without a content type, scalar bodies would still be valid JSON,
/// so everything defaults to JSON.
fn classify_body(content_type: Option<&HeaderValue>, body: &serde_json::Value) -> BodyEncoding {
    let Some(content_type) = content_type.and_then(|value| value.to_str().ok()) else {
        return BodyEncoding::Json;
    };
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains(mime::MULTIPART_FORM_DATA.as_ref()) {
        BodyEncoding::Multipart
    } else if content_type.contains(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()) {
        BodyEncoding::FormUrlEncoded
    } else if content_type.starts_with("text/") && !body.is_object() && !body.is_array() {
        BodyEncoding::Text
    } else {
        BodyEncoding::Json
    }
}

/// Form fields from an object body; `null` values are dropped.
fn form_fields(body: &serde_json::Value) -> HttpClientResult<Vec<(String, String)>> {
    let serde_json::Value::Object(map) = body else {
        return Err(HttpClientError::InvalidRequest(
            "A form-urlencoded body must be an object".to_string(),
        ));
    };
    Ok(map
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.clone(), scalar_text(value)))
        .collect())
}

fn multipart_form(body: &serde_json::Value) -> HttpClientResult<reqwest::multipart::Form> {
    let serde_json::Value::Object(map) = body else {
        return Err(HttpClientError::InvalidRequest(
            "A multipart body must be an object".to_string(),
        ));
    };
    let mut form = reqwest::multipart::Form::new();
    for (name, value) in map {
        match value {
            serde_json::Value::Null => {}
            serde_json::Value::Array(items) => {
                for item in items {
                    form = form.text(name.clone(), scalar_text(item));
                }
            }
            other => form = form.text(name.clone(), scalar_text(other)),
        }
    }
    Ok(form)
}

/// The raw text form of a body value: strings stay unquoted, everything
/// else serializes as JSON.
fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
