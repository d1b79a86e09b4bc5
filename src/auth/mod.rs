//! Applies the active [`Authentication`] variant to a wire call: header
//! and query contributions here, TLS material in [`crate::tls`].

pub mod oauth;

use crate::errors::{HttpClientError, HttpClientResult};
use crate::types::{ApiKeyLocation, Authentication};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use secrecy::ExposeSecret;
use url::Url;

/// Contributes the authentication's headers/query parameters to the call.
/// The OAuth variant performs its token exchange through `client`, so the
/// exchange observes the same proxy and TLS policy as the call itself.
pub(crate) async fn apply_authentication(
    client: &reqwest::Client,
    authentication: &Authentication,
    headers: &mut HeaderMap,
    url: &mut Url,
) -> HttpClientResult<()> {
    match authentication {
        Authentication::None | Authentication::Certificate(_) => Ok(()),
        Authentication::Basic { username, password } => {
            headers.insert(
                AUTHORIZATION,
                header_value(&basic_auth_header(username, password.expose_secret()))?,
            );
            Ok(())
        }
        Authentication::Bearer { token } => {
            headers.insert(
                AUTHORIZATION,
                header_value(&format!("Bearer {}", token.expose_secret()))?,
            );
            Ok(())
        }
        Authentication::ApiKey {
            location,
            name,
            value,
        } => {
            match location {
                ApiKeyLocation::Headers => {
                    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                        HttpClientError::InvalidRequest(format!(
                            "Invalid API key header name '{name}': {e}"
                        ))
                    })?;
                    headers.insert(name, header_value(value.expose_secret())?);
                }
                ApiKeyLocation::Query => {
                    let already_present = url
                        .query_pairs()
                        .any(|(existing, _)| existing == name.as_str());
                    if !already_present {
                        url.query_pairs_mut()
                            .append_pair(name, value.expose_secret());
                    }
                }
            }
            Ok(())
        }
        Authentication::OAuth(oauth_config) => {
            let token = oauth::fetch_access_token(client, oauth_config).await?;
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
            Ok(())
        }
    }
}

/// `Authorization: Basic` value for a username/password pair.
pub(crate) fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
}

fn header_value(value: &str) -> HttpClientResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| HttpClientError::InvalidRequest(format!("Invalid header value: {e}")))
}
