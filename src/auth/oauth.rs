//! Minimal OAuth 2.0 client-credentials exchange (RFC 6749 §4.4), just
//! enough for the OAuth authentication variant to contribute its bearer
//! header. Token caching and refresh stay with the caller.

use crate::auth::basic_auth_header;
use crate::errors::{mapping, HttpClientError, HttpClientResult};
use crate::transport::response_parser::aggregate_headers;
use crate::types::{OAuthAuthentication, OAuthCredentialsLocation};
use http::header::{ACCEPT, AUTHORIZATION};
use secrecy::ExposeSecret;
use serde::Deserialize;

const GRANT_TYPE: &str = "client_credentials";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Requests an access token from the token endpoint. An error-range answer
/// from the endpoint surfaces as that endpoint's structured error.
pub(crate) async fn fetch_access_token(
    client: &reqwest::Client,
    config: &OAuthAuthentication,
) -> HttpClientResult<String> {
    let mut form: Vec<(&str, String)> = vec![("grant_type", GRANT_TYPE.to_string())];
    if let Some(audience) = &config.audience {
        form.push(("audience", audience.clone()));
    }
    if let Some(scopes) = &config.scopes {
        form.push(("scope", scopes.clone()));
    }

    let mut request = client
        .post(&config.oauth_token_endpoint)
        .header(ACCEPT, "application/json");
    match config.client_authentication {
        OAuthCredentialsLocation::BasicAuthHeader => {
            request = request.header(
                AUTHORIZATION,
                basic_auth_header(&config.client_id, config.client_secret.expose_secret()),
            );
        }
        OAuthCredentialsLocation::CredentialsBody => {
            form.push(("client_id", config.client_id.clone()));
            form.push((
                "client_secret",
                config.client_secret.expose_secret().clone(),
            ));
        }
    }

    let response = request
        .form(&form)
        .send()
        .await
        .map_err(|e| HttpClientError::from_transport(e, "OAuth token endpoint"))?;

    let status = response.status();
    if !status.is_success() {
        let headers = aggregate_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpClientError::from_transport(e, "OAuth token endpoint body"))?;
        return Err(mapping::remote_error(status, headers, &body));
    }

    let token: TokenResponse = response.json().await.map_err(|e| HttpClientError::Protocol {
        message: "The OAuth token endpoint returned an unreadable token response".to_string(),
        source: Some(Box::new(e)),
    })?;
    Ok(token.access_token)
}
