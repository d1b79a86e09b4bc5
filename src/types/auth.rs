//! The closed set of authentication variants a request can carry. Each
//! variant contributes headers, query parameters, or TLS material to the
//! wire call; see `crate::auth` for the application logic.

use secrecy::Secret;
use serde::Deserialize;

/// Authentication configuration for a single request. Exactly one variant
/// is active; secrets are redacted from `Debug` output and never
/// re-serialized.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Authentication {
    #[default]
    #[serde(rename = "noAuth")]
    None,
    Basic {
        username: String,
        password: Secret<String>,
    },
    Bearer {
        token: Secret<String>,
    },
    ApiKey {
        location: ApiKeyLocation,
        name: String,
        value: Secret<String>,
    },
    #[serde(rename = "oauth-client-credentials-flow")]
    OAuth(OAuthAuthentication),
    Certificate(CertificateAuthentication),
}

/// Where an API key is placed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiKeyLocation {
    Headers,
    Query,
}

/// OAuth 2.0 client-credentials configuration. The engine performs the
/// minimal token exchange needed to contribute a bearer header; token
/// caching and refresh are the caller's concern.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthAuthentication {
    pub oauth_token_endpoint: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub scopes: Option<String>,
    #[serde(default)]
    pub client_authentication: OAuthCredentialsLocation,
}

/// How client credentials are presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum OAuthCredentialsLocation {
    #[default]
    #[serde(rename = "basicAuthHeader")]
    BasicAuthHeader,
    #[serde(rename = "credentialsInBody")]
    CredentialsBody,
}

/// Client-certificate (mutual TLS) configuration. Keystore formats are
/// tried in order (PKCS#12, then PEM); the truststore, when given,
/// replaces the built-in roots for server validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthentication {
    pub keystore_path: String,
    #[serde(default)]
    pub keystore_password: Option<Secret<String>>,
    #[serde(default)]
    pub key_password: Option<Secret<String>>,
    #[serde(default)]
    pub truststore_path: Option<String>,
    #[serde(default)]
    pub truststore_password: Option<Secret<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_deserialize_basic_authentication() {
        let auth: Authentication = serde_json::from_value(serde_json::json!({
            "type": "basic",
            "username": "user",
            "password": "secret",
        }))
        .unwrap();
        match auth {
            Authentication::Basic { username, password } => {
                assert_eq!(username, "user");
                assert_eq!(password.expose_secret(), "secret");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_oauth_authentication() {
        let auth: Authentication = serde_json::from_value(serde_json::json!({
            "type": "oauth-client-credentials-flow",
            "oauthTokenEndpoint": "https://login.example.com/oauth/token",
            "clientId": "id",
            "clientSecret": "secret",
            "audience": "aud",
            "scopes": "read:all",
            "clientAuthentication": "credentialsInBody",
        }))
        .unwrap();
        match auth {
            Authentication::OAuth(oauth) => {
                assert_eq!(oauth.client_id, "id");
                assert_eq!(
                    oauth.client_authentication,
                    OAuthCredentialsLocation::CredentialsBody
                );
                assert_eq!(oauth.scopes.as_deref(), Some("read:all"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_default_is_no_auth() {
        assert!(matches!(Authentication::default(), Authentication::None));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = Authentication::Bearer {
            token: Secret::new("very-secret".to_string()),
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("very-secret"));
    }
}
