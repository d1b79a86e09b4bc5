//! Client identity and trust material for mutual TLS.
//!
//! Keystore loading is a sequence of format attempts: PKCS#12 first, PEM
//! second. The first failure is silent; only when every format fails does
//! the build error out, and the message then reports every attempt.

use crate::errors::{HttpClientError, HttpClientResult};
use crate::types::CertificateAuthentication;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::ExposeSecret;

/// TLS material for one call: optional client identity plus the trust
/// roots for server validation. When trust roots are configured they
/// replace the built-in roots.
#[derive(Clone, Debug)]
pub struct TlsMaterial {
    pub identity: reqwest::Identity,
    pub trusted_roots: Vec<reqwest::Certificate>,
}

impl TlsMaterial {
    pub fn replaces_built_in_roots(&self) -> bool {
        !self.trusted_roots.is_empty()
    }
}

/// Builds the TLS material for a client-certificate configuration. Pure
/// given the same file contents; never logs secret material.
pub fn build_tls_material(auth: &CertificateAuthentication) -> HttpClientResult<TlsMaterial> {
    let identity = load_identity(auth)?;
    let trusted_roots = match &auth.truststore_path {
        Some(path) => load_truststore(path)?,
        None => Vec::new(),
    };
    Ok(TlsMaterial {
        identity,
        trusted_roots,
    })
}

fn load_identity(auth: &CertificateAuthentication) -> HttpClientResult<reqwest::Identity> {
    let path = &auth.keystore_path;
    let bytes = std::fs::read(path).map_err(|e| {
        HttpClientError::MtlsConfig(format!("Cannot read keystore '{path}': {e}"))
    })?;
    let password = auth
        .keystore_password
        .as_ref()
        .map(|secret| secret.expose_secret().as_str())
        .unwrap_or("");

    let attempts: [(&str, fn(&[u8], &str) -> Result<reqwest::Identity, String>); 2] = [
        ("PKCS#12", load_pkcs12_identity),
        ("PEM", load_pem_identity),
    ];

    let mut failures = Vec::with_capacity(attempts.len());
    for (format, loader) in attempts {
        match loader(&bytes, password) {
            Ok(identity) => {
                tracing::debug!(keystore = %path, format, "loaded client keystore");
                return Ok(identity);
            }
            Err(reason) => {
                tracing::debug!(keystore = %path, format, "keystore format attempt failed");
                failures.push(format!("{format} attempt failed: {reason}"));
            }
        }
    }

    Err(HttpClientError::MtlsKeystore(format!(
        "keystore '{path}' could not be loaded in any supported format ({})",
        failures.join("; ")
    )))
}

fn load_pkcs12_identity(bytes: &[u8], password: &str) -> Result<reqwest::Identity, String> {
    reqwest::Identity::from_pkcs12_der(bytes, password).map_err(|e| e.to_string())
}

/// Loads a combined PEM file holding the certificate chain and an
/// unencrypted private key. The blocks are split and re-armored so stray
/// content cannot confuse the TLS backend.
fn load_pem_identity(bytes: &[u8], _password: &str) -> Result<reqwest::Identity, String> {
    let mut certificates = String::new();
    let mut key = None;

    for item in rustls_pemfile::read_all(&mut &bytes[..]) {
        match item.map_err(|e| format!("invalid PEM structure: {e}"))? {
            rustls_pemfile::Item::X509Certificate(der) => {
                certificates.push_str(&pem_encode("CERTIFICATE", der.as_ref()));
            }
            rustls_pemfile::Item::Pkcs8Key(der) => {
                key.get_or_insert(pem_encode("PRIVATE KEY", der.secret_pkcs8_der()));
            }
            rustls_pemfile::Item::Pkcs1Key(der) => {
                key.get_or_insert(pem_encode("RSA PRIVATE KEY", der.secret_pkcs1_der()));
            }
            rustls_pemfile::Item::Sec1Key(der) => {
                key.get_or_insert(pem_encode("EC PRIVATE KEY", der.secret_sec1_der()));
            }
            _ => {}
        }
    }

    if certificates.is_empty() {
        return Err("no CERTIFICATE block found".to_string());
    }
    let key = key.ok_or_else(|| "no private key block found".to_string())?;

    reqwest::Identity::from_pkcs8_pem(certificates.as_bytes(), key.as_bytes())
        .map_err(|e| e.to_string())
}

fn load_truststore(path: &str) -> HttpClientResult<Vec<reqwest::Certificate>> {
    let bytes = std::fs::read(path).map_err(|e| {
        HttpClientError::MtlsConfig(format!("Cannot read truststore '{path}': {e}"))
    })?;

    let pem_certificates: Vec<_> = rustls_pemfile::certs(&mut &bytes[..])
        .filter_map(|item| item.ok())
        .collect();
    if !pem_certificates.is_empty() {
        return pem_certificates
            .into_iter()
            .map(|der| {
                reqwest::Certificate::from_der(der.as_ref()).map_err(|e| {
                    HttpClientError::MtlsConfig(format!(
                        "Truststore '{path}' contains an invalid certificate: {e}"
                    ))
                })
            })
            .collect();
    }

    match reqwest::Certificate::from_der(&bytes) {
        Ok(certificate) => Ok(vec![certificate]),
        Err(e) => Err(HttpClientError::MtlsConfig(format!(
            "Truststore '{path}' is neither a PEM bundle nor a DER certificate: {e}"
        ))),
    }
}

fn pem_encode(tag: &str, der: &[u8]) -> String {
    let encoded = BASE64.encode(der);
    let mut out = format!("-----BEGIN {tag}-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        out.push('\n');
    }
    out.push_str(&format!("-----END {tag}-----\n"));
    out
}
