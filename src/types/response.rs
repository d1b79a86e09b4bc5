use crate::environment::DocumentReference;
use serde::Serialize;
use std::collections::HashMap;

/// Header values as surfaced to connectors: a name seen once yields a
/// single string, a name seen multiple times an ordered list. `Set-Cookie`
/// is always a list, even with one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValues {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValues {
    pub(crate) fn push(&mut self, value: String) {
        match self {
            HeaderValues::Single(existing) => {
                *self = HeaderValues::Multiple(vec![std::mem::take(existing), value]);
            }
            HeaderValues::Multiple(values) => values.push(value),
        }
    }

    pub fn first(&self) -> &str {
        match self {
            HeaderValues::Single(value) => value,
            HeaderValues::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        HeaderValues::Single(value)
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        HeaderValues::Multiple(values)
    }
}

/// The typed result of a successful call. The decoded body and the
/// document reference are mutually exclusive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub headers: HashMap<String, HeaderValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentReference>,
}
