//! Test doubles: an in-memory document store and a map-backed environment
//! provider, so proxy resolution and document paths are testable without
//! touching the process environment or external storage.

use crate::environment::{DocumentCreationRequest, DocumentReference, DocumentStore};
use crate::errors::HttpClientResult;
use crate::proxy::EnvironmentProvider;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Document store that keeps created documents in memory and hands out
/// sequential references.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, Bytes>>,
    counter: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content previously stored under the given reference.
    pub fn content(&self, reference: &str) -> Option<Bytes> {
        self.documents.lock().unwrap().get(reference).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(
        &self,
        request: DocumentCreationRequest,
    ) -> HttpClientResult<DocumentReference> {
        let mut content = request.content;
        let mut buffer = Vec::new();
        while let Some(chunk) = content.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        let reference = format!("document-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.documents
            .lock()
            .unwrap()
            .insert(reference.clone(), Bytes::from(buffer));
        Ok(DocumentReference {
            reference,
            content_type: request.content_type,
            file_name: request.file_name,
        })
    }
}

/// Environment provider backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    variables: HashMap<String, String>,
}

impl StaticEnvironment {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            variables: pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryDocumentStore::new();
        let document = store
            .create(DocumentCreationRequest::from_bytes("hello").with_content_type("text/plain"))
            .await
            .unwrap();

        assert_eq!(document.reference, "document-0");
        assert_eq!(document.content_type.as_deref(), Some("text/plain"));
        assert_eq!(store.content(&document.reference).unwrap(), "hello");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_static_environment_lookup() {
        let environment = StaticEnvironment::from_pairs(&[("NAME", "value")]);
        assert_eq!(environment.var("NAME").as_deref(), Some("value"));
        assert_eq!(environment.var("MISSING"), None);
    }
}
