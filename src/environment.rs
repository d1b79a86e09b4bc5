//! Deployment-topology policy: how response bodies must be represented for
//! the current call. Selected once per invocation by the hosting runtime,
//! never changed mid-call.

use crate::errors::HttpClientResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque handle to a response body kept in external storage instead of
/// being inlined in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// A body on its way into document storage. The content is a stream so
/// large responses never have to be buffered in memory.
pub struct DocumentCreationRequest {
    pub content_type: Option<String>,
    pub file_name: Option<String>,
    pub content: BoxStream<'static, HttpClientResult<Bytes>>,
}

impl DocumentCreationRequest {
    /// Convenience constructor for buffered content.
    pub fn from_bytes(content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            content_type: None,
            file_name: None,
            content: Box::pin(futures::stream::once(async move { Ok(content) })),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl fmt::Debug for DocumentCreationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCreationRequest")
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// Storage backend for response bodies kept out of process variables.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, request: DocumentCreationRequest) -> HttpClientResult<DocumentReference>;
}

/// The three deployment topologies the engine runs in.
#[derive(Clone)]
pub enum ExecutionEnvironment {
    /// Single-process deployment with direct document storage access.
    SelfManaged { document_store: Arc<dyn DocumentStore> },
    /// The execution side of a split cloud-function deployment. Behaves
    /// like [`ExecutionEnvironment::SelfManaged`] for the call itself; the
    /// caller side owns any cross-boundary re-serialization.
    CloudFunctionCallee { document_store: Arc<dyn DocumentStore> },
    /// The caller side of a split deployment: the call is a nested
    /// sub-request across the function boundary. Bodies that would become
    /// documents are base64-encoded into the decoded body instead, and
    /// error payloads from the boundary are unwrapped as structured errors.
    CloudFunctionCaller { store_response_selected: bool },
}

impl ExecutionEnvironment {
    /// Whether the request's "store response as document" flag is honored
    /// at all in this topology. When `false`, responses are always
    /// buffered and decoded regardless of the flag.
    pub fn store_response_selected(&self) -> bool {
        match self {
            ExecutionEnvironment::SelfManaged { .. }
            | ExecutionEnvironment::CloudFunctionCallee { .. } => true,
            ExecutionEnvironment::CloudFunctionCaller {
                store_response_selected,
            } => *store_response_selected,
        }
    }

    pub fn document_store(&self) -> Option<&Arc<dyn DocumentStore>> {
        match self {
            ExecutionEnvironment::SelfManaged { document_store }
            | ExecutionEnvironment::CloudFunctionCallee { document_store } => Some(document_store),
            ExecutionEnvironment::CloudFunctionCaller { .. } => None,
        }
    }

    pub fn is_cloud_function_caller(&self) -> bool {
        matches!(self, ExecutionEnvironment::CloudFunctionCaller { .. })
    }
}

impl fmt::Debug for ExecutionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEnvironment::SelfManaged { .. } => f.write_str("SelfManaged"),
            ExecutionEnvironment::CloudFunctionCallee { .. } => f.write_str("CloudFunctionCallee"),
            ExecutionEnvironment::CloudFunctionCaller {
                store_response_selected,
            } => write!(
                f,
                "CloudFunctionCaller {{ store_response_selected: {store_response_selected} }}"
            ),
        }
    }
}
