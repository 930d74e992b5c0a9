//! Async facade running blocking store calls on the tokio blocking pool.
//!
//! Every method clones its inputs into the task, so callers may drop their
//! copies before awaiting.

use crate::model::node::{DocumentId, MindMapNode, NodeId};
use crate::model::persisted::{AuditEntry, DocumentInfo, PersistedMindMap};
use crate::storage::document_store::{DocumentStore, SaveRequest};
use crate::storage::error::{StoreError, StoreResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task;

/// Owned counterpart of `SaveRequest` for crossing into a blocking task.
#[derive(Debug, Clone)]
pub struct SaveMindMap {
    pub content_hash: String,
    pub document_id: DocumentId,
    pub original_filename: String,
    pub page_count: u32,
    pub root_node_id: NodeId,
    pub nodes: Vec<MindMapNode>,
}

impl SaveMindMap {
    pub fn as_request(&self) -> SaveRequest<'_> {
        SaveRequest {
            content_hash: &self.content_hash,
            document_id: self.document_id,
            original_filename: &self.original_filename,
            page_count: self.page_count,
            root_node_id: self.root_node_id,
            nodes: &self.nodes,
        }
    }
}

/// Shares one `DocumentStore` with async callers.
#[derive(Debug, Clone)]
pub struct AsyncDocumentStore {
    inner: Arc<DocumentStore>,
}

impl AsyncDocumentStore {
    pub fn new(inner: Arc<DocumentStore>) -> Self {
        Self { inner }
    }

    /// Underlying blocking store.
    pub fn blocking(&self) -> &Arc<DocumentStore> {
        &self.inner
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        task::spawn_blocking(move || op(&*store))
            .await
            .map_err(|err| StoreError::TaskJoin(err.to_string()))?
    }

    pub async fn exists(&self, content_hash: &str) -> StoreResult<bool> {
        let content_hash = content_hash.to_string();
        self.run(move |store| store.exists(&content_hash)).await
    }

    pub async fn create_folder(&self, content_hash: &str, source: PathBuf) -> StoreResult<PathBuf> {
        let content_hash = content_hash.to_string();
        self.run(move |store| store.create_folder(&content_hash, &source))
            .await
    }

    pub async fn save(&self, request: SaveMindMap) -> StoreResult<()> {
        self.run(move |store| store.save(request.as_request())).await
    }

    pub async fn load(&self, content_hash: &str) -> StoreResult<Option<PersistedMindMap>> {
        let content_hash = content_hash.to_string();
        self.run(move |store| store.load(&content_hash)).await
    }

    pub async fn update(&self, content_hash: &str, nodes: Vec<MindMapNode>) -> StoreResult<bool> {
        let content_hash = content_hash.to_string();
        self.run(move |store| store.update(&content_hash, &nodes)).await
    }

    pub async fn list(&self) -> StoreResult<Vec<DocumentInfo>> {
        self.run(|store| store.list()).await
    }

    pub async fn audit_log(&self, content_hash: &str) -> StoreResult<Vec<AuditEntry>> {
        let content_hash = content_hash.to_string();
        self.run(move |store| store.audit_log(&content_hash)).await
    }

    pub async fn delete(&self, content_hash: &str) -> StoreResult<bool> {
        let content_hash = content_hash.to_string();
        self.run(move |store| store.delete(&content_hash)).await
    }
}
