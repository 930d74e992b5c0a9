//! Document use-case service.
//!
//! # Responsibility
//! - Orchestrate ingest: fingerprint, restore-or-generate, persist.
//! - Keep the in-memory node store and document registry in step with disk.
//!
//! # Invariants
//! - A fingerprint already persisted is restored, never regenerated.
//! - Failed ingests leave a `Failed` record carrying the error message.
//! - Deleting a document drops its in-memory nodes before its folder.

use crate::config::StoreConfig;
use crate::model::node::{DocumentId, MindMapNode, NodeId};
use crate::model::persisted::{AuditEntry, DocumentInfo};
use crate::service::collaborators::{
    Answer, CollaboratorError, OutlineStructurer, QuestionAnswerer, TextExtractor,
};
use crate::storage::document_store::{DocumentStore, SaveRequest};
use crate::storage::error::StoreError;
use crate::storage::fingerprint::compute_file_hash;
use crate::tree::assembly::{apply_radial_layout, assemble_outline};
use crate::tree::node_store::{NodeExpansion, NodeStore};
use crate::tree::restore::{restore_mind_map, RestoreError};
use log::{error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Maximum node ids reported as answer sources.
const MAX_SOURCE_NODES: usize = 5;

/// Result type used by document service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from document service operations.
#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    Restore(RestoreError),
    Collaborator(CollaboratorError),
    /// Extracted document exceeds the configured page limit.
    TooManyPages { page_count: u32, max: u32 },
    /// Nothing is persisted for this content hash.
    NotFound(String),
    /// No tree is loaded in memory for this document.
    DocumentNotLoaded(DocumentId),
    NodeNotFound(NodeId),
    /// Document tree yielded no text to answer from.
    NoContext(DocumentId),
    /// Store reported the folder could not be removed.
    DeleteFailed(String),
    /// Audit reads require debug mode.
    AuditDisabled,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Restore(err) => write!(f, "failed to restore mind map: {err}"),
            Self::Collaborator(err) => write!(f, "{err}"),
            Self::TooManyPages { page_count, max } => {
                write!(f, "document has {page_count} pages, limit is {max}")
            }
            Self::NotFound(hash) => write!(f, "document not found: {hash}"),
            Self::DocumentNotLoaded(id) => write!(f, "mind map not loaded for document {id}"),
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::NoContext(id) => write!(f, "no context available for document {id}"),
            Self::DeleteFailed(hash) => write!(f, "failed to delete document {hash}"),
            Self::AuditDisabled => write!(f, "audit log is only available in debug mode"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Restore(err) => Some(err),
            Self::Collaborator(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RestoreError> for ServiceError {
    fn from(value: RestoreError) -> Self {
        Self::Restore(value)
    }
}

impl From<CollaboratorError> for ServiceError {
    fn from(value: CollaboratorError) -> Self {
        Self::Collaborator(value)
    }
}

/// Processing lifecycle of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Registry entry for a document known to this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub original_filename: String,
    pub page_count: u32,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
}

/// Document whose tree is now held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub content_hash: String,
    pub document_id: DocumentId,
    pub root_id: NodeId,
    pub node_count: usize,
}

/// How `DocumentService::ingest` obtained the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Fingerprint was already persisted; tree restored from disk.
    Restored(LoadedDocument),
    /// Tree generated through the collaborators and saved.
    Generated(LoadedDocument),
}

impl IngestOutcome {
    pub fn document(&self) -> &LoadedDocument {
        match self {
            Self::Restored(document) | Self::Generated(document) => document,
        }
    }
}

/// Answer plus the nodes it was drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct QaResponse {
    pub answer: Answer,
    /// At most five node ids, in context order.
    pub source_nodes: Vec<NodeId>,
}

/// Document service facade over the store, node store and collaborators.
pub struct DocumentService<E: TextExtractor, S: OutlineStructurer> {
    store: Arc<DocumentStore>,
    nodes: Arc<NodeStore>,
    extractor: E,
    structurer: S,
    config: StoreConfig,
    records: RwLock<HashMap<String, DocumentRecord>>,
}

impl<E: TextExtractor, S: OutlineStructurer> DocumentService<E, S> {
    pub fn new(
        store: Arc<DocumentStore>,
        nodes: Arc<NodeStore>,
        extractor: E,
        structurer: S,
        config: StoreConfig,
    ) -> Self {
        Self {
            store,
            nodes,
            extractor,
            structurer,
            config,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn nodes(&self) -> &Arc<NodeStore> {
        &self.nodes
    }

    /// Ingests the document at `source`.
    ///
    /// Restores from disk when its fingerprint is already persisted; otherwise
    /// stores the original, extracts, structures, lays out and saves a new tree.
    ///
    /// # Errors
    /// - `ServiceError::TooManyPages` above `max_document_pages`.
    /// - Store, restore and collaborator failures are propagated; a failure
    ///   after the record is registered marks it `Failed`.
    pub fn ingest(&self, source: &Path, original_filename: &str) -> ServiceResult<IngestOutcome> {
        let content_hash = compute_file_hash(source)?.to_string();
        info!(
            "event=document_ingest module=service status=start content_hash={}",
            content_hash
        );

        if self.store.exists(&content_hash)? {
            match self.restore(&content_hash)? {
                Some(loaded) => return Ok(IngestOutcome::Restored(loaded)),
                None => warn!(
                    "event=document_ingest module=service status=regenerate content_hash={} reason=unreadable_mindmap",
                    content_hash
                ),
            }
        }

        let document_id = Uuid::new_v4();
        self.store.create_folder(&content_hash, source)?;
        self.put_record(
            &content_hash,
            DocumentRecord {
                id: document_id,
                original_filename: original_filename.to_string(),
                page_count: 0,
                status: ProcessingStatus::Pending,
                error_message: None,
            },
        );

        match self.generate(&content_hash, document_id, source, original_filename) {
            Ok(loaded) => {
                self.with_record(&content_hash, |record| {
                    record.status = ProcessingStatus::Completed;
                });
                info!(
                    "event=document_ingest module=service status=ok content_hash={} node_count={}",
                    content_hash, loaded.node_count
                );
                Ok(IngestOutcome::Generated(loaded))
            }
            Err(err) => {
                self.with_record(&content_hash, |record| {
                    record.status = ProcessingStatus::Failed;
                    record.error_message = Some(err.to_string());
                });
                error!(
                    "event=document_ingest module=service status=error content_hash={} error={}",
                    content_hash, err
                );
                Err(err)
            }
        }
    }

    fn generate(
        &self,
        content_hash: &str,
        document_id: DocumentId,
        source: &Path,
        original_filename: &str,
    ) -> ServiceResult<LoadedDocument> {
        self.with_record(content_hash, |record| {
            record.status = ProcessingStatus::Processing;
        });
        let original = self
            .store
            .original_path(content_hash)?
            .unwrap_or_else(|| source.to_path_buf());
        let extracted = self.extractor.extract(&original)?;
        if extracted.page_count > self.config.max_document_pages {
            return Err(ServiceError::TooManyPages {
                page_count: extracted.page_count,
                max: self.config.max_document_pages,
            });
        }
        self.with_record(content_hash, |record| {
            record.page_count = extracted.page_count;
        });

        let outline = self.structurer.structure(&extracted.text)?;
        let mut tree = assemble_outline(document_id, &outline);
        apply_radial_layout(&mut tree);

        let root_id = tree.root_id;
        let saved_nodes = tree.nodes.clone();
        self.nodes.insert_tree(tree);

        let saved = self.store.save(SaveRequest {
            content_hash,
            document_id,
            original_filename,
            page_count: extracted.page_count,
            root_node_id: root_id,
            nodes: &saved_nodes,
        });
        if let Err(err) = saved {
            self.nodes.remove_document(document_id);
            return Err(err.into());
        }

        Ok(LoadedDocument {
            content_hash: content_hash.to_string(),
            document_id,
            root_id,
            node_count: saved_nodes.len(),
        })
    }

    /// Loads a persisted document into memory.
    ///
    /// # Errors
    /// - `ServiceError::NotFound` when nothing readable is stored.
    pub fn load(&self, content_hash: &str) -> ServiceResult<LoadedDocument> {
        if !self.store.exists(content_hash)? {
            return Err(ServiceError::NotFound(content_hash.to_string()));
        }
        self.restore(content_hash)?
            .ok_or_else(|| ServiceError::NotFound(content_hash.to_string()))
    }

    fn restore(&self, content_hash: &str) -> ServiceResult<Option<LoadedDocument>> {
        let Some(mind_map) = self.store.load(content_hash)? else {
            return Ok(None);
        };
        let restored = restore_mind_map(&self.nodes, &mind_map)?;
        self.put_record(
            content_hash,
            DocumentRecord {
                id: restored.document_id,
                original_filename: mind_map.original_filename.clone(),
                page_count: mind_map.page_count,
                status: ProcessingStatus::Completed,
                error_message: None,
            },
        );
        Ok(Some(LoadedDocument {
            content_hash: content_hash.to_string(),
            document_id: restored.document_id,
            root_id: restored.root_id,
            node_count: restored.node_count,
        }))
    }

    /// Root-first nodes of a loaded document down to `depth` levels.
    pub fn mind_map(&self, document_id: DocumentId, depth: u32) -> ServiceResult<Vec<MindMapNode>> {
        if self.nodes.root_of(document_id).is_none() {
            return Err(ServiceError::DocumentNotLoaded(document_id));
        }
        Ok(self.nodes.collect_to_depth(document_id, depth))
    }

    /// One node with its direct children.
    pub fn expand(&self, node_id: NodeId, include_content: bool) -> ServiceResult<NodeExpansion> {
        self.nodes
            .expand(node_id, include_content)
            .ok_or(ServiceError::NodeNotFound(node_id))
    }

    /// Answers `question` against a loaded document.
    ///
    /// Context is `context_node` plus its children when given, otherwise the
    /// whole tree in pre-order.
    pub fn ask(
        &self,
        document_id: DocumentId,
        question: &str,
        context_node: Option<NodeId>,
        answerer: &dyn QuestionAnswerer,
    ) -> ServiceResult<QaResponse> {
        if self.nodes.root_of(document_id).is_none() {
            return Err(ServiceError::DocumentNotLoaded(document_id));
        }

        let context_nodes: Vec<MindMapNode> = match context_node {
            Some(node_id) => match self.nodes.expand(node_id, true) {
                Some(expansion) => {
                    let children = expansion
                        .node
                        .children_ids
                        .iter()
                        .filter_map(|id| self.nodes.get(*id));
                    std::iter::once(expansion.node.clone())
                        .chain(children)
                        .collect()
                }
                None => Vec::new(),
            },
            None => self.nodes.nodes_for_document(document_id),
        };
        if context_nodes.is_empty() {
            return Err(ServiceError::NoContext(document_id));
        }

        let context = context_nodes
            .iter()
            .map(|node| {
                let body = node.full_content.as_deref().unwrap_or(&node.summary);
                format!("## {}\n{}", node.title, body)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let answer = answerer.answer(question, &context)?;

        info!(
            "event=document_ask module=service status=ok document_id={} context_nodes={} confidence={}",
            document_id,
            context_nodes.len(),
            answer.confidence
        );
        Ok(QaResponse {
            answer,
            source_nodes: context_nodes
                .iter()
                .take(MAX_SOURCE_NODES)
                .map(|node| node.id)
                .collect(),
        })
    }

    /// Removes a document from memory and disk.
    ///
    /// # Errors
    /// - `ServiceError::NotFound` when nothing is persisted.
    /// - `ServiceError::DeleteFailed` when the folder could not be removed.
    pub fn delete(&self, content_hash: &str) -> ServiceResult<()> {
        if !self.store.exists(content_hash)? {
            return Err(ServiceError::NotFound(content_hash.to_string()));
        }

        let removed = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(content_hash);
        if let Some(record) = removed {
            let dropped = self.nodes.remove_document(record.id);
            info!(
                "event=document_unload module=service status=ok content_hash={} dropped_nodes={}",
                content_hash, dropped
            );
        }

        if !self.store.delete(content_hash)? {
            return Err(ServiceError::DeleteFailed(content_hash.to_string()));
        }
        Ok(())
    }

    pub fn record(&self, content_hash: &str) -> Option<DocumentRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(content_hash)
            .cloned()
    }

    /// Persisted documents, newest first.
    pub fn list(&self) -> ServiceResult<Vec<DocumentInfo>> {
        Ok(self.store.list()?)
    }

    /// Audit journal, newest first. Debug mode only.
    pub fn audit_log(&self, content_hash: &str) -> ServiceResult<Vec<AuditEntry>> {
        if !self.config.debug {
            return Err(ServiceError::AuditDisabled);
        }
        if !self.store.exists(content_hash)? {
            return Err(ServiceError::NotFound(content_hash.to_string()));
        }
        Ok(self.store.audit_log(content_hash)?)
    }

    fn put_record(&self, content_hash: &str, record: DocumentRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content_hash.to_string(), record);
    }

    fn with_record(&self, content_hash: &str, update: impl FnOnce(&mut DocumentRecord)) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = records.get_mut(content_hash) {
            update(record);
        }
    }
}
