//! Content-addressed document store and mind-map node trees.
//! This crate owns the on-disk layout and every tree invariant.

pub mod config;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod tree;

pub use config::{ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use model::node::{
    DocumentId, MindMapNode, NodeId, NodeKind, NodeTree, TreeValidationError,
};
pub use model::persisted::{AuditAction, AuditEntry, DocumentInfo, PersistedMindMap, PersistedNode};
pub use service::{
    Answer, CollaboratorError, DocumentRecord, DocumentService, ExtractedText, IngestOutcome,
    LoadedDocument, OutlineStructurer, ProcessingStatus, QaResponse, QuestionAnswerer,
    ServiceError, ServiceResult, TextExtractor,
};
pub use storage::{
    compute_content_hash, compute_file_hash, is_valid_content_hash, AsyncDocumentStore,
    ContentHash, DocumentStore, SaveMindMap, SaveRequest, StoreError, StoreResult,
};
pub use tree::{
    apply_radial_layout, apply_tree_layout, assemble_outline, restore_mind_map, NodeExpansion,
    NodeStore, OutlineEntry, RestoreError, RestoredTree,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
