//! Filesystem persistence for documents, mind maps and audit journals.
//!
//! # Responsibility
//! - Map content hashes to document folders under one root.
//! - Keep all path construction behind content hash validation.
//!
//! # Layout
//! ```text
//! <root>/
//!   .gitkeep
//!   <content_hash>/
//!     original.pdf
//!     mindmap.json
//!     audit.log
//! ```

pub mod audit;
pub mod document_store;
pub mod error;
pub mod fingerprint;
pub mod offload;

pub use document_store::{DocumentStore, SaveRequest, MINDMAP_FILENAME, ORIGINAL_FILENAME};
pub use error::{StoreError, StoreResult};
pub use fingerprint::{compute_content_hash, compute_file_hash, is_valid_content_hash, ContentHash};
pub use offload::{AsyncDocumentStore, SaveMindMap};
