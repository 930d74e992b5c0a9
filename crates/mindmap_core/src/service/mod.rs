//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, node store and collaborator calls into document-level APIs.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod collaborators;
pub mod document_service;

pub use collaborators::{
    Answer, CollaboratorError, ExtractedText, OutlineStructurer, QuestionAnswerer, TextExtractor,
};
pub use document_service::{
    DocumentRecord, DocumentService, IngestOutcome, LoadedDocument, ProcessingStatus, QaResponse,
    ServiceError, ServiceResult,
};
