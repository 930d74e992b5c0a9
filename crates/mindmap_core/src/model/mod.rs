//! Domain model for document outlines and their persisted form.
//!
//! # Responsibility
//! - Define in-memory nodes and trees used by assembly and browsing.
//! - Define the on-disk records written by the document store.
//!
//! # Invariants
//! - In-memory ids are typed (`Uuid`); persisted ids are plain strings.
//! - Conversion from persisted to typed form happens only in `tree::restore`.

pub mod node;
pub mod persisted;
