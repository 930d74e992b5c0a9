//! Rebuilds the in-memory tree from a persisted mind map.
//!
//! # Invariants
//! - Every record is parsed before anything is inserted; a bad record leaves
//!   the `NodeStore` untouched.
//! - Nodes of other documents are never modified.

use crate::model::node::{DocumentId, MindMapNode, NodeId, NodeKind, NodeTree};
use crate::model::persisted::{PersistedMindMap, PersistedNode};
use crate::tree::node_store::NodeStore;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Persisted record that cannot be turned back into live nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    /// An id field is not a UUID.
    InvalidId { field: &'static str, value: String },
    /// `node_type` is outside the known vocabulary.
    InvalidNodeType { node_id: String, value: String },
    /// `root_node_id` does not name any stored node.
    MissingRoot(String),
    /// Node claims a different document than the mind map.
    ForeignNode { node_id: String, document_id: String },
}

impl Display for RestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId { field, value } => write!(f, "invalid {field}: `{value}`"),
            Self::InvalidNodeType { node_id, value } => {
                write!(f, "node {node_id} has unknown node_type `{value}`")
            }
            Self::MissingRoot(id) => write!(f, "root node {id} not found in mind map"),
            Self::ForeignNode {
                node_id,
                document_id,
            } => write!(f, "node {node_id} belongs to document {document_id}"),
        }
    }
}

impl Error for RestoreError {}

/// Summary of a completed restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoredTree {
    pub document_id: DocumentId,
    pub root_id: NodeId,
    pub node_count: usize,
}

/// Parses `mind_map` and installs it in `store`, replacing any earlier tree
/// held for the same document.
pub fn restore_mind_map(
    store: &NodeStore,
    mind_map: &PersistedMindMap,
) -> Result<RestoredTree, RestoreError> {
    let tree = match parse_tree(mind_map) {
        Ok(tree) => tree,
        Err(err) => {
            error!(
                "event=mindmap_restore module=tree status=error content_hash={} error={}",
                mind_map.content_hash, err
            );
            return Err(err);
        }
    };

    let restored = RestoredTree {
        document_id: tree.document_id,
        root_id: tree.root_id,
        node_count: tree.len(),
    };
    store.insert_tree(tree);

    info!(
        "event=mindmap_restore module=tree status=ok content_hash={} node_count={}",
        mind_map.content_hash, restored.node_count
    );
    Ok(restored)
}

fn parse_tree(mind_map: &PersistedMindMap) -> Result<NodeTree, RestoreError> {
    let document_id = parse_id("document_id", &mind_map.document_id)?;
    let root_id = parse_id("root_node_id", &mind_map.root_node_id)?;

    let nodes = mind_map
        .nodes
        .iter()
        .map(|record| parse_node(record, document_id))
        .collect::<Result<Vec<_>, _>>()?;

    if !nodes.iter().any(|node| node.id == root_id) {
        return Err(RestoreError::MissingRoot(mind_map.root_node_id.clone()));
    }

    Ok(NodeTree {
        document_id,
        root_id,
        nodes,
    })
}

fn parse_node(record: &PersistedNode, document_id: DocumentId) -> Result<MindMapNode, RestoreError> {
    let id = parse_id("id", &record.id)?;
    let owner = parse_id("document_id", &record.document_id)?;
    if owner != document_id {
        return Err(RestoreError::ForeignNode {
            node_id: record.id.clone(),
            document_id: record.document_id.clone(),
        });
    }
    let kind = NodeKind::parse(&record.node_type).ok_or_else(|| RestoreError::InvalidNodeType {
        node_id: record.id.clone(),
        value: record.node_type.clone(),
    })?;
    let parent_id = record
        .parent_id
        .as_deref()
        .map(|value| parse_id("parent_id", value))
        .transpose()?;
    let children_ids = record
        .children_ids
        .iter()
        .map(|value| parse_id("children_ids", value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MindMapNode {
        id,
        document_id,
        parent_id,
        title: record.title.clone(),
        summary: record.summary.clone(),
        full_content: record.full_content.clone(),
        kind,
        depth: record.depth,
        children_ids,
        key_concepts: record.key_concepts.clone(),
        has_children: record.has_children,
        page_start: record.page_start,
        page_end: record.page_end,
        position_x: record.position_x,
        position_y: record.position_y,
    })
}

fn parse_id(field: &'static str, value: &str) -> Result<Uuid, RestoreError> {
    Uuid::parse_str(value).map_err(|_| RestoreError::InvalidId {
        field,
        value: value.to_string(),
    })
}
