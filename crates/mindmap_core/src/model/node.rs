//! Mind-map node domain model.
//!
//! # Responsibility
//! - Define the typed node shared by assembly, restore and storage.
//! - Define the per-document node tree and its structural checks.
//!
//! # Invariants
//! - `depth` of a child is its parent's `depth + 1`; the root has depth 0.
//! - `node_type` is a pure function of `depth` (see `NodeKind::from_depth`).
//! - `has_children` is true iff `children_ids` is non-empty.
//! - Every child id resolves to a node whose `parent_id` points back.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one outline node.
pub type NodeId = Uuid;

/// Internal identifier of one ingested document.
///
/// Regenerated on every fresh ingest; only the content hash is a safe
/// external key.
pub type DocumentId = Uuid;

/// Outline level of a node, derived from its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Section,
    Subsection,
    Topic,
    /// Any depth of 4 or more.
    Detail,
}

impl NodeKind {
    /// Maps tree depth to node kind. Depth >= 4 collapses to `Detail`.
    pub fn from_depth(depth: u32) -> Self {
        match depth {
            0 => Self::Root,
            1 => Self::Section,
            2 => Self::Subsection,
            3 => Self::Topic,
            _ => Self::Detail,
        }
    }

    /// Wire name used in `mindmap.json`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Section => "section",
            Self::Subsection => "subsection",
            Self::Topic => "topic",
            Self::Detail => "detail",
        }
    }

    /// Parses the wire name back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "root" => Some(Self::Root),
            "section" => Some(Self::Section),
            "subsection" => Some(Self::Subsection),
            "topic" => Some(Self::Topic),
            "detail" => Some(Self::Detail),
            _ => None,
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a document outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: NodeId,
    /// Owning document.
    pub document_id: DocumentId,
    /// `None` only for the root.
    pub parent_id: Option<NodeId>,
    pub title: String,
    /// Short text shown while the node is collapsed.
    pub summary: String,
    /// Long text, shown on expansion only.
    pub full_content: Option<String>,
    #[serde(rename = "node_type")]
    pub kind: NodeKind,
    pub depth: u32,
    /// Ordered child ids.
    pub children_ids: Vec<NodeId>,
    pub key_concepts: Vec<String>,
    pub has_children: bool,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
    /// Cosmetic layout coordinate.
    pub position_x: f64,
    /// Cosmetic layout coordinate.
    pub position_y: f64,
}

impl MindMapNode {
    /// Creates a leaf node with a fresh id at `depth`, kind derived from depth.
    pub fn new(
        document_id: DocumentId,
        parent_id: Option<NodeId>,
        depth: u32,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            parent_id,
            title: title.into(),
            summary: summary.into(),
            full_content: None,
            kind: NodeKind::from_depth(depth),
            depth,
            children_ids: Vec::new(),
            key_concepts: Vec::new(),
            has_children: false,
            page_start: None,
            page_end: None,
            position_x: 0.0,
            position_y: 0.0,
        }
    }

    /// Appends a child id and keeps `has_children` in sync.
    pub fn push_child(&mut self, child_id: NodeId) {
        self.children_ids.push(child_id);
        self.has_children = true;
    }

    /// Returns a copy without `full_content`, used for collapsed projections.
    pub fn collapsed(&self) -> Self {
        Self {
            full_content: None,
            ..self.clone()
        }
    }
}

/// Structural violation found by `NodeTree::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeValidationError {
    /// `root_id` is not among the tree nodes.
    MissingRoot(NodeId),
    /// Root node has a parent or non-zero depth.
    InvalidRoot(NodeId),
    /// Two nodes share one id.
    DuplicateNode(NodeId),
    /// Node belongs to a different document than the tree.
    ForeignNode { node_id: NodeId, document_id: DocumentId },
    /// Child id does not resolve to any node in the tree.
    DanglingChild { parent_id: NodeId, child_id: NodeId },
    /// Child does not point back to the referencing parent.
    ParentMismatch { parent_id: NodeId, child_id: NodeId },
    /// Child depth is not parent depth + 1.
    DepthMismatch { node_id: NodeId, expected: u32, actual: u32 },
    /// Node kind disagrees with its depth.
    KindMismatch { node_id: NodeId, expected: NodeKind, actual: NodeKind },
    /// `has_children` disagrees with `children_ids`.
    ChildrenFlagMismatch(NodeId),
}

impl Display for TreeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRoot(id) => write!(f, "root node not found in tree: {id}"),
            Self::InvalidRoot(id) => {
                write!(f, "root node must have no parent and depth 0: {id}")
            }
            Self::DuplicateNode(id) => write!(f, "duplicate node id in tree: {id}"),
            Self::ForeignNode {
                node_id,
                document_id,
            } => write!(
                f,
                "node {node_id} belongs to document {document_id}, not to this tree"
            ),
            Self::DanglingChild {
                parent_id,
                child_id,
            } => write!(f, "node {parent_id} references missing child {child_id}"),
            Self::ParentMismatch {
                parent_id,
                child_id,
            } => write!(
                f,
                "child {child_id} does not point back to parent {parent_id}"
            ),
            Self::DepthMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "node {node_id} has depth {actual}, expected {expected}"
            ),
            Self::KindMismatch {
                node_id,
                expected,
                actual,
            } => write!(f, "node {node_id} has kind {actual}, expected {expected}"),
            Self::ChildrenFlagMismatch(id) => {
                write!(f, "node {id} has_children flag disagrees with children_ids")
            }
        }
    }
}

impl Error for TreeValidationError {}

/// All nodes of one document plus the root pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    pub document_id: DocumentId,
    pub root_id: NodeId,
    /// Pre-order, root first.
    pub nodes: Vec<MindMapNode>,
}

impl NodeTree {
    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up one node by id (linear scan).
    pub fn node(&self, id: NodeId) -> Option<&MindMapNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Returns the root node, if present.
    pub fn root(&self) -> Option<&MindMapNode> {
        self.node(self.root_id)
    }

    /// Checks the structural invariants of the tree.
    ///
    /// Returns the first violation found, scanning nodes in stored order.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let mut index: HashMap<NodeId, &MindMapNode> = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if index.insert(node.id, node).is_some() {
                return Err(TreeValidationError::DuplicateNode(node.id));
            }
        }

        let root = index
            .get(&self.root_id)
            .ok_or(TreeValidationError::MissingRoot(self.root_id))?;
        if root.parent_id.is_some() || root.depth != 0 {
            return Err(TreeValidationError::InvalidRoot(self.root_id));
        }

        for node in &self.nodes {
            if node.document_id != self.document_id {
                return Err(TreeValidationError::ForeignNode {
                    node_id: node.id,
                    document_id: node.document_id,
                });
            }
            let expected_kind = NodeKind::from_depth(node.depth);
            if node.kind != expected_kind {
                return Err(TreeValidationError::KindMismatch {
                    node_id: node.id,
                    expected: expected_kind,
                    actual: node.kind,
                });
            }
            if node.has_children == node.children_ids.is_empty() {
                return Err(TreeValidationError::ChildrenFlagMismatch(node.id));
            }
            for child_id in &node.children_ids {
                let child = index
                    .get(child_id)
                    .ok_or(TreeValidationError::DanglingChild {
                        parent_id: node.id,
                        child_id: *child_id,
                    })?;
                if child.parent_id != Some(node.id) {
                    return Err(TreeValidationError::ParentMismatch {
                        parent_id: node.id,
                        child_id: *child_id,
                    });
                }
                if child.depth != node.depth + 1 {
                    return Err(TreeValidationError::DepthMismatch {
                        node_id: child.id,
                        expected: node.depth + 1,
                        actual: child.depth,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MindMapNode, NodeKind, NodeTree, TreeValidationError};
    use uuid::Uuid;

    fn two_level_tree() -> NodeTree {
        let document_id = Uuid::new_v4();
        let mut root = MindMapNode::new(document_id, None, 0, "Doc", "overview");
        let child = MindMapNode::new(document_id, Some(root.id), 1, "Intro", "first");
        root.push_child(child.id);
        NodeTree {
            document_id,
            root_id: root.id,
            nodes: vec![root, child],
        }
    }

    #[test]
    fn kind_collapses_deep_levels_to_detail() {
        assert_eq!(NodeKind::from_depth(0), NodeKind::Root);
        assert_eq!(NodeKind::from_depth(3), NodeKind::Topic);
        assert_eq!(NodeKind::from_depth(4), NodeKind::Detail);
        assert_eq!(NodeKind::from_depth(40), NodeKind::Detail);
    }

    #[test]
    fn kind_wire_names_parse_back() {
        for kind in [
            NodeKind::Root,
            NodeKind::Section,
            NodeKind::Subsection,
            NodeKind::Topic,
            NodeKind::Detail,
        ] {
            assert_eq!(NodeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NodeKind::parse("Root"), None);
    }

    #[test]
    fn validate_accepts_consistent_tree() {
        two_level_tree().validate().expect("tree should be valid");
    }

    #[test]
    fn validate_rejects_stale_children_flag() {
        let mut tree = two_level_tree();
        tree.nodes[1].has_children = true;
        let err = tree.validate().expect_err("flag mismatch must fail");
        assert_eq!(err, TreeValidationError::ChildrenFlagMismatch(tree.nodes[1].id));
    }

    #[test]
    fn validate_rejects_depth_skip() {
        let mut tree = two_level_tree();
        tree.nodes[1].depth = 2;
        tree.nodes[1].kind = NodeKind::Subsection;
        let err = tree.validate().expect_err("depth skip must fail");
        assert!(matches!(err, TreeValidationError::DepthMismatch { expected: 1, actual: 2, .. }));
    }

    #[test]
    fn collapsed_drops_full_content_only() {
        let mut node = MindMapNode::new(Uuid::new_v4(), None, 0, "t", "s");
        node.full_content = Some("long".to_string());
        let collapsed = node.collapsed();
        assert_eq!(collapsed.full_content, None);
        assert_eq!(collapsed.title, "t");
    }
}
