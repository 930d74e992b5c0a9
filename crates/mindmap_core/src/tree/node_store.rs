//! Process-local index of mind-map nodes.
//!
//! # Responsibility
//! - Hold every live node by id plus the document to root mapping.
//! - Serve progressive browsing (expand, depth-limited collection).
//!
//! # Invariants
//! - Inserting a tree first drops any nodes previously held for its document.
//! - Traversals are iterative and visit each node at most once.
//! - A poisoned lock is recovered; readers never panic.

use crate::model::node::{DocumentId, MindMapNode, NodeId, NodeTree};
use log::info;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One node plus its direct children, as returned by `NodeStore::expand`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeExpansion {
    pub node: MindMapNode,
    /// Never carry `full_content`.
    pub children: Vec<MindMapNode>,
}

#[derive(Debug, Default)]
struct NodeIndex {
    nodes: HashMap<NodeId, MindMapNode>,
    roots: HashMap<DocumentId, NodeId>,
}

impl NodeIndex {
    fn remove_document(&mut self, document_id: DocumentId) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.document_id != document_id);
        self.roots.remove(&document_id);
        before - self.nodes.len()
    }

    /// Pre-order walk from `root_id`, stopping below `max_depth` levels.
    fn pre_order(&self, root_id: NodeId, max_depth: Option<u32>) -> Vec<&MindMapNode> {
        let mut ordered = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(root_id, 0u32)];

        while let Some((id, level)) = stack.pop() {
            if max_depth.is_some_and(|max| level > max) || !seen.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            ordered.push(node);
            for child_id in node.children_ids.iter().rev() {
                stack.push((*child_id, level + 1));
            }
        }
        ordered
    }
}

/// Shared in-memory node store; wrap in `Arc` to share.
#[derive(Debug, Default)]
pub struct NodeStore {
    inner: RwLock<NodeIndex>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeIndex> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeIndex> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `tree`, replacing whatever was held for its document.
    ///
    /// Returns the number of nodes dropped from the previous tree.
    pub fn insert_tree(&self, tree: NodeTree) -> usize {
        let mut index = self.write();
        let replaced = index.remove_document(tree.document_id);
        index.roots.insert(tree.document_id, tree.root_id);
        for node in tree.nodes {
            index.nodes.insert(node.id, node);
        }
        if replaced > 0 {
            info!(
                "event=tree_replace module=tree status=ok document_id={} replaced_nodes={}",
                tree.document_id, replaced
            );
        }
        replaced
    }

    pub fn get(&self, id: NodeId) -> Option<MindMapNode> {
        self.read().nodes.get(&id).cloned()
    }

    pub fn root_of(&self, document_id: DocumentId) -> Option<NodeId> {
        self.read().roots.get(&document_id).copied()
    }

    /// Returns the node and its direct children.
    ///
    /// `full_content` is kept on the node only when `include_content` is set;
    /// children never carry it. Child ids with no stored node are skipped.
    pub fn expand(&self, id: NodeId, include_content: bool) -> Option<NodeExpansion> {
        let index = self.read();
        let node = index.nodes.get(&id)?;
        let children = node
            .children_ids
            .iter()
            .filter_map(|child_id| index.nodes.get(child_id))
            .map(MindMapNode::collapsed)
            .collect();
        let node = if include_content {
            node.clone()
        } else {
            node.collapsed()
        };
        Some(NodeExpansion { node, children })
    }

    /// Collects nodes of `document_id` down to `max_depth` levels below the
    /// root, root first in pre-order.
    ///
    /// Only the root keeps `full_content`.
    pub fn collect_to_depth(&self, document_id: DocumentId, max_depth: u32) -> Vec<MindMapNode> {
        let index = self.read();
        let Some(root_id) = index.roots.get(&document_id).copied() else {
            return Vec::new();
        };
        index
            .pre_order(root_id, Some(max_depth))
            .into_iter()
            .map(|node| {
                if node.id == root_id {
                    node.clone()
                } else {
                    node.collapsed()
                }
            })
            .collect()
    }

    /// Every reachable node of `document_id`, pre-order from the root.
    pub fn nodes_for_document(&self, document_id: DocumentId) -> Vec<MindMapNode> {
        let index = self.read();
        let Some(root_id) = index.roots.get(&document_id).copied() else {
            return Vec::new();
        };
        index
            .pre_order(root_id, None)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drops all nodes and the root mapping of `document_id`.
    pub fn remove_document(&self, document_id: DocumentId) -> usize {
        self.write().remove_document(document_id)
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn document_count(&self) -> usize {
        self.read().roots.len()
    }
}
