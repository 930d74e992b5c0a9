//! Turns a structured outline into a node tree and lays it out.
//!
//! # Responsibility
//! - Convert nested `OutlineEntry` values into a `NodeTree` with fresh ids.
//! - Assign display coordinates (radial by default, horizontal tree optional).
//!
//! # Invariants
//! - Traversals use explicit stacks/queues; outline nesting cannot overflow
//!   the call stack.
//! - Nodes deeper than `MAX_OUTLINE_DEPTH` are dropped and logged.

use crate::model::node::{DocumentId, MindMapNode, NodeId, NodeTree};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::PI;

/// Deepest node depth kept when assembling an outline.
pub const MAX_OUTLINE_DEPTH: u32 = 64;

const RADIAL_BASE_RADIUS: f64 = 200.0;
const RADIAL_RADIUS_PER_DEPTH: f64 = 100.0;
const TREE_HORIZONTAL_SPACING: f64 = 300.0;
const TREE_VERTICAL_SPACING: f64 = 100.0;

fn default_title() -> String {
    "Untitled".to_string()
}

/// One entry of the outline produced by the structuring collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub full_content: Option<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub page_start: Option<u32>,
    #[serde(default)]
    pub page_end: Option<u32>,
    #[serde(default)]
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            full_content: None,
            key_concepts: Vec::new(),
            page_start: None,
            page_end: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineEntry>) -> Self {
        self.children = children;
        self
    }
}

/// Builds a tree for `document_id` from `outline`, nodes in pre-order.
pub fn assemble_outline(document_id: DocumentId, outline: &OutlineEntry) -> NodeTree {
    let mut nodes: Vec<MindMapNode> = Vec::new();
    let mut dropped = 0usize;
    let mut stack: Vec<(&OutlineEntry, Option<usize>, u32)> = vec![(outline, None, 0)];

    while let Some((entry, parent_index, depth)) = stack.pop() {
        let parent_id = parent_index.map(|index| nodes[index].id);
        let mut node = MindMapNode::new(
            document_id,
            parent_id,
            depth,
            entry.title.clone(),
            entry.summary.clone(),
        );
        node.full_content = entry.full_content.clone();
        node.key_concepts = entry.key_concepts.clone();
        node.page_start = entry.page_start;
        node.page_end = entry.page_end;

        let index = nodes.len();
        if let Some(parent_index) = parent_index {
            nodes[parent_index].push_child(node.id);
        }
        nodes.push(node);

        if entry.children.is_empty() {
            continue;
        }
        if depth >= MAX_OUTLINE_DEPTH {
            dropped += count_entries(&entry.children);
            continue;
        }
        for child in entry.children.iter().rev() {
            stack.push((child, Some(index), depth + 1));
        }
    }

    if dropped > 0 {
        warn!(
            "event=outline_assemble module=tree status=truncated document_id={} max_depth={} dropped_nodes={}",
            document_id, MAX_OUTLINE_DEPTH, dropped
        );
    }
    debug!(
        "event=outline_assemble module=tree status=ok document_id={} node_count={}",
        document_id,
        nodes.len()
    );

    let root_id = nodes[0].id;
    NodeTree {
        document_id,
        root_id,
        nodes,
    }
}

fn count_entries(entries: &[OutlineEntry]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&OutlineEntry> = entries.iter().collect();
    while let Some(entry) = stack.pop() {
        count += 1;
        stack.extend(entry.children.iter());
    }
    count
}

fn position_index(tree: &NodeTree) -> HashMap<NodeId, usize> {
    tree.nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id, index))
        .collect()
}

/// Radial layout: root at the origin, children of a depth-`d` node spread on
/// a circle of radius `200 + 100 * d` around it, first child at the top.
pub fn apply_radial_layout(tree: &mut NodeTree) {
    let positions = position_index(tree);
    let Some(&root_index) = positions.get(&tree.root_id) else {
        return;
    };

    tree.nodes[root_index].position_x = 0.0;
    tree.nodes[root_index].position_y = 0.0;

    let mut seen = HashSet::from([root_index]);
    let mut queue = VecDeque::from([root_index]);
    while let Some(index) = queue.pop_front() {
        let parent = &tree.nodes[index];
        let (origin_x, origin_y) = (parent.position_x, parent.position_y);
        let radius = RADIAL_BASE_RADIUS + RADIAL_RADIUS_PER_DEPTH * f64::from(parent.depth);
        // Slots follow `children_ids`; an unresolved id keeps its slot empty.
        let children: Vec<(usize, usize)> = parent
            .children_ids
            .iter()
            .enumerate()
            .filter_map(|(slot, id)| positions.get(id).map(|&index| (slot, index)))
            .collect();
        let count = parent.children_ids.len() as f64;

        for (slot, child_index) in children {
            if !seen.insert(child_index) {
                continue;
            }
            let angle = 2.0 * PI * slot as f64 / count - PI / 2.0;
            let child = &mut tree.nodes[child_index];
            child.position_x = origin_x + radius * angle.cos();
            child.position_y = origin_y + radius * angle.sin();
            queue.push_back(child_index);
        }
    }
}

/// Horizontal tree layout: `x = 300 * depth`, leaves stacked 100 apart per
/// depth in visit order, parents centred on their children.
pub fn apply_tree_layout(tree: &mut NodeTree) {
    let positions = position_index(tree);
    let Some(&root_index) = positions.get(&tree.root_id) else {
        return;
    };

    let mut next_y: HashMap<u32, f64> = HashMap::new();
    let mut seen = HashSet::from([root_index]);
    // (node index, x, children already placed)
    let mut stack = vec![(root_index, 0.0f64, false)];

    while let Some((index, x, expanded)) = stack.pop() {
        let children: Vec<usize> = tree.nodes[index]
            .children_ids
            .iter()
            .filter_map(|id| positions.get(id).copied())
            .collect();

        if expanded {
            let sum: f64 = children
                .iter()
                .map(|child| tree.nodes[*child].position_y)
                .sum();
            tree.nodes[index].position_y = sum / children.len() as f64;
            continue;
        }

        tree.nodes[index].position_x = x;
        let fresh: Vec<usize> = children
            .into_iter()
            .filter(|child| seen.insert(*child))
            .collect();
        if fresh.is_empty() {
            let depth = tree.nodes[index].depth;
            let slot = next_y.entry(depth).or_insert(0.0);
            tree.nodes[index].position_y = *slot;
            *slot += TREE_VERTICAL_SPACING;
            continue;
        }

        stack.push((index, x, true));
        for child in fresh.into_iter().rev() {
            stack.push((child, x + TREE_HORIZONTAL_SPACING, false));
        }
    }
}
