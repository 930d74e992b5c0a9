//! On-disk record shapes for `mindmap.json` and `audit.log`.
//!
//! # Responsibility
//! - Define the serialized mind-map and audit records byte-compatible with
//!   existing document folders.
//! - Keep identifiers as plain strings; typed parsing happens in restore.
//!
//! # Invariants
//! - `root_node_id` must appear among `nodes`.
//! - Every node's `document_id` equals the top-level `document_id`.
//! - Timestamps are naive UTC (`YYYY-MM-DDTHH:MM:SS.ffffff`, no offset).

use crate::model::node::MindMapNode;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Format tag written into every `mindmap.json`.
pub const MINDMAP_FORMAT_VERSION: &str = "1.0";

fn default_format_version() -> String {
    MINDMAP_FORMAT_VERSION.to_string()
}

/// Current time as naive UTC at microsecond precision, the flavour used on disk.
pub fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// Serialized form of one `MindMapNode`.
///
/// Optional fields default when absent so older or hand-edited files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedNode {
    pub id: String,
    pub document_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub full_content: Option<String>,
    pub node_type: String,
    pub depth: u32,
    #[serde(default)]
    pub children_ids: Vec<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub page_start: Option<u32>,
    #[serde(default)]
    pub page_end: Option<u32>,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
}

impl From<&MindMapNode> for PersistedNode {
    fn from(node: &MindMapNode) -> Self {
        Self {
            id: node.id.to_string(),
            document_id: node.document_id.to_string(),
            parent_id: node.parent_id.map(|id| id.to_string()),
            title: node.title.clone(),
            summary: node.summary.clone(),
            full_content: node.full_content.clone(),
            node_type: node.kind.as_str().to_string(),
            depth: node.depth,
            children_ids: node.children_ids.iter().map(ToString::to_string).collect(),
            key_concepts: node.key_concepts.clone(),
            has_children: node.has_children,
            page_start: node.page_start,
            page_end: node.page_end,
            position_x: node.position_x,
            position_y: node.position_y,
        }
    }
}

/// Contents of `mindmap.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMindMap {
    #[serde(default = "default_format_version")]
    pub version: String,
    pub document_id: String,
    pub content_hash: String,
    pub original_filename: String,
    pub page_count: u32,
    pub root_node_id: String,
    /// Insertion order of the producing tree.
    pub nodes: Vec<PersistedNode>,
    pub created_at: NaiveDateTime,
    pub last_modified: NaiveDateTime,
}

impl PersistedMindMap {
    /// Looks up one serialized node by its id string.
    pub fn node(&self, id: &str) -> Option<&PersistedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Fixed vocabulary of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    DocumentCreated,
    MindmapSaved,
    MindmapLoaded,
    MindmapUpdated,
}

impl AuditAction {
    /// Name written to the `action` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentCreated => "document_created",
            Self::MindmapSaved => "mindmap_saved",
            Self::MindmapLoaded => "mindmap_loaded",
            Self::MindmapUpdated => "mindmap_updated",
        }
    }
}

/// One line of `audit.log`.
///
/// `action` stays a free-form string on read so journals written by other
/// tools do not count as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: NaiveDateTime,
    pub action: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl AuditEntry {
    /// Builds an entry stamped with the current time.
    pub fn now(action: AuditAction, details: Map<String, Value>) -> Self {
        Self {
            timestamp: utc_now(),
            action: action.as_str().to_string(),
            details,
        }
    }

    /// Returns whether this entry records `action`.
    pub fn is(&self, action: AuditAction) -> bool {
        self.action == action.as_str()
    }
}

/// Listing projection of one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    /// Folder name; always a valid content hash.
    pub content_hash: String,
    pub document_id: String,
    pub original_filename: String,
    pub page_count: u32,
    pub created_at: NaiveDateTime,
    pub last_modified: NaiveDateTime,
}

impl DocumentInfo {
    /// Projects a persisted mind map found under folder `content_hash`.
    pub fn from_persisted(content_hash: impl Into<String>, mind_map: &PersistedMindMap) -> Self {
        Self {
            content_hash: content_hash.into(),
            document_id: mind_map.document_id.clone(),
            original_filename: mind_map.original_filename.clone(),
            page_count: mind_map.page_count,
            created_at: mind_map.created_at,
            last_modified: mind_map.last_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{utc_now, AuditAction, AuditEntry, PersistedMindMap, PersistedNode};
    use crate::model::node::MindMapNode;
    use chrono::Timelike;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn utc_now_has_at_most_six_fractional_digits() {
        let now = utc_now();
        assert_eq!(now.nanosecond() % 1_000, 0);

        let text = serde_json::to_value(now).unwrap();
        if let Some((_, fraction)) = text.as_str().unwrap().split_once('.') {
            assert!(fraction.len() <= 6, "fraction {fraction} is too long");
        }
    }

    #[test]
    fn persisted_node_uses_plain_string_ids() {
        let document_id = Uuid::new_v4();
        let root = MindMapNode::new(document_id, None, 0, "Doc", "overview");
        let mut child = MindMapNode::new(document_id, Some(root.id), 1, "Intro", "s");
        child.page_start = Some(2);

        let value = serde_json::to_value(PersistedNode::from(&child)).unwrap();
        assert_eq!(value["id"], child.id.to_string());
        assert_eq!(value["parent_id"], root.id.to_string());
        assert_eq!(value["node_type"], "section");
        assert_eq!(value["page_start"], 2);
        assert_eq!(value["page_end"], serde_json::Value::Null);
    }

    #[test]
    fn persisted_mind_map_accepts_minimal_node_records() {
        let value = json!({
            "document_id": "7a1c7a38-5d55-4c1e-9c0a-3b8f6f4e2d10",
            "content_hash": "a1b2c3d4e5f67890",
            "original_filename": "paper.pdf",
            "page_count": 3,
            "root_node_id": "0b6c4a9e-1a51-4d0c-8b5e-1f2e3d4c5b6a",
            "nodes": [{
                "id": "0b6c4a9e-1a51-4d0c-8b5e-1f2e3d4c5b6a",
                "document_id": "7a1c7a38-5d55-4c1e-9c0a-3b8f6f4e2d10",
                "title": "Paper",
                "summary": "",
                "node_type": "root",
                "depth": 0
            }],
            "created_at": "2025-01-02T03:04:05.123456",
            "last_modified": "2025-01-02T03:04:05.123456"
        });

        let mind_map: PersistedMindMap = serde_json::from_value(value).unwrap();
        assert_eq!(mind_map.version, "1.0");
        let root = mind_map.node(&mind_map.root_node_id).unwrap();
        assert!(root.children_ids.is_empty());
        assert!(!root.has_children);
        assert_eq!(root.position_x, 0.0);
    }

    #[test]
    fn audit_entry_serializes_expected_keys() {
        let mut details = serde_json::Map::new();
        details.insert("node_count".to_string(), json!(4));
        let entry = AuditEntry::now(AuditAction::MindmapSaved, details);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["action"], "mindmap_saved");
        assert_eq!(value["details"]["node_count"], 4);
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
        assert!(entry.is(AuditAction::MindmapSaved));
    }
}
