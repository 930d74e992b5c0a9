//! Content-addressed document folders on the local filesystem.
//!
//! # Responsibility
//! - Own the `<root>/<content_hash>/` layout: original file, mind map, journal.
//! - Persist, load, patch, list and delete mind maps by content hash.
//!
//! # Invariants
//! - Every public entry point validates the content hash before building a path.
//! - `mindmap.json` is replaced atomically (temp file, fsync, rename).
//! - The stored original is never overwritten once present, and is published
//!   only after a complete synced copy.
//! - Read paths report absence as `None`/empty; corrupt files are logged and skipped.

use crate::model::node::{DocumentId, MindMapNode, NodeId};
use crate::model::persisted::{
    utc_now, AuditAction, AuditEntry, DocumentInfo, PersistedMindMap, PersistedNode,
    MINDMAP_FORMAT_VERSION,
};
use crate::storage::audit::{self, details};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::fingerprint::ContentHash;
use chrono::NaiveDateTime;
use log::{debug, error, info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Mind map file name inside a document folder.
pub const MINDMAP_FILENAME: &str = "mindmap.json";
/// Stored original upload inside a document folder.
pub const ORIGINAL_FILENAME: &str = "original.pdf";
const ROOT_MARKER_FILENAME: &str = ".gitkeep";
/// Folder names starting with this marker are never listed.
const RESERVED_PREFIX: char = '.';

/// Input for `DocumentStore::save`.
#[derive(Debug, Clone, Copy)]
pub struct SaveRequest<'a> {
    pub content_hash: &'a str,
    pub document_id: DocumentId,
    pub original_filename: &'a str,
    pub page_count: u32,
    pub root_node_id: NodeId,
    /// Written in the given order.
    pub nodes: &'a [MindMapNode],
}

/// Filesystem-backed store rooted at one documents directory.
///
/// Holds no mutable state; share it behind `Arc` across threads.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Opens (and creates if needed) the documents root.
    ///
    /// # Errors
    /// - `StoreError::Io` when the root cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| StoreError::io(&root, err))?;

        let marker = root.join(ROOT_MARKER_FILENAME);
        if !marker.exists() {
            File::create(&marker).map_err(|err| StoreError::io(&marker, err))?;
        }

        info!(
            "event=store_open module=storage status=ok root={}",
            root.display()
        );
        Ok(Self { root })
    }

    /// Documents root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the folder for `content_hash` after validating it.
    ///
    /// # Errors
    /// - `StoreError::InvalidContentHash` for any malformed hash.
    pub fn document_folder(&self, content_hash: &str) -> StoreResult<PathBuf> {
        let hash = ContentHash::parse(content_hash)?;
        Ok(self.root.join(hash))
    }

    /// Returns whether a persisted mind map exists for `content_hash`.
    ///
    /// A folder without `mindmap.json` does not count.
    pub fn exists(&self, content_hash: &str) -> StoreResult<bool> {
        let folder = self.document_folder(content_hash)?;
        Ok(folder.is_dir() && folder.join(MINDMAP_FILENAME).is_file())
    }

    /// Creates the document folder and copies `source` in as the original.
    ///
    /// Idempotent: an existing folder is reused and an existing original is
    /// kept untouched.
    ///
    /// # Errors
    /// - `StoreError::Io` when the folder cannot be created or the copy fails.
    pub fn create_folder(&self, content_hash: &str, source: &Path) -> StoreResult<PathBuf> {
        let folder = self.document_folder(content_hash)?;
        fs::create_dir_all(&folder).map_err(|err| StoreError::io(&folder, err))?;

        let dest = folder.join(ORIGINAL_FILENAME);
        if copy_if_absent(source, &dest)? {
            info!(
                "event=original_copy module=storage status=ok content_hash={} dest={}",
                content_hash,
                dest.display()
            );
        } else {
            debug!(
                "event=original_copy module=storage status=skip content_hash={} reason=exists",
                content_hash
            );
        }

        audit::append(
            &folder,
            AuditAction::DocumentCreated,
            details([("source_path", json!(source.display().to_string()))]),
        );
        Ok(folder)
    }

    /// Path of the stored original, if one exists.
    pub fn original_path(&self, content_hash: &str) -> StoreResult<Option<PathBuf>> {
        let path = self.document_folder(content_hash)?.join(ORIGINAL_FILENAME);
        Ok(path.is_file().then_some(path))
    }

    /// Writes the mind map for `request.content_hash`, replacing any prior one.
    ///
    /// First save stamps both timestamps with now; a re-save keeps the prior
    /// `created_at` when the old file is readable.
    ///
    /// # Errors
    /// - `StoreError::DocumentMismatch` when a node belongs to another document.
    /// - `StoreError::RootNotFound` when the root id is not among the nodes.
    /// - `StoreError::Io` / `StoreError::Serialize` on write failure.
    pub fn save(&self, request: SaveRequest<'_>) -> StoreResult<()> {
        let folder = self.document_folder(request.content_hash)?;
        let document_id = request.document_id.to_string();
        let root_node_id = request.root_node_id.to_string();

        if let Some(foreign) = request
            .nodes
            .iter()
            .find(|node| node.document_id != request.document_id)
        {
            return Err(StoreError::DocumentMismatch {
                expected: document_id,
                actual: foreign.document_id.to_string(),
            });
        }
        if !request
            .nodes
            .iter()
            .any(|node| node.id == request.root_node_id)
        {
            return Err(StoreError::RootNotFound(root_node_id));
        }

        fs::create_dir_all(&folder).map_err(|err| StoreError::io(&folder, err))?;
        let path = folder.join(MINDMAP_FILENAME);

        let (created_at, last_modified) = match read_mind_map(&path) {
            Some(previous) => (
                previous.created_at,
                next_timestamp(previous.last_modified),
            ),
            None => {
                let now = utc_now();
                (now, now)
            }
        };

        let mind_map = PersistedMindMap {
            version: MINDMAP_FORMAT_VERSION.to_string(),
            document_id: document_id.clone(),
            content_hash: request.content_hash.to_string(),
            original_filename: request.original_filename.to_string(),
            page_count: request.page_count,
            root_node_id: root_node_id.clone(),
            nodes: request.nodes.iter().map(PersistedNode::from).collect(),
            created_at,
            last_modified,
        };
        write_mind_map(&path, &mind_map)?;

        info!(
            "event=mindmap_save module=storage status=ok content_hash={} node_count={}",
            request.content_hash,
            request.nodes.len()
        );
        audit::append(
            &folder,
            AuditAction::MindmapSaved,
            details([
                ("document_id", json!(document_id)),
                ("node_count", json!(request.nodes.len())),
                ("root_node_id", json!(root_node_id)),
            ]),
        );
        Ok(())
    }

    /// Loads the mind map for `content_hash`.
    ///
    /// Missing or unparseable files yield `Ok(None)`; only a malformed hash
    /// is an error.
    pub fn load(&self, content_hash: &str) -> StoreResult<Option<PersistedMindMap>> {
        let folder = self.document_folder(content_hash)?;
        let path = folder.join(MINDMAP_FILENAME);

        let Some(mind_map) = read_mind_map(&path) else {
            return Ok(None);
        };

        info!(
            "event=mindmap_load module=storage status=ok content_hash={} node_count={}",
            content_hash,
            mind_map.nodes.len()
        );
        audit::append(
            &folder,
            AuditAction::MindmapLoaded,
            details([
                ("document_id", json!(mind_map.document_id)),
                ("node_count", json!(mind_map.nodes.len())),
            ]),
        );
        Ok(Some(mind_map))
    }

    /// Replaces stored nodes by id, appending ids not yet stored.
    ///
    /// Unmatched stored nodes are kept. Structural invariants of the merged
    /// tree are the caller's responsibility.
    ///
    /// Returns `Ok(false)` when no mind map is stored yet.
    ///
    /// # Errors
    /// - `StoreError::DocumentMismatch` when a node belongs to another document.
    /// - `StoreError::Io` / `StoreError::Serialize` on write failure.
    pub fn update(&self, content_hash: &str, updated_nodes: &[MindMapNode]) -> StoreResult<bool> {
        let folder = self.document_folder(content_hash)?;
        let path = folder.join(MINDMAP_FILENAME);

        let Some(mut mind_map) = read_mind_map(&path) else {
            debug!(
                "event=mindmap_update module=storage status=skip content_hash={} reason=missing",
                content_hash
            );
            return Ok(false);
        };

        for node in updated_nodes {
            let owner = node.document_id.to_string();
            if owner != mind_map.document_id {
                return Err(StoreError::DocumentMismatch {
                    expected: mind_map.document_id,
                    actual: owner,
                });
            }
        }

        let mut positions: HashMap<String, usize> = mind_map
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        for node in updated_nodes {
            let persisted = PersistedNode::from(node);
            match positions.get(&persisted.id) {
                Some(&index) => mind_map.nodes[index] = persisted,
                None => {
                    positions.insert(persisted.id.clone(), mind_map.nodes.len());
                    mind_map.nodes.push(persisted);
                }
            }
        }
        mind_map.last_modified = next_timestamp(mind_map.last_modified);
        write_mind_map(&path, &mind_map)?;

        info!(
            "event=mindmap_update module=storage status=ok content_hash={} updated_node_count={}",
            content_hash,
            updated_nodes.len()
        );
        audit::append(
            &folder,
            AuditAction::MindmapUpdated,
            details([("updated_node_count", json!(updated_nodes.len()))]),
        );
        Ok(true)
    }

    /// Lists stored documents, newest `last_modified` first.
    ///
    /// Folders without a mind map, reserved names and unreadable files are
    /// skipped.
    ///
    /// # Errors
    /// - `StoreError::Io` when the documents root cannot be read.
    pub fn list(&self) -> StoreResult<Vec<DocumentInfo>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.root, err)),
        };

        let mut documents = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        "event=document_list module=storage status=skip error={}",
                        err
                    );
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with(RESERVED_PREFIX) || !entry.path().is_dir() {
                continue;
            }
            if ContentHash::parse(&name).is_err() {
                debug!(
                    "event=document_list module=storage status=skip folder={} reason=not_a_content_hash",
                    name
                );
                continue;
            }

            let path = entry.path().join(MINDMAP_FILENAME);
            if !path.is_file() {
                continue;
            }
            match read_mind_map(&path) {
                Some(mind_map) => documents.push(DocumentInfo::from_persisted(name, &mind_map)),
                None => warn!(
                    "event=document_list module=storage status=skip folder={} reason=unreadable_mindmap",
                    name
                ),
            }
        }

        documents.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(documents)
    }

    /// Reads the audit journal for `content_hash`, newest first.
    pub fn audit_log(&self, content_hash: &str) -> StoreResult<Vec<AuditEntry>> {
        let folder = self.document_folder(content_hash)?;
        Ok(audit::read_newest_first(&folder))
    }

    /// Removes the document folder and everything in it.
    ///
    /// Returns `Ok(false)` when the folder does not exist or removal fails.
    pub fn delete(&self, content_hash: &str) -> StoreResult<bool> {
        let folder = self.document_folder(content_hash)?;
        if !folder.is_dir() {
            return Ok(false);
        }

        match fs::remove_dir_all(&folder) {
            Ok(()) => {
                info!(
                    "event=document_delete module=storage status=ok content_hash={}",
                    content_hash
                );
                Ok(true)
            }
            Err(err) => {
                error!(
                    "event=document_delete module=storage status=error content_hash={} error={}",
                    content_hash, err
                );
                Ok(false)
            }
        }
    }
}

/// Reads and parses one `mindmap.json`, logging and absorbing failures.
fn read_mind_map(path: &Path) -> Option<PersistedMindMap> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(
                "event=mindmap_read module=storage status=skip path={} reason=missing",
                path.display()
            );
            return None;
        }
        Err(err) => {
            error!(
                "event=mindmap_read module=storage status=error path={} error={}",
                path.display(),
                err
            );
            return None;
        }
    };

    match serde_json::from_slice::<PersistedMindMap>(&raw) {
        Ok(mind_map) => Some(mind_map),
        Err(err) => {
            error!(
                "event=mindmap_read module=storage status=error path={} error_code=parse_failed error={}",
                path.display(),
                err
            );
            None
        }
    }
}

fn write_mind_map(path: &Path, mind_map: &PersistedMindMap) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(mind_map)?;
    write_atomic(path, &bytes)
}

/// Temp path next to `path`, so publishing it never crosses filesystems.
fn temp_sibling(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(MINDMAP_FILENAME);
    parent.join(format!(".{file_name}.tmp-{}", std::process::id()))
}

/// Writes `bytes` to a sibling temp file, syncs it, then renames over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = temp_sibling(path);
    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(&tmp, err));
    }

    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(path, err));
    }
    Ok(())
}

/// Copies `source` to `dest` unless `dest` already exists.
///
/// The copy lands in a synced temp file first and is published with a hard
/// link, so `dest` is either absent or complete. Returns whether a copy
/// happened. `source` is not opened when `dest` is already present.
fn copy_if_absent(source: &Path, dest: &Path) -> StoreResult<bool> {
    if dest.exists() {
        return Ok(false);
    }

    let mut reader = File::open(source).map_err(|err| StoreError::io(source, err))?;
    let tmp = temp_sibling(dest);
    let copied = File::create(&tmp).and_then(|mut writer| {
        io::copy(&mut reader, &mut writer)?;
        writer.sync_all()
    });
    if let Err(err) = copied {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(&tmp, err));
    }

    let published = fs::hard_link(&tmp, dest);
    let _ = fs::remove_file(&tmp);
    match published {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(StoreError::io(dest, err)),
    }
}

/// Current time, bumped past `previous` so modification stamps strictly increase.
fn next_timestamp(previous: NaiveDateTime) -> NaiveDateTime {
    let now = utc_now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::{copy_if_absent, next_timestamp, temp_sibling, write_atomic};
    use crate::model::persisted::utc_now;
    use std::fs;

    #[test]
    fn next_timestamp_moves_past_future_previous() {
        let future = utc_now() + chrono::Duration::seconds(60);
        assert!(next_timestamp(future) > future);
    }

    #[test]
    fn write_atomic_replaces_content_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mindmap.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn copy_if_absent_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.pdf");
        let dest = dir.path().join("original.pdf");
        fs::write(&source, b"v1").unwrap();

        assert!(copy_if_absent(&source, &dest).unwrap());
        fs::write(&source, b"v2").unwrap();
        assert!(!copy_if_absent(&source, &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"v1");
    }

    #[test]
    fn copy_if_absent_ignores_stale_partial_temp() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.pdf");
        let dest = dir.path().join("original.pdf");
        fs::write(&source, b"complete original").unwrap();
        fs::write(temp_sibling(&dest), b"compl").unwrap();

        assert!(copy_if_absent(&source, &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"complete original");
        assert!(!temp_sibling(&dest).exists());
    }

    #[test]
    fn copy_if_absent_does_not_open_source_when_dest_exists() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("original.pdf");
        fs::write(&dest, b"stored").unwrap();

        let copied = copy_if_absent(&dir.path().join("gone.pdf"), &dest).unwrap();
        assert!(!copied);
        assert_eq!(fs::read(&dest).unwrap(), b"stored");
    }
}
