use mindmap_core::{DocumentStore, MindMapNode, SaveRequest, StoreError};
use std::fs;
use std::path::Path;
use uuid::Uuid;

const HOSTILE: &[&str] = &[
    "../../../etc/passwd",
    "a1b2c3d4/../../../etc",
    "A1B2C3D4E5F67890",
    "a1b2c3d4",
    "a1b2c3d4e5f6789\0",
    "a1b2c3d4e5f67890/",
    "..",
    "",
    "a1b2c3d4e5f6789%2e",
    "g1b2c3d4e5f67890",
    "a1b2c3d4e5f678901",
];

fn entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn assert_rejected<T: std::fmt::Debug>(result: Result<T, StoreError>, value: &str) {
    match result {
        Err(StoreError::InvalidContentHash(rejected)) => assert_eq!(rejected, value),
        other => panic!("expected InvalidContentHash for {value:?}, got {other:?}"),
    }
}

#[test]
fn every_hash_taking_operation_rejects_malformed_input() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("documents");
    let store = DocumentStore::open(&root).unwrap();
    let source = dir.path().join("upload.pdf");
    fs::write(&source, b"%PDF").unwrap();
    let before = entries(&root);

    let document_id = Uuid::new_v4();
    let root_node = MindMapNode::new(document_id, None, 0, "Doc", "");
    let nodes = vec![root_node.clone()];

    for value in HOSTILE {
        assert_rejected(store.document_folder(value), value);
        assert_rejected(store.exists(value), value);
        assert_rejected(store.create_folder(value, &source), value);
        assert_rejected(store.original_path(value), value);
        assert_rejected(
            store.save(SaveRequest {
                content_hash: value,
                document_id,
                original_filename: "upload.pdf",
                page_count: 1,
                root_node_id: root_node.id,
                nodes: &nodes,
            }),
            value,
        );
        assert_rejected(store.load(value), value);
        assert_rejected(store.update(value, &nodes), value);
        assert_rejected(store.audit_log(value), value);
        assert_rejected(store.delete(value), value);
    }

    assert_eq!(entries(&root), before);
    assert!(!dir.path().join("etc").exists());
}

#[test]
fn rejection_message_escapes_control_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(dir.path()).unwrap();
    let err = store.exists("a1b2c3d4e5f6789\0").unwrap_err();
    let message = err.to_string();
    assert!(!message.contains('\0'));
    assert!(message.contains("\\0"));
}
