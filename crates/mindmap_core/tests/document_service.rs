use mindmap_core::{
    Answer, CollaboratorError, DocumentService, DocumentStore, ExtractedText, IngestOutcome,
    NodeStore, OutlineEntry, OutlineStructurer, ProcessingStatus, QuestionAnswerer, ServiceError,
    StoreConfig, TextExtractor,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

struct FakeExtractor {
    page_count: u32,
    calls: Rc<Cell<usize>>,
}

impl TextExtractor for FakeExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText, CollaboratorError> {
        self.calls.set(self.calls.get() + 1);
        let text = fs::read_to_string(path)
            .map_err(|err| CollaboratorError::InvalidInput(err.to_string()))?;
        Ok(ExtractedText {
            text,
            page_count: self.page_count,
        })
    }
}

struct FakeStructurer {
    fail: bool,
    calls: Rc<Cell<usize>>,
}

impl OutlineStructurer for FakeStructurer {
    fn structure(&self, text: &str) -> Result<OutlineEntry, CollaboratorError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(CollaboratorError::Failed("model unavailable".to_string()));
        }
        let mut detail = OutlineEntry::new("Details", "fine print");
        detail.full_content = Some(text.to_string());
        Ok(OutlineEntry::new("Document", "overview").with_children(vec![
            OutlineEntry::new("First", "one").with_children(vec![detail]),
            OutlineEntry::new("Second", "two"),
        ]))
    }
}

struct RecordingAnswerer {
    context: RefCell<String>,
}

impl QuestionAnswerer for RecordingAnswerer {
    fn answer(&self, question: &str, context: &str) -> Result<Answer, CollaboratorError> {
        *self.context.borrow_mut() = context.to_string();
        Ok(Answer::new(format!("re: {question}"), 1.5))
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    service: DocumentService<FakeExtractor, FakeStructurer>,
    collaborator_calls: Rc<Cell<usize>>,
}

fn setup_with(page_count: u32, fail: bool, config: StoreConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(DocumentStore::open(dir.path().join("documents")).unwrap());
    let collaborator_calls = Rc::new(Cell::new(0));
    let service = DocumentService::new(
        store,
        Arc::new(NodeStore::new()),
        FakeExtractor {
            page_count,
            calls: Rc::clone(&collaborator_calls),
        },
        FakeStructurer {
            fail,
            calls: Rc::clone(&collaborator_calls),
        },
        config,
    );
    Fixture {
        dir,
        service,
        collaborator_calls,
    }
}

fn setup() -> Fixture {
    let config = StoreConfig {
        debug: true,
        ..StoreConfig::default()
    };
    setup_with(4, false, config)
}

fn upload(fixture: &Fixture, name: &str, body: &str) -> PathBuf {
    let path = fixture.dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn first_ingest_generates_and_persists() {
    let fixture = setup();
    let source = upload(&fixture, "paper.pdf", "body text");

    let outcome = fixture.service.ingest(&source, "paper.pdf").unwrap();
    let IngestOutcome::Generated(loaded) = outcome else {
        panic!("first ingest must generate");
    };
    assert_eq!(loaded.node_count, 4);
    assert!(fixture.service.store().exists(&loaded.content_hash).unwrap());

    let record = fixture.service.record(&loaded.content_hash).unwrap();
    assert_eq!(record.id, loaded.document_id);
    assert_eq!(record.status, ProcessingStatus::Completed);
    assert_eq!(record.page_count, 4);
    assert_eq!(record.original_filename, "paper.pdf");

    let persisted = fixture
        .service
        .store()
        .load(&loaded.content_hash)
        .unwrap()
        .unwrap();
    assert_eq!(persisted.root_node_id, loaded.root_id.to_string());
    assert_eq!(persisted.nodes[0].id, loaded.root_id.to_string());
    assert_eq!(persisted.nodes.len(), 4);
}

#[test]
fn second_ingest_of_same_bytes_restores_without_collaborators() {
    let fixture = setup();
    let first = upload(&fixture, "paper.pdf", "same bytes");
    let generated = fixture.service.ingest(&first, "paper.pdf").unwrap();
    assert_eq!(fixture.collaborator_calls.get(), 2);

    let second = upload(&fixture, "copy.pdf", "same bytes");
    let restored = fixture.service.ingest(&second, "copy.pdf").unwrap();

    assert!(matches!(restored, IngestOutcome::Restored(_)));
    assert_eq!(fixture.collaborator_calls.get(), 2);
    assert_eq!(restored.document(), generated.document());
    assert_eq!(fixture.service.nodes().node_count(), 4);

    let record = fixture
        .service
        .record(&generated.document().content_hash)
        .unwrap();
    assert_eq!(record.original_filename, "paper.pdf");
}

#[test]
fn page_limit_marks_record_failed() {
    let config = StoreConfig {
        max_document_pages: 3,
        ..StoreConfig::default()
    };
    let fixture = setup_with(10, false, config);
    let source = upload(&fixture, "huge.pdf", "many pages");

    let err = fixture.service.ingest(&source, "huge.pdf").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::TooManyPages {
            page_count: 10,
            max: 3
        }
    ));

    let listed = fixture.service.list().unwrap();
    assert!(listed.is_empty());
    let hash = mindmap_core::compute_file_hash(&source).unwrap();
    let record = fixture.service.record(hash.as_str()).unwrap();
    assert_eq!(record.status, ProcessingStatus::Failed);
    assert!(record.error_message.unwrap().contains("limit is 3"));
    assert_eq!(fixture.service.nodes().node_count(), 0);
}

#[test]
fn structurer_failure_is_propagated_and_recorded() {
    let fixture = setup_with(1, true, StoreConfig::default());
    let source = upload(&fixture, "paper.pdf", "text");

    let err = fixture.service.ingest(&source, "paper.pdf").unwrap_err();
    assert!(matches!(err, ServiceError::Collaborator(CollaboratorError::Failed(_))));

    let hash = mindmap_core::compute_file_hash(&source).unwrap();
    let record = fixture.service.record(hash.as_str()).unwrap();
    assert_eq!(record.status, ProcessingStatus::Failed);
    // The original stays stored for a retry.
    assert!(fixture.service.store().original_path(hash.as_str()).unwrap().is_some());
}

#[test]
fn load_restores_into_a_fresh_service() {
    let fixture = setup();
    let source = upload(&fixture, "paper.pdf", "persist me");
    let generated = fixture.service.ingest(&source, "paper.pdf").unwrap();
    let hash = generated.document().content_hash.clone();

    let fresh = DocumentService::new(
        Arc::clone(fixture.service.store()),
        Arc::new(NodeStore::new()),
        FakeExtractor {
            page_count: 1,
            calls: Rc::new(Cell::new(0)),
        },
        FakeStructurer {
            fail: false,
            calls: Rc::new(Cell::new(0)),
        },
        StoreConfig::default(),
    );
    let loaded = fresh.load(&hash).unwrap();
    assert_eq!(loaded.root_id, generated.document().root_id);

    let nodes = fresh.mind_map(loaded.document_id, 1).unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].id, loaded.root_id);

    assert!(matches!(
        fresh.load("0000000000000000"),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        fresh.load("../etc/passwd"),
        Err(ServiceError::Store(mindmap_core::StoreError::InvalidContentHash(_)))
    ));
}

#[test]
fn expand_and_ask_use_node_context() {
    let fixture = setup();
    let source = upload(&fixture, "paper.pdf", "the full body");
    let loaded = fixture
        .service
        .ingest(&source, "paper.pdf")
        .unwrap()
        .document()
        .clone();

    let root = fixture.service.expand(loaded.root_id, false).unwrap();
    assert_eq!(root.children.len(), 2);
    let first_id = root.children[0].id;
    let first = fixture.service.expand(first_id, true).unwrap();
    assert_eq!(first.children[0].full_content, None);

    let answerer = RecordingAnswerer {
        context: RefCell::new(String::new()),
    };
    let response = fixture
        .service
        .ask(loaded.document_id, "what?", Some(first_id), &answerer)
        .unwrap();
    assert_eq!(response.answer.answer, "re: what?");
    assert_eq!(response.answer.confidence, 1.0);
    assert_eq!(response.source_nodes.len(), 2);
    assert_eq!(
        *answerer.context.borrow(),
        "## First\none\n\n## Details\nthe full body"
    );

    let whole = fixture
        .service
        .ask(loaded.document_id, "all?", None, &answerer)
        .unwrap();
    assert_eq!(whole.source_nodes.len(), 4);
    assert_eq!(whole.source_nodes[0], loaded.root_id);

    assert!(matches!(
        fixture.service.expand(uuid::Uuid::new_v4(), true),
        Err(ServiceError::NodeNotFound(_))
    ));
    assert!(matches!(
        fixture
            .service
            .ask(uuid::Uuid::new_v4(), "q", None, &answerer),
        Err(ServiceError::DocumentNotLoaded(_))
    ));
}

#[test]
fn delete_clears_memory_and_disk() {
    let fixture = setup();
    let source = upload(&fixture, "paper.pdf", "to delete");
    let loaded = fixture
        .service
        .ingest(&source, "paper.pdf")
        .unwrap()
        .document()
        .clone();

    fixture.service.delete(&loaded.content_hash).unwrap();
    assert_eq!(fixture.service.nodes().node_count(), 0);
    assert_eq!(fixture.service.record(&loaded.content_hash), None);
    assert!(!fixture.service.store().exists(&loaded.content_hash).unwrap());
    assert!(matches!(
        fixture.service.delete(&loaded.content_hash),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn audit_log_requires_debug_mode() {
    let fixture = setup();
    let source = upload(&fixture, "paper.pdf", "audited");
    let hash = fixture
        .service
        .ingest(&source, "paper.pdf")
        .unwrap()
        .document()
        .content_hash
        .clone();

    let entries = fixture.service.audit_log(&hash).unwrap();
    assert_eq!(entries[0].action, "mindmap_saved");
    assert_eq!(entries.last().unwrap().action, "document_created");

    let quiet = setup_with(1, false, StoreConfig::default());
    assert!(matches!(
        quiet.service.audit_log(&hash),
        Err(ServiceError::AuditDisabled)
    ));
}
