//! End-to-end tests for automatic packet generation
//!
//! A library directory and JSON registry live in a temporary directory;
//! successive runs must resume where the previous one stopped.

mod common;

use common::{chapter, page_markers, section, three_chapter_book, PdfFixture};
use lopdf::Document;
use pdf_packet::{
    DocumentOutcome, DocumentRecord, Error, JsonRegistry, Library, PacketConfig, PacketGenerator,
    PacketReport, Registry,
};
use std::path::Path;

struct Workspace {
    dir: tempfile::TempDir,
    config: PacketConfig,
}

impl Workspace {
    fn new(soft: usize, hard: usize) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = PacketConfig::new()
            .with_library_dir(dir.path().join("library"))
            .with_registry_path(dir.path().join("library.json"))
            .with_output_dir(dir.path().join("out"))
            .with_limits(soft, hard);
        Library::open(&config.library_dir).expect("Failed to create library");
        Self { dir, config }
    }

    fn add(&self, title: &str, fixture: &PdfFixture) {
        fixture.write(self.config.library_dir.join(title));
        self.registry().register(title, None).expect("register");
    }

    fn registry(&self) -> JsonRegistry {
        JsonRegistry::open(&self.config.registry_path).expect("Failed to open registry")
    }

    fn generate(&self) -> PacketReport {
        let mut registry = self.registry();
        PacketGenerator::new(self.config.clone())
            .expect("valid config")
            .generate(&mut registry, None)
            .expect("generate")
    }

    fn checkpoint(&self, title: &str) -> Option<String> {
        self.registry().find_by_title(title).and_then(|r| r.checkpoint.clone())
    }

    fn is_active(&self, title: &str) -> bool {
        self.registry().find_by_title(title).map_or(false, |r| r.active)
    }
}

fn markers(path: &Path) -> Vec<usize> {
    page_markers(&Document::load(path).expect("Failed to reload packet"))
}

#[test]
fn test_successive_runs_read_book_to_the_end() {
    let ws = Workspace::new(20, 25);
    ws.add("book.pdf", &three_chapter_book());

    // Chapters 1 and 2 reach the soft limit
    let first = ws.generate();
    let output = first.output.as_deref().expect("first packet");
    assert_eq!(markers(output), (0..25).collect::<Vec<_>>());
    assert_eq!(first.pages(), 25);
    assert_eq!(
        first.documents[0].outcome,
        DocumentOutcome::Resumable("Chapter 2".to_string())
    );
    assert_eq!(ws.checkpoint("book.pdf").as_deref(), Some("Chapter 2"));
    assert!(ws.is_active("book.pdf"));

    // Chapter 3 is the rest of the book
    let second = ws.generate();
    let output = second.output.as_deref().expect("second packet");
    assert_eq!(markers(output), (25..40).collect::<Vec<_>>());
    assert_eq!(second.documents[0].outcome, DocumentOutcome::Exhausted);
    assert!(!ws.is_active("book.pdf"));

    // Nothing left
    let third = ws.generate();
    assert!(third.output.is_none());
    assert!(third.documents.is_empty());
}

#[test]
fn test_oversized_chapter_is_replaced_by_sub_chapter() {
    let ws = Workspace::new(5, 25);
    ws.add(
        "big.pdf",
        &PdfFixture::new(50).bookmarks(vec![section(
            "Part",
            0,
            vec![chapter("Part.1", 0), chapter("Part.2", 5)],
        )]),
    );

    let report = ws.generate();
    assert_eq!(markers(report.output.as_deref().expect("packet")), vec![0, 1, 2, 3, 4]);
    assert_eq!(ws.checkpoint("big.pdf").as_deref(), Some("Part.1"));
}

#[test]
fn test_documents_are_concatenated_in_title_order() {
    let ws = Workspace::new(5, 12);
    ws.add(
        "b.pdf",
        &PdfFixture::new(10).bookmarks(vec![chapter("B1", 0), chapter("B2", 6)]),
    );
    ws.add(
        "a.pdf",
        &PdfFixture::new(8).bookmarks(vec![chapter("A1", 0), chapter("A2", 3), chapter("A3", 7)]),
    );

    let report = ws.generate();
    let titles: Vec<_> = report.documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["a.pdf", "b.pdf"]);

    // a.pdf: A1 (3) + A2 (4) = 7; b.pdf: B1 (6)
    assert_eq!(report.documents[0].pages, 7);
    assert_eq!(report.documents[1].pages, 6);
    assert_eq!(
        markers(report.output.as_deref().expect("packet")),
        vec![0, 1, 2, 3, 4, 5, 6, 0, 1, 2, 3, 4, 5]
    );
}

#[test]
fn test_document_without_bookmarks_is_skipped() {
    let ws = Workspace::new(20, 25);
    ws.add("plain.pdf", &PdfFixture::new(12));
    ws.add("book.pdf", &three_chapter_book());

    let report = ws.generate();
    let plain = report
        .documents
        .iter()
        .find(|d| d.title == "plain.pdf")
        .expect("plain.pdf reported");
    assert_eq!(plain.outcome, DocumentOutcome::NoBookmarks);
    assert_eq!(plain.pages, 0);
    assert!(ws.is_active("plain.pdf"));
    assert_eq!(ws.checkpoint("plain.pdf"), None);
    assert_eq!(report.pages(), 25);
}

#[test]
fn test_unreadable_document_is_skipped() {
    let ws = Workspace::new(20, 25);
    std::fs::write(ws.config.library_dir.join("broken.pdf"), b"not a pdf").unwrap();
    ws.registry().register("broken.pdf", None).unwrap();
    ws.add("book.pdf", &three_chapter_book());

    let report = ws.generate();
    let broken = report
        .documents
        .iter()
        .find(|d| d.title == "broken.pdf")
        .expect("broken.pdf reported");
    assert!(matches!(broken.outcome, DocumentOutcome::Unreadable(_)));
    assert!(ws.is_active("broken.pdf"));
    assert!(report.output.is_some());
}

#[test]
fn test_failed_save_leaves_registry_untouched() {
    let mut ws = Workspace::new(20, 25);
    ws.add("book.pdf", &three_chapter_book());

    // The output directory path is taken by a regular file
    let blocked = ws.dir.path().join("blocked");
    std::fs::write(&blocked, b"").unwrap();
    ws.config = ws.config.clone().with_output_dir(&blocked);

    let mut registry = ws.registry();
    let result = PacketGenerator::new(ws.config.clone())
        .expect("valid config")
        .generate(&mut registry, None);
    assert!(result.is_err());
    assert_eq!(ws.checkpoint("book.pdf"), None);
    assert!(ws.is_active("book.pdf"));
}

/// A registry whose writes fail for one document.
struct FailingRegistry {
    inner: JsonRegistry,
    failing_id: u64,
}

impl FailingRegistry {
    fn check(&self, id: u64) -> pdf_packet::Result<()> {
        if id == self.failing_id {
            return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        Ok(())
    }
}

impl Registry for FailingRegistry {
    fn list_active(&self, topic: Option<&str>) -> pdf_packet::Result<Vec<DocumentRecord>> {
        self.inner.list_active(topic)
    }

    fn list_all(&self) -> pdf_packet::Result<Vec<DocumentRecord>> {
        self.inner.list_all()
    }

    fn get_checkpoint(&self, id: u64) -> pdf_packet::Result<Option<String>> {
        self.inner.get_checkpoint(id)
    }

    fn set_checkpoint(&mut self, id: u64, chapter_name: &str) -> pdf_packet::Result<()> {
        self.check(id)?;
        self.inner.set_checkpoint(id, chapter_name)
    }

    fn deactivate(&mut self, id: u64) -> pdf_packet::Result<()> {
        self.check(id)?;
        self.inner.deactivate(id)
    }
}

#[test]
fn test_failed_registry_update_names_unrecorded_documents() {
    let ws = Workspace::new(20, 25);
    ws.add("a.pdf", &three_chapter_book());
    ws.add("b.pdf", &three_chapter_book());
    ws.add("c.pdf", &PdfFixture::new(6).bookmarks(vec![chapter("C1", 0), chapter("C2", 2)]));

    let failing_id = ws.registry().find_by_title("b.pdf").expect("b.pdf registered").id;
    let mut registry = FailingRegistry {
        inner: ws.registry(),
        failing_id,
    };
    let err = PacketGenerator::new(ws.config.clone())
        .expect("valid config")
        .generate(&mut registry, None)
        .unwrap_err();

    match err {
        Error::RegistryNotUpdated { saved, pending, source } => {
            assert!(saved.exists());
            assert_eq!(pending, vec!["b.pdf", "c.pdf"]);
            assert!(matches!(*source, Error::Io(_)));
        },
        other => panic!("expected RegistryNotUpdated, got {:?}", other),
    }

    // updates before the failure stand, the rest are untouched
    assert_eq!(ws.checkpoint("a.pdf").as_deref(), Some("Chapter 2"));
    assert_eq!(ws.checkpoint("b.pdf"), None);
    assert!(ws.is_active("c.pdf"));
}

#[test]
fn test_unknown_checkpoint_restarts_from_first_chapter() {
    let ws = Workspace::new(20, 25);
    ws.add("book.pdf", &three_chapter_book());
    {
        let mut registry = ws.registry();
        let id = registry.find_by_title("book.pdf").unwrap().id;
        registry.set_checkpoint(id, "Renamed chapter").unwrap();
    }

    let report = ws.generate();
    assert_eq!(markers(report.output.as_deref().expect("packet")), (0..25).collect::<Vec<_>>());
}

#[test]
fn test_topic_filter_limits_documents() {
    let ws = Workspace::new(20, 25);
    three_chapter_book().write(ws.config.library_dir.join("math.pdf"));
    three_chapter_book().write(ws.config.library_dir.join("poems.pdf"));
    {
        let mut registry = ws.registry();
        registry.register("math.pdf", Some("math")).unwrap();
        registry.register("poems.pdf", Some("poetry")).unwrap();
    }

    let mut registry = ws.registry();
    let report = PacketGenerator::new(ws.config.clone())
        .expect("valid config")
        .generate(&mut registry, Some("poetry"))
        .expect("generate");

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].title, "poems.pdf");
    assert_eq!(ws.checkpoint("math.pdf"), None);
    assert_eq!(ws.checkpoint("poems.pdf").as_deref(), Some("Chapter 2"));
}
