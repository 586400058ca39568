//! Integration tests for the page numbering and footer pass.

use lopdf::Document;
use pdfsplice::config::{
    DocumentInfo, MergeInstruction, MergeJob, PaginationFormat, PaginationSpec,
};
use pdfsplice::merge::{BookmarkPolicy, MetadataWriter, do_merge};
use rstest::rstest;
use tempfile::TempDir;

use crate::common::{SourcePdf, entry, page_text, read_outline, uncompressed};

fn merge(job: &MergeJob) -> Document {
    let result = do_merge(job, &uncompressed(), None, &mut BookmarkPolicy::Cancel);
    assert!(result.is_success(), "Merge failed: {}", result.error_message);
    Document::load(&job.output).unwrap()
}

#[test]
fn test_two_sources_numbered_with_section_bookmark() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 3).write(&dir.path().join("a.pdf"));
    let b = SourcePdf::new("B", 2).write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![
            MergeInstruction::new(&a),
            MergeInstruction::new(&b).titled("Section B", 0),
        ],
        dir.path().join("out.pdf"),
    )
    .with_pagination(PaginationSpec::numbered(PaginationFormat::PageXOfY));
    let doc = merge(&job);

    assert_eq!(doc.get_pages().len(), 5);
    let fourth = page_text(&doc, 3);
    assert!(fourth.contains("B page 1"));
    assert!(fourth.contains("(Page 4 of 5) Tj"), "got {fourth}");
    assert_eq!(read_outline(&doc), vec![entry("Section B", 0, 3)]);
}

#[test]
fn test_start_page_drops_total() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 3).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(vec![MergeInstruction::new(&a)], dir.path().join("out.pdf"))
        .with_pagination(PaginationSpec::numbered(PaginationFormat::PageXOfY).starting_at(10));
    let doc = merge(&job);

    for (index, label) in ["Page 10", "Page 11", "Page 12"].iter().enumerate() {
        let text = page_text(&doc, index);
        assert!(text.contains(&format!("({label}) Tj")), "got {text}");
        assert!(!text.contains(" of "));
    }
}

#[rstest]
#[case(PaginationFormat::PageXOfY, "(Page 2 of 2) Tj")]
#[case(PaginationFormat::XOfY, "(2 / 2) Tj")]
#[case(PaginationFormat::PageX, "(Page 2) Tj")]
#[case(PaginationFormat::X, "(2) Tj")]
fn test_formats(#[case] format: PaginationFormat, #[case] expected: &str) {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 2).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(vec![MergeInstruction::new(&a)], dir.path().join("out.pdf"))
        .with_pagination(PaginationSpec::numbered(format));

    assert!(page_text(&merge(&job), 1).contains(expected));
}

#[test]
fn test_footer_without_numbers() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 2).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(vec![MergeInstruction::new(&a)], dir.path().join("out.pdf"))
        .with_pagination(PaginationSpec::footer_only("Internal use"));
    let doc = merge(&job);

    for index in 0..2 {
        let text = page_text(&doc, index);
        assert!(text.contains("(Internal use) Tj"));
        assert!(!text.contains("Page "));
    }
}

#[test]
fn test_overlay_keeps_original_content_isolated() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 1).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(vec![MergeInstruction::new(&a)], dir.path().join("out.pdf"))
        .with_pagination(PaginationSpec::numbered(PaginationFormat::X));
    let text = page_text(&merge(&job), 0);

    let original = text.find("A page 1").unwrap();
    let label = text.find("(1) Tj").unwrap();
    assert!(text.trim_start().starts_with('q'));
    assert!(original < label);
    assert!(text[original..label].contains("Q\nq\n"));
}

#[test]
fn test_metadata_is_written() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 1).write(&dir.path().join("a.pdf"));

    let info = DocumentInfo {
        title: Some("Bound volume".to_string()),
        subject: Some("Collected papers".to_string()),
        author: Some("Archive".to_string()),
    };
    let job = MergeJob::new(vec![MergeInstruction::new(&a)], dir.path().join("out.pdf"))
        .with_info(info.clone());

    assert_eq!(MetadataWriter::new().read(&merge(&job)), info);
}
