//! Integration tests for outline import and the output outline.

use lopdf::{Document, Object};
use pdfsplice::config::{MergeInstruction, MergeJob};
use pdfsplice::merge::{
    BookmarkDecision, BookmarkFailure, BookmarkFailureHandler, BookmarkPolicy, BookmarkSeverity,
    do_merge,
};
use tempfile::TempDir;

use crate::common::{Entry, SourcePdf, entry, read_outline, uncompressed};

fn merge(job: &MergeJob) -> Document {
    let result = do_merge(job, &uncompressed(), None, &mut BookmarkPolicy::Cancel);
    assert!(result.is_success(), "Merge failed: {}", result.error_message);
    Document::load(&job.output).unwrap()
}

fn nested_source() -> SourcePdf {
    SourcePdf::new("S", 4).outline(vec![
        Entry::page("Intro", 0),
        Entry::page("Body", 1).children(vec![
            Entry::action("Detail", 2).children(vec![Entry::page("Deep", 3)]),
        ]),
    ])
}

#[derive(Default)]
struct Recording(Vec<BookmarkFailure>);

impl BookmarkFailureHandler for Recording {
    fn decide(&mut self, failure: &BookmarkFailure) -> BookmarkDecision {
        self.0.push(failure.clone());
        BookmarkDecision::Continue
    }
}

#[test]
fn test_titled_instruction_without_import() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 3).write(&dir.path().join("a.pdf"));
    let b = nested_source().write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![
            MergeInstruction::new(&a),
            MergeInstruction::new(&b).titled("Section B", 0),
        ],
        dir.path().join("out.pdf"),
    );

    assert_eq!(read_outline(&merge(&job)), vec![entry("Section B", 0, 3)]);
}

#[test]
fn test_report_sums_bookmarks_per_instruction() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 2).write(&dir.path().join("a.pdf"));
    let b = nested_source().write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![
            MergeInstruction::new(&a).titled("Part A", 0),
            MergeInstruction::new(&b).with_bookmarks().titled("Part B", 0),
            MergeInstruction::new(&b).pages("2"),
        ],
        dir.path().join("out.pdf"),
    )
    .with_report();
    let result = do_merge(&job, &uncompressed(), None, &mut BookmarkPolicy::Cancel);
    assert!(result.is_success(), "Merge failed: {}", result.error_message);

    let report = result.report.unwrap();
    assert_eq!(report.bookmark_count, 6);
    assert_eq!(read_outline(&Document::load(&job.output).unwrap()).len(), 6);
    let sidecar = std::fs::read_to_string(job.report_path()).unwrap();
    assert!(sidecar.contains("BookMarkCount=6\r\n"));
}

#[test]
fn test_imported_outline_is_rebased() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 2).write(&dir.path().join("a.pdf"));
    let b = nested_source().write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![
            MergeInstruction::new(&a),
            MergeInstruction::new(&b).with_bookmarks(),
        ],
        dir.path().join("out.pdf"),
    );

    assert_eq!(
        read_outline(&merge(&job)),
        vec![
            entry("Intro", 0, 2),
            entry("Body", 0, 3),
            entry("Detail", 1, 4),
            entry("Deep", 2, 5),
        ]
    );
}

#[test]
fn test_root_title_nests_imported_outline() {
    let dir = TempDir::new().unwrap();
    let b = nested_source().write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![
            MergeInstruction::new(&b)
                .with_bookmarks()
                .titled("Chapter (1) > B", 0),
        ],
        dir.path().join("out.pdf"),
    );

    assert_eq!(
        read_outline(&merge(&job)),
        vec![
            entry("Chapter 1  B", 0, 0),
            entry("Intro", 1, 0),
            entry("Body", 1, 1),
            entry("Detail", 2, 2),
            entry("Deep", 3, 3),
        ]
    );
}

#[test]
fn test_excluded_page_reattaches_children() {
    let dir = TempDir::new().unwrap();
    let b = nested_source().write(&dir.path().join("b.pdf"));

    // Page 3 ("Detail") is left out; "Deep" moves up to its level.
    let job = MergeJob::new(
        vec![MergeInstruction::new(&b).pages("1,2,4").with_bookmarks()],
        dir.path().join("out.pdf"),
    );

    assert_eq!(
        read_outline(&merge(&job)),
        vec![
            entry("Intro", 0, 0),
            entry("Body", 0, 1),
            entry("Deep", 1, 2),
        ]
    );
}

#[test]
fn test_named_destinations_resolve() {
    let dir = TempDir::new().unwrap();
    let b = SourcePdf::new("S", 3)
        .named("appendix", 2)
        .outline(vec![Entry::named("Appendix", "appendix")])
        .write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![MergeInstruction::new(&b).with_bookmarks()],
        dir.path().join("out.pdf"),
    );

    assert_eq!(read_outline(&merge(&job)), vec![entry("Appendix", 0, 2)]);
}

#[test]
fn test_blind_bookmark_is_dropped_but_children_kept() {
    let dir = TempDir::new().unwrap();
    let b = SourcePdf::new("S", 2)
        .outline(vec![
            Entry::blind("Part I").children(vec![Entry::page("One", 0), Entry::page("Two", 1)]),
        ])
        .write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![MergeInstruction::new(&b).with_bookmarks()],
        dir.path().join("out.pdf"),
    );

    assert_eq!(
        read_outline(&merge(&job)),
        vec![entry("One", 0, 0), entry("Two", 0, 1)]
    );
}

#[test]
fn test_outline_catalog_entries() {
    let dir = TempDir::new().unwrap();
    let b = nested_source().write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![MergeInstruction::new(&b).with_bookmarks()],
        dir.path().join("out.pdf"),
    );
    let doc = merge(&job);

    let catalog = doc.catalog().unwrap();
    assert!(matches!(
        catalog.get(b"PageMode"),
        Ok(Object::Name(name)) if name == b"UseOutlines"
    ));
    let outlines = doc
        .get_dictionary(catalog.get(b"Outlines").unwrap().as_reference().unwrap())
        .unwrap();
    assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 2);
}

#[test]
fn test_no_bookmarks_means_no_outline() {
    let dir = TempDir::new().unwrap();
    let b = nested_source().write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(vec![MergeInstruction::new(&b)], dir.path().join("out.pdf"));
    let doc = merge(&job);

    assert!(!doc.catalog().unwrap().has(b"Outlines"));
}

#[test]
fn test_malformed_outline_offers_decision_and_continues() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");

    // An outline whose /First points at a non-dictionary.
    let mut doc = SourcePdf::new("S", 2).build();
    let junk = doc.add_object(Object::Integer(7));
    let outlines = doc.add_object(lopdf::dictionary! { "Type" => "Outlines", "First" => junk });
    doc.catalog_mut().unwrap().set("Outlines", outlines);
    doc.save(&path).unwrap();

    let a = SourcePdf::new("A", 1)
        .outline(vec![Entry::page("Kept", 0)])
        .write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(
        vec![
            MergeInstruction::new(&a).with_bookmarks(),
            MergeInstruction::new(&path).with_bookmarks().titled("Broken", 0),
        ],
        dir.path().join("out.pdf"),
    );
    let mut handler = Recording::default();
    let result = do_merge(&job, &uncompressed(), None, &mut handler);

    assert!(result.is_success(), "{}", result.error_message);
    assert_eq!(handler.0.len(), 1);
    assert_eq!(handler.0[0].severity, BookmarkSeverity::Error);
    assert_eq!(handler.0[0].descriptor, job.instructions[1].descriptor());

    let report = result.report.unwrap();
    assert_eq!(report.page_count, 3);
    assert_eq!(report.bookmark_count, 1);
    assert_eq!(
        read_outline(&Document::load(&job.output).unwrap()),
        vec![entry("Kept", 0, 0)]
    );
}
