//! Integration tests for basic page assembly.

use lopdf::Document;
use pdfsplice::config::{MergeInstruction, MergeJob, MergeOptions};
use pdfsplice::merge::{BookmarkPolicy, Merger, do_merge};
use rstest::rstest;
use tempfile::TempDir;

use crate::common::{SourcePdf, page_text, uncompressed};

fn run(job: &MergeJob) -> Document {
    let result = do_merge(job, &uncompressed(), None, &mut BookmarkPolicy::Cancel);
    assert!(result.is_success(), "Merge failed: {}", result.error_message);
    Document::load(&job.output).unwrap()
}

fn texts(doc: &Document) -> Vec<String> {
    (0..doc.get_pages().len())
        .map(|i| page_text(doc, i))
        .collect()
}

#[test]
fn test_all_selectors_concatenate_in_source_order() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 3).write(&dir.path().join("a.pdf"));
    let b = SourcePdf::new("B", 2).write(&dir.path().join("b.pdf"));
    let c = SourcePdf::new("C", 4).write(&dir.path().join("c.pdf"));

    let job = MergeJob::new(
        vec![
            MergeInstruction::new(&a),
            MergeInstruction::new(&b),
            MergeInstruction::new(&c),
        ],
        dir.path().join("out.pdf"),
    );
    let doc = run(&job);

    let texts = texts(&doc);
    assert_eq!(texts.len(), 9);
    let expected = [
        "A page 1", "A page 2", "A page 3", "B page 1", "B page 2", "C page 1", "C page 2",
        "C page 3", "C page 4",
    ];
    for (text, label) in texts.iter().zip(expected) {
        assert!(text.contains(label), "expected {label}, got {text}");
    }
}

#[test]
fn test_selection_order_and_duplicates_are_kept() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 4).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(
        vec![MergeInstruction::new(&a).pages("4,1;2-3,1")],
        dir.path().join("out.pdf"),
    );
    let doc = run(&job);

    let texts = texts(&doc);
    assert_eq!(texts.len(), 5);
    for (text, n) in texts.iter().zip([4, 1, 2, 3, 1]) {
        assert!(text.contains(&format!("A page {n}")));
    }
}

#[rstest]
#[case("abc")]
#[case("all")]
#[case("")]
#[case("9-2")]
fn test_unusable_selector_takes_whole_document(#[case] selector: &str) {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 5).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(
        vec![MergeInstruction::new(&a).pages(selector)],
        dir.path().join("out.pdf"),
    );

    assert_eq!(run(&job).get_pages().len(), 5);
}

#[test]
fn test_disjoint_ranges_match_whole_document() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 5).write(&dir.path().join("a.pdf"));

    let split = MergeJob::new(
        vec![
            MergeInstruction::new(&a).pages("1-2"),
            MergeInstruction::new(&a).pages("3-5"),
        ],
        dir.path().join("split.pdf"),
    );
    let split_doc = run(&split);

    let remerged = MergeJob::new(
        vec![MergeInstruction::new(&split.output)],
        dir.path().join("remerged.pdf"),
    );
    let whole = MergeJob::new(vec![MergeInstruction::new(&a)], dir.path().join("whole.pdf"));

    let remerged_texts = texts(&run(&remerged));
    assert_eq!(remerged_texts, texts(&split_doc));
    assert_eq!(remerged_texts, texts(&run(&whole)));
}

#[test]
fn test_inherited_attributes_are_flattened() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 2).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(vec![MergeInstruction::new(&a)], dir.path().join("out.pdf"));
    let doc = run(&job);

    for page_id in doc.get_pages().into_values() {
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }
}

#[test]
fn test_version_is_raised_to_highest_source() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 1).write(&dir.path().join("a.pdf"));
    let b = SourcePdf::new("B", 1)
        .version("1.7")
        .write(&dir.path().join("b.pdf"));

    let job = MergeJob::new(
        vec![MergeInstruction::new(&a), MergeInstruction::new(&b)],
        dir.path().join("out.pdf"),
    );
    let report = Merger::new(MergeOptions::default())
        .run(&job, None, &mut BookmarkPolicy::Cancel)
        .unwrap();

    assert_eq!(report.version, "1.7");
    assert_eq!(Document::load(&job.output).unwrap().version, "1.7");
}

#[test]
fn test_progress_trace_and_sidecar() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 3).write(&dir.path().join("a.pdf"));
    let b = SourcePdf::new("B", 2).write(&dir.path().join("b.pdf"));

    let instructions = vec![
        MergeInstruction::new(&a).pages("1-2"),
        MergeInstruction::new(&b).titled("Section B", 0),
    ];
    let descriptors: Vec<String> = instructions.iter().map(|i| i.descriptor()).collect();
    let job = MergeJob::new(instructions, dir.path().join("out.pdf")).with_report();

    let mut trace: Vec<String> = Vec::new();
    let result = do_merge(
        &job,
        &MergeOptions::default(),
        Some(&mut trace),
        &mut BookmarkPolicy::Cancel,
    );
    assert!(result.is_success(), "{}", result.error_message);
    assert_eq!(trace, descriptors);

    let sidecar = std::fs::read_to_string(job.report_path()).unwrap();
    assert_eq!(
        sidecar,
        "BookMarkCount=1\r\nMergeListFileArrayCount=2\r\nPageCount=4\r\n"
    );
}

#[test]
fn test_merge_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 2).write(&dir.path().join("a.pdf"));

    let job = MergeJob::new(
        vec![MergeInstruction::new(&a).titled("A", 0)],
        dir.path().join("out.pdf"),
    );
    let merger = Merger::new(MergeOptions::default());

    let first = merger.run(&job, None, &mut BookmarkPolicy::Cancel).unwrap();
    let second = merger.run(&job, None, &mut BookmarkPolicy::Cancel).unwrap();

    assert_eq!(first.page_count, second.page_count);
    assert_eq!(first.bookmark_count, second.bookmark_count);
    assert_eq!(second.bookmark_count, 1);
}

#[cfg(feature = "qpdf")]
#[test]
fn test_damaged_source_is_merged_through_fallback() {
    let dir = TempDir::new().unwrap();
    let a = SourcePdf::new("A", 1).write(&dir.path().join("a.pdf"));

    let mut damaged = SourcePdf::new("D", 2).build();
    damaged.reference_table.cross_reference_type = lopdf::xref::XrefType::CrossReferenceTable;
    let mut bytes = Vec::new();
    damaged.save_to(&mut bytes).unwrap();
    let tail = bytes
        .windows(9)
        .rposition(|window| window == b"startxref")
        .unwrap();
    bytes.truncate(tail);
    bytes.extend_from_slice(b"startxref\n9999999\n%%EOF\n");
    let d = dir.path().join("d.pdf");
    std::fs::write(&d, bytes).unwrap();

    let job = MergeJob::new(
        vec![MergeInstruction::new(&a), MergeInstruction::new(&d)],
        dir.path().join("out.pdf"),
    );
    let texts = texts(&run(&job));

    assert_eq!(texts.len(), 3);
    assert!(texts[1].contains("D page 1"));
    assert!(texts[2].contains("D page 2"));
}
