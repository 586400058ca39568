//! Shared helpers for the integration tests.
//!
//! Source PDFs are built on the fly with lopdf instead of shipping binary
//! fixtures, so every test states exactly which pages, outline items and
//! named destinations its sources carry.

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pdfsplice::config::MergeOptions;
use pdfsplice::utils::decode_text_string;

/// Where an outline entry points.
#[derive(Debug, Clone)]
pub enum Target {
    /// Explicit `/Dest [page /Fit]`, 0-based page.
    Page(usize),
    /// `/A << /S /GoTo /D [page /Fit] >>`, 0-based page.
    Action(usize),
    /// `/Dest (name)`, looked up in the name tree.
    Named(&'static str),
    /// No destination at all.
    Blind,
}

/// One outline entry of a generated source.
#[derive(Debug, Clone)]
pub struct Entry {
    pub title: String,
    pub target: Target,
    pub children: Vec<Entry>,
}

impl Entry {
    pub fn page(title: &str, page: usize) -> Self {
        Self::with_target(title, Target::Page(page))
    }

    pub fn action(title: &str, page: usize) -> Self {
        Self::with_target(title, Target::Action(page))
    }

    pub fn named(title: &str, name: &'static str) -> Self {
        Self::with_target(title, Target::Named(name))
    }

    pub fn blind(title: &str) -> Self {
        Self::with_target(title, Target::Blind)
    }

    pub fn children(mut self, children: Vec<Entry>) -> Self {
        self.children = children;
        self
    }

    fn with_target(title: &str, target: Target) -> Self {
        Self {
            title: title.to_string(),
            target,
            children: Vec::new(),
        }
    }
}

/// Builder for a source PDF.
#[derive(Debug, Clone)]
pub struct SourcePdf {
    label: String,
    pages: usize,
    version: &'static str,
    outline: Vec<Entry>,
    named: Vec<(&'static str, usize)>,
}

impl SourcePdf {
    /// `pages` pages, each showing "`label` page n".
    pub fn new(label: &str, pages: usize) -> Self {
        Self {
            label: label.to_string(),
            pages,
            version: "1.4",
            outline: Vec::new(),
            named: Vec::new(),
        }
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    pub fn outline(mut self, entries: Vec<Entry>) -> Self {
        self.outline = entries;
        self
    }

    /// Register a named destination in a two-level `/Names /Dests` tree.
    pub fn named(mut self, name: &'static str, page: usize) -> Self {
        self.named.push((name, page));
        self
    }

    pub fn build(&self) -> Document {
        let mut doc = Document::with_version(self.version);
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_ids = Vec::new();
        for n in 1..=self.pages {
            let content = format!("BT /F1 12 Tf 72 720 Td ({} page {n}) Tj ET", self.label);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            }));
        }

        // Resources and MediaBox live on the tree node and are inherited.
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "Count" => self.pages as i64,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );

        let mut catalog = dictionary! { "Type" => "Catalog", "Pages" => pages_id };

        if !self.named.is_empty() {
            let mut pairs = Vec::new();
            for &(name, page) in &self.named {
                pairs.push(Object::String(name.as_bytes().to_vec(), StringFormat::Literal));
                pairs.push(fit(page_ids[page]));
            }
            let leaf = doc.add_object(dictionary! { "Names" => pairs });
            let root = doc.add_object(dictionary! { "Kids" => vec![Object::Reference(leaf)] });
            catalog.set("Names", dictionary! { "Dests" => root });
        }

        if !self.outline.is_empty() {
            let outlines_id = doc.new_object_id();
            let (first, last) = write_entries(&mut doc, &self.outline, outlines_id, &page_ids);
            doc.objects.insert(
                outlines_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Outlines",
                    "First" => first,
                    "Last" => last,
                    "Count" => self.outline.len() as i64,
                }),
            );
            catalog.set("Outlines", outlines_id);
        }

        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        doc
    }

    /// Build and save to `path`, returning it.
    pub fn write(&self, path: &Path) -> PathBuf {
        self.build().save(path).unwrap();
        path.to_path_buf()
    }
}

fn fit(page: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page), "Fit".into()])
}

fn write_entries(
    doc: &mut Document,
    entries: &[Entry],
    parent: ObjectId,
    page_ids: &[ObjectId],
) -> (ObjectId, ObjectId) {
    let ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    for (i, entry) in entries.iter().enumerate() {
        let mut item = Dictionary::new();
        item.set(
            "Title",
            Object::String(entry.title.as_bytes().to_vec(), StringFormat::Literal),
        );
        item.set("Parent", parent);
        match entry.target {
            Target::Page(page) => item.set("Dest", fit(page_ids[page])),
            Target::Action(page) => item.set(
                "A",
                dictionary! { "S" => "GoTo", "D" => fit(page_ids[page]) },
            ),
            Target::Named(name) => item.set(
                "Dest",
                Object::String(name.as_bytes().to_vec(), StringFormat::Literal),
            ),
            Target::Blind => {}
        }
        if i > 0 {
            item.set("Prev", ids[i - 1]);
        }
        if i + 1 < ids.len() {
            item.set("Next", ids[i + 1]);
        }
        if !entry.children.is_empty() {
            let (first, last) = write_entries(doc, &entry.children, ids[i], page_ids);
            item.set("First", first);
            item.set("Last", last);
            item.set("Count", entry.children.len() as i64);
        }
        doc.objects.insert(ids[i], Object::Dictionary(item));
    }

    (ids[0], ids[ids.len() - 1])
}

/// Options that leave content streams readable in the output.
pub fn uncompressed() -> MergeOptions {
    MergeOptions {
        compress: false,
        ..Default::default()
    }
}

/// Decoded content of the output page at 0-based `index`.
pub fn page_text(doc: &Document, index: usize) -> String {
    let page_id = doc.get_pages().into_values().nth(index).unwrap();
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}

/// The output outline in pre-order as `(title, level, page index)`.
pub fn read_outline(doc: &Document) -> Vec<(String, usize, usize)> {
    let index: HashMap<ObjectId, usize> = doc
        .get_pages()
        .into_values()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();

    let mut entries = Vec::new();
    let Ok(outlines) = doc
        .catalog()
        .and_then(|c| c.get(b"Outlines"))
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id))
    else {
        return entries;
    };

    let first = outlines.get(b"First").and_then(Object::as_reference).ok();
    visit(doc, first, 0, &index, &mut entries);
    entries
}

fn visit(
    doc: &Document,
    mut current: Option<ObjectId>,
    level: usize,
    index: &HashMap<ObjectId, usize>,
    out: &mut Vec<(String, usize, usize)>,
) {
    while let Some(id) = current {
        let item = doc.get_dictionary(id).unwrap();
        let title = match item.get(b"Title").unwrap() {
            Object::String(bytes, _) => decode_text_string(bytes),
            other => panic!("title is not a string: {other:?}"),
        };
        let page_id = item.get(b"Dest").unwrap().as_array().unwrap()[0]
            .as_reference()
            .unwrap();
        out.push((title, level, index[&page_id]));

        let first = item.get(b"First").and_then(Object::as_reference).ok();
        visit(doc, first, level + 1, index, out);
        current = item.get(b"Next").and_then(Object::as_reference).ok();
    }
}

/// Shorthand for an expected outline entry.
pub fn entry(title: &str, level: usize, page: usize) -> (String, usize, usize) {
    (title.to_string(), level, page)
}
