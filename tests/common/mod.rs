//! PDF fixtures generated on the fly.
//!
//! Every page carries the marker text `(page N)` in its content stream, so
//! tests can tell which source pages ended up in a packet.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// Where a bookmark points.
#[derive(Debug, Clone)]
pub enum Target {
    /// No destination; only groups its children
    None,
    /// Explicit `/Dest [page /Fit]`
    Page(usize),
    /// `/A << /S /GoTo /D [page /Fit] >>`
    Action(usize),
    /// Named destination looked up in the catalog
    Named(String),
}

/// One outline item.
#[derive(Debug, Clone)]
pub struct Bookmark {
    pub title: Vec<u8>,
    pub target: Target,
    pub children: Vec<Bookmark>,
}

/// A bookmark pointing at `page`.
pub fn chapter(title: &str, page: usize) -> Bookmark {
    Bookmark {
        title: title.as_bytes().to_vec(),
        target: Target::Page(page),
        children: Vec::new(),
    }
}

/// A bookmark pointing at `page` with nested bookmarks.
pub fn section(title: &str, page: usize, children: Vec<Bookmark>) -> Bookmark {
    Bookmark {
        children,
        ..chapter(title, page)
    }
}

/// A bookmark without destination that only groups `children`.
pub fn heading(title: &str, children: Vec<Bookmark>) -> Bookmark {
    Bookmark {
        title: title.as_bytes().to_vec(),
        target: Target::None,
        children,
    }
}

impl Bookmark {
    /// Replace the destination.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Replace the raw title bytes.
    pub fn with_raw_title(mut self, title: Vec<u8>) -> Self {
        self.title = title;
        self
    }
}

/// Builder for test documents.
#[derive(Debug, Clone, Default)]
pub struct PdfFixture {
    pages: usize,
    bookmarks: Vec<Bookmark>,
    named: Vec<(String, usize)>,
}

impl PdfFixture {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn bookmarks(mut self, bookmarks: Vec<Bookmark>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Register a catalog `/Dests` entry.
    pub fn named_destination(mut self, name: &str, page: usize) -> Self {
        self.named.push((name.to_string(), page));
        self
    }

    pub fn build(&self) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut page_ids = Vec::new();
        for n in 0..self.pages {
            let content = format!("BT /F1 12 Tf 72 720 Td (page {}) Tj ET", n);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.pages as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if !self.named.is_empty() {
            let mut dests = lopdf::Dictionary::new();
            for (name, page) in &self.named {
                dests.set(name.as_bytes().to_vec(), explicit_dest(page_ids[*page]));
            }
            catalog.set("Dests", Object::Dictionary(dests));
        }
        if !self.bookmarks.is_empty() {
            let outlines_id = doc.new_object_id();
            let (first, last) = add_items(&mut doc, &self.bookmarks, outlines_id, &page_ids);
            doc.objects.insert(
                outlines_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Outlines",
                    "First" => first,
                    "Last" => last,
                    "Count" => self.bookmarks.len() as i64,
                }),
            );
            catalog.set("Outlines", Object::Reference(outlines_id));
        }

        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    pub fn write(&self, path: impl AsRef<Path>) {
        let mut doc = self.build();
        doc.save(path.as_ref()).expect("Failed to write fixture PDF");
    }
}

fn explicit_dest(page_id: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())])
}

/// Write `items` as a sibling chain under `parent`; returns (first, last).
fn add_items(
    doc: &mut Document,
    items: &[Bookmark],
    parent: ObjectId,
    page_ids: &[ObjectId],
) -> (ObjectId, ObjectId) {
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

    for (i, item) in items.iter().enumerate() {
        let mut dict = dictionary! {
            "Title" => Object::String(item.title.clone(), lopdf::StringFormat::Literal),
            "Parent" => parent,
        };
        match &item.target {
            Target::None => {},
            Target::Page(page) => dict.set("Dest", explicit_dest(page_ids[*page])),
            Target::Action(page) => dict.set(
                "A",
                Object::Dictionary(dictionary! {
                    "S" => "GoTo",
                    "D" => explicit_dest(page_ids[*page]),
                }),
            ),
            Target::Named(name) => {
                dict.set("Dest", Object::Name(name.as_bytes().to_vec()))
            },
        }
        if i > 0 {
            dict.set("Prev", Object::Reference(ids[i - 1]));
        }
        if i + 1 < ids.len() {
            dict.set("Next", Object::Reference(ids[i + 1]));
        }
        if !item.children.is_empty() {
            let (first, last) = add_items(doc, &item.children, ids[i], page_ids);
            dict.set("First", Object::Reference(first));
            dict.set("Last", Object::Reference(last));
            dict.set("Count", Object::Integer(item.children.len() as i64));
        }
        doc.objects.insert(ids[i], Object::Dictionary(dict));
    }

    (ids[0], ids[ids.len() - 1])
}

/// The `(page N)` markers of every page, in page order.
pub fn page_markers(doc: &Document) -> Vec<usize> {
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).expect("Page has no content");
            let text = String::from_utf8_lossy(&content);
            let start = text.find("(page ").expect("Page has no marker") + "(page ".len();
            let end = start + text[start..].find(')').expect("Unterminated marker");
            text[start..end].parse().expect("Marker is not a number")
        })
        .collect()
}

/// The three-chapter book used throughout: chapters at pages 0, 10 and 25
/// of 40.
pub fn three_chapter_book() -> PdfFixture {
    PdfFixture::new(40).bookmarks(vec![
        chapter("Chapter 1", 0),
        chapter("Chapter 2", 10),
        chapter("Chapter 3", 25),
    ])
}
