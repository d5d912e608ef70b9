//! Reading packet assembly.
//!
//! Pages are deep-copied from their source documents into one in-memory
//! output document:
//!
//! ```text
//! PdfSource (library book)          PacketAssembler
//!   page n ──clone + inherit──►  page' (Parent = packet page tree)
//!   Resources, fonts, images ──►  copied once per source file
//!   other pages / page tree  ──►  null
//! ```
//!
//! Nothing touches the filesystem before [`PacketAssembler::save`], which
//! writes through a temporary file in the target directory and renames it
//! into place.

use crate::error::{Error, Result};
use crate::source::PdfSource;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on page tree depth when resolving inherited attributes.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Accumulates pages from library documents into one output PDF.
pub struct PacketAssembler {
    output: Document,
    pages_id: ObjectId,
    catalog_id: ObjectId,
    /// Packet page ids in reading order
    kids: Vec<ObjectId>,
    /// Per source file: source object id → packet object id
    imported: HashMap<PathBuf, HashMap<ObjectId, ObjectId>>,
    saved: Option<PathBuf>,
}

impl std::fmt::Debug for PacketAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketAssembler")
            .field("pages_written", &self.kids.len())
            .field("sources", &self.imported.len())
            .field("saved", &self.saved)
            .finish()
    }
}

impl Default for PacketAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketAssembler {
    /// Create an empty packet.
    pub fn new() -> Self {
        let mut output = Document::with_version("1.5");
        let pages_id = output.new_object_id();
        let catalog_id = output.new_object_id();
        Self {
            output,
            pages_id,
            catalog_id,
            kids: Vec::new(),
            imported: HashMap::new(),
            saved: None,
        }
    }

    /// Pages committed so far.
    pub fn pages_written(&self) -> usize {
        self.kids.len()
    }

    /// Path of the saved packet, once written.
    pub fn saved_path(&self) -> Option<&Path> {
        self.saved.as_deref()
    }

    /// Append `page_count` pages of `source` starting at `start_page`.
    pub fn commit(&mut self, source: &PdfSource, start_page: usize, page_count: usize) -> Result<()> {
        if let Some(path) = &self.saved {
            return Err(Error::AlreadySaved(path.clone()));
        }
        let end = start_page + page_count;
        if end > source.page_count() {
            return Err(Error::PageOutOfRange {
                page: start_page.max(source.page_count()),
                page_count: source.page_count(),
            });
        }

        for index in start_page..end {
            self.import_page(source, index)?;
        }
        log::debug!(
            "Copied pages {}..{} of {} ({} in packet)",
            start_page,
            end,
            source.path().display(),
            self.kids.len()
        );
        Ok(())
    }

    fn import_page(&mut self, source: &PdfSource, index: usize) -> Result<()> {
        let doc = source.document();
        let page_id = source.page_id(index)?;

        let mut page = doc.get_dictionary(page_id)?.clone();
        for key in INHERITABLE_KEYS {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(doc, page_id, key) {
                    page.set(key, value.clone());
                }
            }
        }
        page.remove(b"Parent");

        let map = self.imported.entry(source.path().to_path_buf()).or_default();
        let mut copier = ObjectCopier {
            source: doc,
            output: &mut self.output,
            map,
            queue: Vec::new(),
        };

        // An earlier page may already reference this one; that reference
        // holds a null placeholder to be replaced now. A page taken twice
        // gets a second copy.
        let new_page_id = match copier.map.get(&page_id) {
            Some(&id) if !self.kids.contains(&id) => id,
            _ => {
                let id = copier.output.new_object_id();
                copier.map.entry(page_id).or_insert(id);
                id
            },
        };

        for (_, value) in page.iter_mut() {
            copier.remap(value);
        }
        copier.drain();

        page.set("Parent", Object::Reference(self.pages_id));
        self.output.objects.insert(new_page_id, Object::Dictionary(page));
        self.kids.push(new_page_id);
        Ok(())
    }

    /// Write the packet as `<YYYYmmdd_HHMMSS>_paper.pdf` in `output_dir`.
    ///
    /// Succeeds at most once; later calls fail with [`Error::AlreadySaved`].
    pub fn save(&mut self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        if let Some(path) = &self.saved {
            return Err(Error::AlreadySaved(path.clone()));
        }
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        let now = chrono::Local::now();
        let path = unused_path(output_dir, &now.format("%Y%m%d_%H%M%S").to_string());
        self.finish_structure(&now.format("%Y-%m-%d").to_string());

        let mut file = tempfile::NamedTempFile::new_in(output_dir)?;
        self.output.save_to(&mut file)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;

        log::info!("Saved {} pages to {}", self.kids.len(), path.display());
        self.saved = Some(path.clone());
        Ok(path)
    }

    /// Install page tree, catalog and trailer. Safe to repeat.
    fn finish_structure(&mut self, date: &str) {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        self.output.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        self.output.objects.insert(self.catalog_id, Object::Dictionary(catalog));

        let mut info = Dictionary::new();
        info.set("Title", Object::string_literal(format!("Reading packet {}", date)));
        info.set(
            "Producer",
            Object::string_literal(format!("{} {}", crate::NAME, crate::VERSION)),
        );
        let info_id = self.output.add_object(Object::Dictionary(info));

        self.output.trailer.set("Root", Object::Reference(self.catalog_id));
        self.output.trailer.set("Info", Object::Reference(info_id));
        self.output
            .trailer
            .set("Size", Object::Integer(self.output.max_id as i64 + 1));
    }
}

/// Copies objects reachable from a page, renumbering them for the output.
struct ObjectCopier<'a> {
    source: &'a Document,
    output: &'a mut Document,
    map: &'a mut HashMap<ObjectId, ObjectId>,
    /// Source ids allocated in the output but not yet copied
    queue: Vec<ObjectId>,
}

impl ObjectCopier<'_> {
    /// Rewrite every reference inside `object` to its output id.
    fn remap(&mut self, object: &mut Object) {
        match object {
            Object::Reference(id) => *id = self.output_id(*id),
            Object::Array(items) => {
                for item in items {
                    self.remap(item);
                }
            },
            Object::Dictionary(dict) => {
                for (_, value) in dict.iter_mut() {
                    self.remap(value);
                }
            },
            Object::Stream(stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    self.remap(value);
                }
            },
            _ => {},
        }
    }

    fn output_id(&mut self, source_id: ObjectId) -> ObjectId {
        if let Some(&id) = self.map.get(&source_id) {
            return id;
        }
        let id = self.output.new_object_id();
        self.map.insert(source_id, id);
        self.queue.push(source_id);
        id
    }

    /// Copy every queued object, following the references they contain.
    fn drain(&mut self) {
        while let Some(source_id) = self.queue.pop() {
            let output_id = self.map[&source_id];
            let object = match self.source.get_object(source_id) {
                Ok(object) if is_page_tree_node(object) => Object::Null,
                Ok(object) => {
                    let mut object = object.clone();
                    self.remap(&mut object);
                    object
                },
                Err(e) => {
                    log::warn!("Dangling reference {:?}: {}", source_id, e);
                    Object::Null
                },
            };
            self.output.objects.insert(output_id, object);
        }
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object.as_dict().and_then(|dict| dict.get(b"Type")).and_then(Object::as_name) {
        Ok(kind) => kind == b"Page" || kind == b"Pages",
        Err(_) => false,
    }
}

fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}

/// `<stamp>_paper.pdf`, or `<stamp>_paper_<n>.pdf` if that is taken.
fn unused_path(dir: &Path, stamp: &str) -> PathBuf {
    let mut path = dir.join(format!("{}_paper.pdf", stamp));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_paper_{}.pdf", stamp, n));
        n += 1;
    }
    path
}
