//! Library documents opened for chapter selection.

use crate::error::{Error, Result};
use crate::outline::{parse_outline, Outline};
use lopdf::{Document, ObjectId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A PDF opened from the library.
///
/// Owns the parsed document and the page lookup needed to resolve bookmark
/// targets and to copy pages into a packet.
pub struct PdfSource {
    path: PathBuf,
    document: Document,
    /// Page object ids in page order
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSource")
            .field("path", &self.path)
            .field("page_count", &self.page_ids.len())
            .finish()
    }
}

impl PdfSource {
    /// Open a PDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Document::load(path)?;
        log::debug!("Opened {}", path.display());
        Ok(Self::from_document(path, document))
    }

    /// Wrap an already loaded document; `path` identifies it in packets and logs.
    pub fn from_document(path: impl Into<PathBuf>, document: Document) -> Self {
        // get_pages() is keyed by 1-based page number in ascending order
        let page_ids = document.get_pages().into_values().collect();
        Self {
            path: path.into(),
            document,
            page_ids,
        }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Parse the bookmark tree. Empty when the document has no bookmarks.
    pub fn outline(&self) -> Outline {
        let page_index: HashMap<ObjectId, usize> = self
            .page_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();
        parse_outline(&self.document, &page_index)
    }

    /// Object id of the page at `index` (0-based).
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids.get(index).copied().ok_or(Error::PageOutOfRange {
            page: index,
            page_count: self.page_ids.len(),
        })
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}
