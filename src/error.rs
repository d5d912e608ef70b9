//! Error types for the packet builder.
//!
//! This module defines all error types that can occur while reading library
//! documents, walking their outlines, assembling packets and persisting state.

use std::path::PathBuf;

/// Result type alias for packet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building reading packets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The PDF backend failed to load, read or write a document
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Registry or configuration (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bookmark and page data disagree: even the end-of-document bound
    /// yields no pages for this chapter.
    #[error(
        "Corrupt outline: chapter '{chapter}' targets page {target_page} \
         but the document has {page_count} pages"
    )]
    CorruptOutline {
        /// Bookmark name of the offending chapter
        chapter: String,
        /// Page the bookmark points at (0-based)
        target_page: usize,
        /// Total pages in the document
        page_count: usize,
    },

    /// A page range reaches past the end of its source document
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange {
        /// First page index that does not exist
        page: usize,
        /// Total pages in the document
        page_count: usize,
    },

    /// The navigator is resting on a bookmark group, not a chapter
    #[error("Current outline position is a section group, not a chapter")]
    NotAChapter,

    /// `save()` was called on a packet that has already been written
    #[error("Packet already saved to {}", .0.display())]
    AlreadySaved(PathBuf),

    /// No registry record matches the given title or id
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// An active registry record already uses this title
    #[error("Document already registered: {0}")]
    DuplicateDocument(String),

    /// A file given to the library is not a PDF
    #[error("Not a PDF file: {}", .0.display())]
    NotAPdf(PathBuf),

    /// The packet was saved but the progress of some documents was not
    /// recorded; the next run will repeat their chapters.
    #[error(
        "Packet saved to {} but progress not recorded for {}: {source}",
        .saved.display(),
        .pending.join(", ")
    )]
    RegistryNotUpdated {
        /// The packet that was written
        saved: PathBuf,
        /// Titles whose checkpoint or deactivation was not applied
        pending: Vec<String>,
        /// The registry failure
        source: Box<Error>,
    },

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
