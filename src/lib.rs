// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Packet
//!
//! Cuts chapters out of a personal PDF library and merges them into dated
//! reading packets, remembering per book where reading stopped.
//!
//! ## Core Features
//!
//! - **Outline Navigation**: bookmark trees as `Leaf`/`Group` sibling lists,
//!   walked with an explicit frame stack (back, next, down, up, locate)
//! - **Chapter Boundaries**: chapter extent from the next sibling, the next
//!   enclosing chapter, or the end of the document
//! - **Automatic Selection**: greedy soft/hard page limits with descent into
//!   sub-chapters and bounded lookahead before checkpointing
//! - **Interactive Selection**: the same navigator behind a one-letter
//!   command prompt
//! - **Resumable Progress**: checkpoints are bookmark names, so re-parsed
//!   documents resume at the equivalent chapter
//! - **Atomic Output**: packets and the registry are written through a
//!   temporary file and renamed into place
//!
//! ## Architecture
//!
//! ```text
//! Registry ──► PacketGenerator ──► PdfSource ──► Outline
//!    ▲               │                             │
//!    │               ▼                             ▼
//!    └── checkpoints  AccumulationPolicy ──► Navigator + chapter_pages
//!        (after save)        │
//!                            ▼
//!                     PacketAssembler ──► <YYYYmmdd_HHMMSS>_paper.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_packet::{JsonRegistry, PacketConfig, PacketGenerator};
//!
//! # fn main() -> pdf_packet::Result<()> {
//! let config = PacketConfig::new().with_limits(30, 45);
//! let mut registry = JsonRegistry::open(&config.registry_path)?;
//! let report = PacketGenerator::new(config)?.generate(&mut registry, None)?;
//! if let Some(path) = report.output {
//!     println!("{} pages written to {}", report.pages(), path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Only one process may use a library and its registry at a time; there is
//! no cross-process locking.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Document reading
pub mod outline;
pub mod source;

// Chapter traversal and selection
pub mod navigator;
pub mod policy;

// Output
pub mod assembler;

// Library state
pub mod library;
pub mod registry;

// Packet runs
pub mod generator;
pub mod interactive;

// Re-exports
pub use assembler::PacketAssembler;
pub use config::PacketConfig;
pub use error::{Error, Result};
pub use generator::{DocumentOutcome, DocumentReport, PacketGenerator, PacketReport};
pub use interactive::{Command, InteractiveOutcome, InteractiveSession};
pub use library::Library;
pub use navigator::{Frame, Navigator, Step};
pub use outline::{Outline, OutlineElement};
pub use policy::{AccumulationPolicy, ChapterRange, Resting, SelectionRun};
pub use registry::{DocumentRecord, JsonRegistry, Registry};
pub use source::PdfSource;

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
