//! Automatic packet generation across the whole library.
//!
//! Every active document contributes one [`SelectionRun`] to a shared
//! packet. Registry updates are held back until the packet file exists, so
//! a failed run leaves every checkpoint where it was.

use crate::assembler::PacketAssembler;
use crate::config::PacketConfig;
use crate::error::{Error, Result};
use crate::library::Library;
use crate::policy::{AccumulationPolicy, Resting, SelectionRun};
use crate::registry::{DocumentRecord, Registry};
use crate::source::PdfSource;
use std::path::PathBuf;

/// What happened to one document during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Chapters were taken; the next run resumes after this one.
    Resumable(String),
    /// The document has been read to the end and is deactivated.
    Exhausted,
    /// The document has no bookmarks and was skipped.
    NoBookmarks,
    /// Bookmark and page data disagree; skipped with its checkpoint untouched.
    CorruptOutline(String),
    /// The file could not be opened or parsed; skipped.
    Unreadable(String),
}

/// Per-document summary of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    /// Registered title
    pub title: String,
    /// Pages this document contributed
    pub pages: usize,
    /// Outcome
    pub outcome: DocumentOutcome,
}

/// Result of [`PacketGenerator::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketReport {
    /// The saved packet, or `None` when no document had anything to give
    pub output: Option<PathBuf>,
    /// One entry per active document, in processing order
    pub documents: Vec<DocumentReport>,
}

impl PacketReport {
    /// Total pages written.
    pub fn pages(&self) -> usize {
        self.documents.iter().map(|d| d.pages).sum()
    }
}

/// Builds reading packets without user interaction.
#[derive(Debug, Clone)]
pub struct PacketGenerator {
    config: PacketConfig,
    policy: AccumulationPolicy,
    library: Library,
}

impl PacketGenerator {
    /// Create a generator; fails if the configuration is inconsistent.
    pub fn new(config: PacketConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            policy: AccumulationPolicy::from_config(&config),
            library: Library::new(&config.library_dir),
            config,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &PacketConfig {
        &self.config
    }

    /// Take the next chapters of every active document (optionally only
    /// those filed under `topic`) and save them as one packet.
    pub fn generate(&self, registry: &mut impl Registry, topic: Option<&str>) -> Result<PacketReport> {
        let mut assembler = PacketAssembler::new();
        let mut documents = Vec::new();
        let mut updates = Vec::new();

        for record in registry.list_active(topic)? {
            let (report, resting) = self.take_from(&record, &mut assembler)?;
            if let Some(resting) = resting {
                updates.push((record.id, record.title.clone(), resting));
            }
            documents.push(report);
        }

        let output = if assembler.pages_written() == 0 {
            log::info!("No pages selected, nothing to save");
            None
        } else {
            Some(assembler.save(&self.config.output_dir)?)
        };

        let mut pending = updates.into_iter();
        while let Some((id, title, resting)) = pending.next() {
            let applied = match &resting {
                Resting::Checkpoint(name) => registry.set_checkpoint(id, name),
                Resting::Exhausted => registry.deactivate(id),
            };
            if let Err(e) = applied {
                let missed: Vec<(String, Resting)> = std::iter::once((title, resting))
                    .chain(pending.map(|(_, title, resting)| (title, resting)))
                    .collect();
                return Err(registry_not_updated(output, missed, e));
            }
        }

        Ok(PacketReport { output, documents })
    }

    /// Select and copy one document's run. The returned resting position is
    /// `None` when the registry must not change for this document.
    fn take_from(
        &self,
        record: &DocumentRecord,
        assembler: &mut PacketAssembler,
    ) -> Result<(DocumentReport, Option<Resting>)> {
        let report = |pages, outcome| DocumentReport {
            title: record.title.clone(),
            pages,
            outcome,
        };

        let source = match PdfSource::open(self.library.path_of(&record.title)) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Skipping '{}': {}", record.title, e);
                return Ok((report(0, DocumentOutcome::Unreadable(e.to_string())), None));
            },
        };

        let outline = source.outline();
        if outline.is_empty() {
            log::info!("Skipping '{}': no bookmarks", record.title);
            return Ok((report(0, DocumentOutcome::NoBookmarks), None));
        }

        let run: SelectionRun = match self.policy.select(&outline, record.checkpoint.as_deref()) {
            Ok(run) => run,
            Err(e @ Error::CorruptOutline { .. }) => {
                log::warn!("Skipping '{}': {}", record.title, e);
                return Ok((report(0, DocumentOutcome::CorruptOutline(e.to_string())), None));
            },
            Err(e) => return Err(e),
        };

        for chapter in &run.chapters {
            assembler.commit(&source, chapter.start_page, chapter.page_count)?;
            log::info!(
                "'{}': took '{}' ({} pages)",
                record.title,
                chapter.name,
                chapter.page_count
            );
        }

        let outcome = match &run.resting {
            Resting::Checkpoint(name) => DocumentOutcome::Resumable(name.clone()),
            Resting::Exhausted => DocumentOutcome::Exhausted,
        };
        Ok((report(run.collected, outcome), Some(run.resting)))
    }
}

/// Log every document whose registry update was lost and wrap the failure.
pub(crate) fn registry_not_updated(output: Option<PathBuf>, missed: Vec<(String, Resting)>, e: Error) -> Error {
    for (title, resting) in &missed {
        match resting {
            Resting::Checkpoint(name) => {
                log::error!("Progress not recorded: '{}' should resume after '{}'", title, name)
            },
            Resting::Exhausted => log::error!("Progress not recorded: '{}' should be deactivated", title),
        }
    }
    match output {
        Some(saved) => Error::RegistryNotUpdated {
            saved,
            pending: missed.into_iter().map(|(title, _)| title).collect(),
            source: Box::new(e),
        },
        None => e,
    }
}
