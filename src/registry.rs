//! Library registry: which documents take part in packets and where each
//! one's reading stopped.
//!
//! The persisted checkpoint is a bookmark name, never a structural index,
//! so it survives re-parsing a document between runs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One registered library document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Stable record id
    pub id: u64,
    /// File name inside the library directory
    pub title: String,
    /// Optional subject used to filter packets
    #[serde(default)]
    pub topic: Option<String>,
    /// Name of the last chapter taken
    #[serde(default)]
    pub checkpoint: Option<String>,
    /// Inactive documents are kept for history but never read
    pub active: bool,
}

/// Storage for document records and their reading checkpoints.
pub trait Registry {
    /// Active documents ordered by title, optionally restricted to `topic`.
    fn list_active(&self, topic: Option<&str>) -> Result<Vec<DocumentRecord>>;

    /// Every record, active or not, ordered by title.
    fn list_all(&self) -> Result<Vec<DocumentRecord>>;

    /// Stored checkpoint of a document.
    fn get_checkpoint(&self, id: u64) -> Result<Option<String>>;

    /// Persist the name of the last chapter taken from a document.
    fn set_checkpoint(&mut self, id: u64, chapter_name: &str) -> Result<()>;

    /// Stop including a document in packets.
    fn deactivate(&mut self, id: u64) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    next_id: u64,
    documents: Vec<DocumentRecord>,
}

/// [`Registry`] persisted as a pretty-printed JSON file.
///
/// Every mutation rewrites the file through a temporary file and a rename.
/// There is no locking: only one process may use a registry file at a time.
#[derive(Debug)]
pub struct JsonRegistry {
    path: PathBuf,
    state: RegistryFile,
}

impl JsonRegistry {
    /// Load the registry at `path`. A missing file is an empty registry;
    /// it is created on the first change.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            log::debug!("No registry at {}, starting empty", path.display());
            RegistryFile::default()
        };
        Ok(Self { path, state })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a document, or reactivate it if it was removed earlier.
    ///
    /// A reactivated document keeps its checkpoint; a new topic replaces
    /// the old one.
    pub fn register(&mut self, title: &str, topic: Option<&str>) -> Result<DocumentRecord> {
        let existing = self.state.documents.iter().position(|r| r.title == title);
        let record = match existing {
            Some(i) if self.state.documents[i].active => {
                return Err(Error::DuplicateDocument(title.to_string()));
            },
            Some(i) => {
                let record = &mut self.state.documents[i];
                record.active = true;
                if topic.is_some() {
                    record.topic = topic.map(str::to_string);
                }
                log::info!("Reactivated '{}'", title);
                record.clone()
            },
            None => {
                let record = DocumentRecord {
                    id: self.state.next_id,
                    title: title.to_string(),
                    topic: topic.map(str::to_string),
                    checkpoint: None,
                    active: true,
                };
                self.state.next_id += 1;
                self.state.documents.push(record.clone());
                log::info!("Registered '{}'", title);
                record
            },
        };
        self.persist()?;
        Ok(record)
    }

    /// Record with this title, active or not.
    pub fn find_by_title(&self, title: &str) -> Option<&DocumentRecord> {
        self.state.documents.iter().find(|r| r.title == title)
    }

    fn record_mut(&mut self, id: u64) -> Result<&mut DocumentRecord> {
        self.state
            .documents
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::DocumentNotFound(format!("id {}", id)))
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, &self.state)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn sorted(mut records: Vec<DocumentRecord>) -> Vec<DocumentRecord> {
    records.sort_by(|a, b| a.title.cmp(&b.title));
    records
}

impl Registry for JsonRegistry {
    fn list_active(&self, topic: Option<&str>) -> Result<Vec<DocumentRecord>> {
        let records = self
            .state
            .documents
            .iter()
            .filter(|r| r.active)
            .filter(|r| topic.map_or(true, |t| r.topic.as_deref() == Some(t)))
            .cloned()
            .collect();
        Ok(sorted(records))
    }

    fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        Ok(sorted(self.state.documents.clone()))
    }

    fn get_checkpoint(&self, id: u64) -> Result<Option<String>> {
        self.state
            .documents
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.checkpoint.clone())
            .ok_or_else(|| Error::DocumentNotFound(format!("id {}", id)))
    }

    fn set_checkpoint(&mut self, id: u64, chapter_name: &str) -> Result<()> {
        let record = self.record_mut(id)?;
        record.checkpoint = Some(chapter_name.to_string());
        log::debug!("Checkpoint of '{}' is now '{}'", record.title, chapter_name);
        self.persist()
    }

    fn deactivate(&mut self, id: u64) -> Result<()> {
        let record = self.record_mut(id)?;
        record.active = false;
        log::info!("Deactivated '{}'", record.title);
        self.persist()
    }
}
