//! The library directory holding the PDFs packets are cut from.

use crate::error::{Error, Result};
use crate::registry::Registry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A directory of PDF files, addressed by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    dir: PathBuf,
}

impl Library {
    /// Refer to `dir` without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let library = Self::new(dir);
        std::fs::create_dir_all(&library.dir)?;
        Ok(library)
    }

    /// The library directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the document registered as `title`.
    pub fn path_of(&self, title: &str) -> PathBuf {
        self.dir.join(title)
    }

    /// PDF file names in the directory, sorted.
    pub fn files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() || !is_pdf(&entry.path()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            } else {
                log::warn!("Skipping non UTF-8 file name {:?}", entry.file_name());
            }
        }
        names.sort();
        Ok(names)
    }

    /// PDFs in the directory the registry has never seen.
    pub fn unregistered(&self, registry: &impl Registry) -> Result<Vec<String>> {
        let known: HashSet<String> = registry.list_all()?.into_iter().map(|r| r.title).collect();
        Ok(self
            .files()?
            .into_iter()
            .filter(|name| !known.contains(name))
            .collect())
    }

    /// Copy an external PDF into the library and return its title.
    pub fn import(&self, source: impl AsRef<Path>) -> Result<String> {
        let source = source.as_ref();
        let title = self.check_import(source)?;
        self.copy_in(source, &title)?;
        Ok(title)
    }

    /// Copy several external PDFs into the library, in order.
    ///
    /// Every file is checked before the first one is copied, so a bad file
    /// leaves the library untouched.
    pub fn import_all<P: AsRef<Path>>(&self, sources: &[P]) -> Result<Vec<String>> {
        let mut titles = Vec::with_capacity(sources.len());
        for source in sources {
            let title = self.check_import(source.as_ref())?;
            if titles.contains(&title) {
                return Err(Error::DuplicateDocument(title));
            }
            titles.push(title);
        }
        for (source, title) in sources.iter().zip(&titles) {
            self.copy_in(source.as_ref(), title)?;
        }
        Ok(titles)
    }

    /// Title `source` would get in the library, if it can be imported.
    fn check_import(&self, source: &Path) -> Result<String> {
        let title = source
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|_| is_pdf(source))
            .ok_or_else(|| Error::NotAPdf(source.to_path_buf()))?
            .to_string();
        if !source.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", source.display()),
            )
            .into());
        }
        if self.path_of(&title).exists() {
            return Err(Error::DuplicateDocument(title));
        }
        Ok(title)
    }

    fn copy_in(&self, source: &Path, title: &str) -> Result<()> {
        std::fs::copy(source, self.path_of(title))?;
        log::info!("Imported {} into {}", source.display(), self.dir.display());
        Ok(())
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
}
