//! Interactive chapter picking.
//!
//! A prompt loop over the same [`Navigator`] the automatic mode uses. Each
//! step shows the current chapter and reads one command:
//!
//! | key | command | effect                                         |
//! |-----|---------|------------------------------------------------|
//! | `b` | back    | previous chapter                               |
//! | `c` | choose  | copy the chapter into the packet, then `next`  |
//! | `d` | down    | enter the sub-chapters                         |
//! | `f` | finish  | save the packet and stop                       |
//! | `n` | next    | next chapter in this list                      |
//! | `o` | omit    | skip to the next document                      |
//! | `q` | quit    | stop without saving                            |
//! | `u` | up      | back to the enclosing chapter list             |
//!
//! Checkpoints are recorded when a chapter is chosen and written to the
//! registry only once the packet has been saved.

use crate::assembler::PacketAssembler;
use crate::config::PacketConfig;
use crate::error::{Error, Result};
use crate::generator::registry_not_updated;
use crate::library::Library;
use crate::navigator::Navigator;
use crate::policy::Resting;
use crate::registry::{DocumentRecord, Registry};
use crate::source::PdfSource;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Control options shown at every step.
pub const CONTROL_OPTIONS: &str = "CONTROL OPTIONS:
    b (back)    - previous chapter
    c (choose)  - choose to add to a paper
    d (down)    - down to inner chapters
    f (finish)  - save the paper and exit
    n (next)    - next chapter
    o (omit)    - omit this file
    q (quit)    - exit without save
    u (up)      - go to the upper chapter list
";

/// One user command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Previous chapter
    Back,
    /// Commit the current chapter
    Choose,
    /// Enter sub-chapters
    Down,
    /// Save and stop
    Finish,
    /// Next chapter
    Next,
    /// Skip the current document
    Omit,
    /// Stop without saving
    Quit,
    /// Enclosing chapter list
    Up,
}

impl Command {
    /// Parse a command from its first letter; `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let first = input.trim().chars().next()?;
        match first.to_ascii_lowercase() {
            'b' => Some(Command::Back),
            'c' => Some(Command::Choose),
            'd' => Some(Command::Down),
            'f' => Some(Command::Finish),
            'n' => Some(Command::Next),
            'o' => Some(Command::Omit),
            'q' => Some(Command::Quit),
            'u' => Some(Command::Up),
            _ => None,
        }
    }
}

/// How an interactive session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveOutcome {
    /// The packet was written here
    Saved(PathBuf),
    /// Finished without choosing anything; no file was written
    Empty,
    /// Quit; nothing was written and the registry is unchanged
    Aborted,
}

/// How the loop over one document ended.
enum DocumentExit {
    Omit,
    Finish,
    Quit,
}

/// Interactive packet builder over injected input and output streams.
pub struct InteractiveSession<R, W> {
    input: R,
    output: W,
    config: PacketConfig,
    library: Library,
    assembler: PacketAssembler,
    /// Record id → title and last chapter chosen from it
    pending: BTreeMap<u64, (String, String)>,
}

impl<R: BufRead, W: Write> InteractiveSession<R, W> {
    /// Create a session reading commands from `input` and prompting on `output`.
    pub fn new(config: PacketConfig, input: R, output: W) -> Self {
        Self {
            input,
            output,
            library: Library::new(&config.library_dir),
            config,
            assembler: PacketAssembler::new(),
            pending: BTreeMap::new(),
        }
    }

    /// Walk the active documents (optionally only `topic`) one after another.
    pub fn run(mut self, registry: &mut impl Registry, topic: Option<&str>) -> Result<InteractiveOutcome> {
        for record in registry.list_active(topic)? {
            match self.pick_from(&record)? {
                DocumentExit::Omit => continue,
                DocumentExit::Finish => break,
                DocumentExit::Quit => {
                    log::info!("Quit without saving");
                    return Ok(InteractiveOutcome::Aborted);
                },
            }
        }

        if self.assembler.pages_written() == 0 {
            writeln!(self.output, "Nothing chosen, no paper written.")?;
            return Ok(InteractiveOutcome::Empty);
        }

        let path = self.assembler.save(&self.config.output_dir)?;
        let mut pending = std::mem::take(&mut self.pending).into_iter();
        while let Some((id, (title, name))) = pending.next() {
            if let Err(e) = registry.set_checkpoint(id, &name) {
                let missed = std::iter::once((title, name))
                    .chain(pending.map(|(_, entry)| entry))
                    .map(|(title, name)| (title, Resting::Checkpoint(name)))
                    .collect();
                return Err(registry_not_updated(Some(path), missed, e));
            }
        }
        writeln!(self.output, "Paper saved to {}", path.display())?;
        Ok(InteractiveOutcome::Saved(path))
    }

    fn pick_from(&mut self, record: &DocumentRecord) -> Result<DocumentExit> {
        let source = match PdfSource::open(self.library.path_of(&record.title)) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Skipping '{}': {}", record.title, e);
                return Ok(DocumentExit::Omit);
            },
        };
        let outline = source.outline();
        let mut nav = match Navigator::new(&outline) {
            Some(nav) if !outline.is_empty() => nav,
            _ => {
                log::info!("Skipping '{}': no bookmarks", record.title);
                return Ok(DocumentExit::Omit);
            },
        };

        let resumed = record
            .checkpoint
            .as_deref()
            .map_or(false, |name| nav.locate_by_name(name));
        if resumed {
            nav.next();
        } else {
            nav.locate_first_chapter();
        }

        loop {
            self.show(&record.title, &nav)?;
            let command = match self.read_line()? {
                Some(line) => Command::parse(&line),
                None => Some(Command::Quit),
            };

            match command {
                None => writeln!(self.output, "Unknown option.")?,
                Some(Command::Back) => self.report_move(nav.back().advanced(), "No previous chapter.")?,
                Some(Command::Next) => {
                    self.report_move(nav.next().advanced(), "No further chapter in this list.")?
                },
                Some(Command::Down) => self.report_move(nav.down().advanced(), "No inner chapters.")?,
                Some(Command::Up) => self.report_move(nav.up().advanced(), "Already at the top level.")?,
                Some(Command::Choose) => {
                    if self.choose(record, &source, &nav)? {
                        nav.next();
                    }
                },
                Some(Command::Omit) => return Ok(DocumentExit::Omit),
                Some(Command::Finish) => return Ok(DocumentExit::Finish),
                Some(Command::Quit) => return Ok(DocumentExit::Quit),
            }
        }
    }

    /// Commit the current chapter. False when nothing could be committed.
    fn choose(&mut self, record: &DocumentRecord, source: &PdfSource, nav: &Navigator<'_>) -> Result<bool> {
        let (name, start_page) = match nav.current_chapter() {
            Ok(chapter) => chapter,
            Err(Error::NotAChapter) => {
                writeln!(self.output, "This is a section list, not a chapter.")?;
                return Ok(false);
            },
            Err(e) => return Err(e),
        };
        let span = match nav.chapter_pages() {
            Ok(span) => span,
            Err(e @ Error::CorruptOutline { .. }) => {
                writeln!(self.output, "Cannot take this chapter: {}", e)?;
                return Ok(false);
            },
            Err(e) => return Err(e),
        };

        self.assembler.commit(source, start_page, span)?;
        self.pending.insert(record.id, (record.title.clone(), name.to_string()));
        log::debug!("'{}': chose '{}' ({} pages)", record.title, name, span);
        Ok(true)
    }

    fn report_move(&mut self, moved: bool, notice: &str) -> Result<()> {
        if !moved {
            writeln!(self.output, "{}", notice)?;
        }
        Ok(())
    }

    fn show(&mut self, title: &str, nav: &Navigator<'_>) -> Result<()> {
        let top = nav.current();
        writeln!(self.output)?;
        writeln!(self.output, "Book: {}", title)?;
        match top.leaf() {
            Some((name, _)) => {
                writeln!(self.output, "[{}] Chapter: {}", top.depth, name)?;
                match nav.chapter_pages() {
                    Ok(span) => writeln!(self.output, "Number of pages: {}", span)?,
                    Err(e) => writeln!(self.output, "Number of pages: unknown ({})", e)?,
                }
            },
            None => writeln!(self.output, "[{}] Section list", top.depth)?,
        }
        writeln!(self.output)?;
        writeln!(self.output, "Already written: {}", self.assembler.pages_written())?;
        writeln!(self.output)?;
        write!(self.output, "{}", CONTROL_OPTIONS)?;
        write!(self.output, "Choose an option: ")?;
        self.output.flush()?;
        Ok(())
    }

    /// Next line of input, `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}
