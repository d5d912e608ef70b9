//! Automatic chapter selection.
//!
//! [`AccumulationPolicy::select`] resumes after a document's checkpoint and
//! greedily takes consecutive chapters until the soft page limit is reached
//! or the document runs out:
//!
//! ```text
//! locate checkpoint ──► step past it ──► span = chapter_pages()
//!                                          │
//!            collected + span > hard? ─yes─► down() into sub-chapters, retry
//!                                          │ no (or nothing to descend into)
//!                                        commit chapter
//!                                          │
//!            collected >= soft? ──no──► find next place to read ──► loop
//!                                          │ yes
//!                          lookahead: is there anything after it?
//!                            yes → checkpoint      no → exhausted
//! ```
//!
//! The checkpoint is the name of the last chapter taken, so the next run
//! steps past it the same way this run would have.

use crate::config::PacketConfig;
use crate::error::Result;
use crate::navigator::{Navigator, Step};
use crate::outline::Outline;

/// A chapter selected for the packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRange {
    /// Bookmark name
    pub name: String,
    /// First page (0-based)
    pub start_page: usize,
    /// Number of pages
    pub page_count: usize,
}

/// Where a document stands after a selection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resting {
    /// More to read; resume after this chapter.
    Checkpoint(String),
    /// Nothing left to read.
    Exhausted,
}

/// Chapters chosen from one document by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRun {
    /// Selected chapters in reading order
    pub chapters: Vec<ChapterRange>,
    /// Sum of the chapters' page counts
    pub collected: usize,
    /// Position to persist
    pub resting: Resting,
}

impl SelectionRun {
    fn exhausted(chapters: Vec<ChapterRange>, collected: usize) -> Self {
        Self {
            chapters,
            collected,
            resting: Resting::Exhausted,
        }
    }
}

/// Soft/hard page limits for one document's share of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationPolicy {
    soft_limit: usize,
    hard_limit: usize,
    recovery_attempts: usize,
}

impl AccumulationPolicy {
    /// Create a policy with the default recovery bound of five attempts.
    pub fn new(soft_limit: usize, hard_limit: usize) -> Self {
        Self {
            soft_limit,
            hard_limit,
            recovery_attempts: 5,
        }
    }

    /// Take limits and recovery bound from a configuration.
    pub fn from_config(config: &PacketConfig) -> Self {
        Self::new(config.soft_limit, config.hard_limit).with_recovery_attempts(config.recovery_attempts)
    }

    /// Set the bound on ascend-then-advance attempts.
    pub fn with_recovery_attempts(mut self, attempts: usize) -> Self {
        self.recovery_attempts = attempts;
        self
    }

    /// Select the next run of chapters from `outline`.
    ///
    /// `checkpoint` is the name of the last chapter taken by a previous run.
    /// An unknown name restarts from the first chapter. Fails only when
    /// the bookmark data is corrupt.
    pub fn select(&self, outline: &Outline, checkpoint: Option<&str>) -> Result<SelectionRun> {
        let mut nav = match Navigator::new(outline) {
            Some(nav) => nav,
            None => return Ok(SelectionRun::exhausted(Vec::new(), 0)),
        };

        let resumed = match checkpoint {
            Some(name) if nav.locate_by_name(name) => {
                log::debug!("Resuming after checkpoint '{}'", name);
                true
            },
            Some(name) => {
                log::warn!("Checkpoint '{}' not found, starting from the first chapter", name);
                false
            },
            None => false,
        };

        if !resumed && !nav.locate_first_chapter() {
            return Ok(SelectionRun::exhausted(Vec::new(), 0));
        }
        if resumed && !self.find_next_place_to_read(&mut nav)?.advanced() {
            log::info!("Nothing left to read after '{}'", checkpoint.unwrap_or_default());
            return Ok(SelectionRun::exhausted(Vec::new(), 0));
        }

        let mut chapters = Vec::new();
        let mut collected = 0;
        loop {
            let span = nav.chapter_pages()?;
            if collected + span > self.hard_limit && self.descend(&mut nav).advanced() {
                log::debug!("{} pages would pass the hard limit, taking sub-chapters instead", span);
                continue;
            }

            let (name, start_page) = nav.current_chapter()?;
            log::debug!("Taking '{}' (pages {}..{})", name, start_page, start_page + span);
            chapters.push(ChapterRange {
                name: name.to_string(),
                start_page,
                page_count: span,
            });
            collected += span;

            if collected >= self.soft_limit {
                break;
            }
            if !self.find_next_place_to_read(&mut nav)?.advanced() {
                log::info!("Reached the end of the document with {} pages", collected);
                return Ok(SelectionRun::exhausted(chapters, collected));
            }
        }

        // Only checkpoint a chapter the next run can step past.
        let (last, _) = nav.current_chapter()?;
        let mut lookahead = nav.clone();
        let resting = if self.find_next_place_to_read(&mut lookahead)?.advanced() {
            Resting::Checkpoint(last.to_string())
        } else {
            log::info!("'{}' was the last chapter", last);
            Resting::Exhausted
        };

        Ok(SelectionRun {
            chapters,
            collected,
            resting,
        })
    }

    /// Move into the sub-chapters of the current chapter, landing on a chapter.
    fn descend(&self, nav: &mut Navigator<'_>) -> Step {
        let mark = nav.frames().len();
        if !nav.down().advanced() {
            return Step::Stayed;
        }
        if nav.current().element().is_leaf() || nav.next().advanced() {
            return Step::Advanced;
        }
        nav.truncate(mark);
        Step::Stayed
    }

    /// Advance to the chapter after the current one, climbing out of
    /// exhausted sub-lists at most `recovery_attempts` times.
    ///
    /// A chapter whose extent reaches the end of the document has nothing
    /// after it, whatever the outline says.
    fn find_next_place_to_read(&self, nav: &mut Navigator<'_>) -> Result<Step> {
        let page_count = nav.outline().page_count();

        for attempt in 1..=self.recovery_attempts {
            let top = nav.current();
            if let Some((name, page)) = top.leaf() {
                if page + nav.chapter_pages()? >= page_count {
                    log::debug!("'{}' runs to the end of the document", name);
                    return Ok(Step::Stayed);
                }
            }

            if nav.next().advanced() {
                return Ok(Step::Advanced);
            }
            if top.depth == 0 {
                return Ok(Step::Stayed);
            }

            log::debug!("Attempt {}: no chapter left at depth {}, ascending", attempt, top.depth);
            nav.up();
        }

        log::debug!("No chapter found within {} attempts", self.recovery_attempts);
        Ok(Step::Stayed)
    }
}
