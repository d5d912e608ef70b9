//! Traversal of an outline's chapter tree.
//!
//! The traversal position is an explicit stack of [`Frame`]s instead of
//! parent pointers in the tree:
//!
//! ```text
//! Outline (immutable, owned by the document session)
//!     ↓ borrowed
//! Navigator { frames: [ (0, root, 0), (1, group, 0), (1, group, 1) ] }
//!                        bottom                       top = current chapter
//! ```
//!
//! [`Navigator::next`] pushes a frame for the following chapter rather than
//! replacing the top, so [`Navigator::back`] is a pop. [`Navigator::up`]
//! pops until an enclosing level is exposed.

mod boundary;

use crate::error::{Error, Result};
use crate::outline::{Outline, OutlineElement};

pub use boundary::chapter_pages;

/// One level of traversal position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Number of groups crossed from the root
    pub depth: usize,
    /// Sibling list this frame points into
    pub siblings: &'a [OutlineElement],
    /// Position in `siblings`; always in bounds
    pub index: usize,
}

impl<'a> Frame<'a> {
    /// The element this frame points at.
    pub fn element(&self) -> &'a OutlineElement {
        &self.siblings[self.index]
    }

    /// Name and target page when the frame points at a chapter.
    pub fn leaf(&self) -> Option<(&'a str, usize)> {
        self.element().as_leaf()
    }
}

/// Whether a navigation operation moved the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The stack changed
    Advanced,
    /// Nothing to move to; the stack is unchanged
    Stayed,
}

impl Step {
    /// True for [`Step::Advanced`].
    pub fn advanced(self) -> bool {
        self == Step::Advanced
    }
}

/// Chapter-tree cursor over a borrowed [`Outline`].
///
/// The stack is never empty; its bottom frame is depth 0 in the root list.
#[derive(Debug, Clone)]
pub struct Navigator<'a> {
    outline: &'a Outline,
    frames: Vec<Frame<'a>>,
}

impl<'a> Navigator<'a> {
    /// Start at the first element of the root list.
    ///
    /// Returns `None` for an outline with an empty root list.
    pub fn new(outline: &'a Outline) -> Option<Self> {
        if outline.root().is_empty() {
            return None;
        }
        Some(Self {
            outline,
            frames: vec![Frame {
                depth: 0,
                siblings: outline.root(),
                index: 0,
            }],
        })
    }

    /// The outline being walked.
    pub fn outline(&self) -> &'a Outline {
        self.outline
    }

    /// Top of the stack: the current position.
    pub fn current(&self) -> Frame<'a> {
        // new() pushes the root frame and pops always leave one frame
        self.frames[self.frames.len() - 1]
    }

    /// All frames, bottom first.
    pub fn frames(&self) -> &[Frame<'a>] {
        &self.frames
    }

    /// Name and target page of the current chapter.
    pub fn current_chapter(&self) -> Result<(&'a str, usize)> {
        self.current().leaf().ok_or(Error::NotAChapter)
    }

    /// Pages spanned by the current chapter.
    pub fn chapter_pages(&self) -> Result<usize> {
        chapter_pages(&self.frames, &self.current(), self.outline.page_count())
    }

    /// Return to the previous chapter, skipping group frames.
    pub fn back(&mut self) -> Step {
        if self.frames.len() <= 1 {
            return Step::Stayed;
        }
        self.frames.pop();
        while self.frames.len() > 1 && !self.current().element().is_leaf() {
            self.frames.pop();
        }
        Step::Advanced
    }

    /// Enter the sub-chapters of the current chapter.
    ///
    /// Sub-chapters are the group directly following the current element.
    pub fn down(&mut self) -> Step {
        let top = self.current();
        let next = match top.siblings.get(top.index + 1) {
            Some(OutlineElement::Group(children)) if !children.is_empty() => children,
            _ => return Step::Stayed,
        };
        self.frames.push(Frame {
            depth: top.depth + 1,
            siblings: next,
            index: 0,
        });
        Step::Advanced
    }

    /// Ascend to the nearest frame of an enclosing level.
    pub fn up(&mut self) -> Step {
        let reference_depth = self.current().depth;
        let before = self.frames.len();
        while self.frames.len() > 1 {
            if self.current().depth < reference_depth {
                break;
            }
            self.frames.pop();
        }
        if self.frames.len() == before {
            Step::Stayed
        } else {
            Step::Advanced
        }
    }

    /// Move to the next chapter in the current sibling list.
    pub fn next(&mut self) -> Step {
        let top = self.current();
        let found = top
            .siblings
            .iter()
            .enumerate()
            .skip(top.index + 1)
            .find(|(_, element)| element.is_leaf());

        match found {
            Some((index, _)) => {
                self.frames.push(Frame {
                    depth: top.depth,
                    siblings: top.siblings,
                    index,
                });
                Step::Advanced
            },
            None => Step::Stayed,
        }
    }

    /// Position on the chapter named `chapter_name`, searching depth-first
    /// from the root.
    ///
    /// On success the stack holds the search path; on failure it is left
    /// exactly as it was before the call.
    pub fn locate_by_name(&mut self, chapter_name: &str) -> bool {
        self.locate(|name| name == chapter_name)
    }

    /// Position on the first chapter of the tree in depth-first order.
    pub fn locate_first_chapter(&mut self) -> bool {
        self.locate(|_| true)
    }

    fn locate(&mut self, mut is_target: impl FnMut(&str) -> bool) -> bool {
        let outline = self.outline;
        let saved = std::mem::take(&mut self.frames);
        if self.search(0, outline.root(), &mut is_target) {
            true
        } else {
            self.frames = saved;
            false
        }
    }

    /// Push a trial frame per sibling; on failure undo everything pushed at
    /// this level.
    fn search(
        &mut self,
        depth: usize,
        siblings: &'a [OutlineElement],
        is_target: &mut impl FnMut(&str) -> bool,
    ) -> bool {
        let mark = self.frames.len();
        for (index, element) in siblings.iter().enumerate() {
            self.frames.push(Frame {
                depth,
                siblings,
                index,
            });
            let found = match element {
                OutlineElement::Leaf { name, .. } => is_target(name),
                OutlineElement::Group(children) => self.search(depth + 1, children, is_target),
            };
            if found {
                return true;
            }
        }
        self.frames.truncate(mark);
        false
    }

    /// Drop frames above `len`, keeping at least the bottom frame.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.frames.truncate(len.max(1));
    }
}
