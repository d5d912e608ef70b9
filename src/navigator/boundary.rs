//! Page extent of a chapter.

use super::Frame;
use crate::error::{Error, Result};
use crate::outline::OutlineElement;

/// Number of pages spanned by the chapter at `frame`.
///
/// The extent runs up to the first bound found in this order:
///
/// 1. the next chapter in the same sibling list, if it starts on a later
///    page;
/// 2. for nested chapters, the first chapter starting on a later page after
///    any enclosing frame in `frames`, searched top to bottom;
/// 3. the end of the document.
///
/// A bound that does not start on a later page falls through to the next
/// tier. A chapter that starts at or past the end of the document is
/// reported as [`Error::CorruptOutline`]; a frame on a group is
/// [`Error::NotAChapter`].
pub fn chapter_pages(frames: &[Frame<'_>], frame: &Frame<'_>, page_count: usize) -> Result<usize> {
    let (name, page) = frame.leaf().ok_or(Error::NotAChapter)?;

    if let Some((_, next_page)) = following_leaves(frame).next() {
        if next_page > page {
            return Ok(next_page - page);
        }
    }

    if frame.depth > 0 {
        let enclosing_bound = frames
            .iter()
            .rev()
            .filter(|ancestor| ancestor.depth < frame.depth)
            .flat_map(|ancestor| following_leaves(ancestor))
            .map(|(_, next_page)| next_page)
            .find(|&next_page| next_page > page);
        if let Some(next_page) = enclosing_bound {
            return Ok(next_page - page);
        }
    }

    if page_count > page {
        Ok(page_count - page)
    } else {
        Err(Error::CorruptOutline {
            chapter: name.to_string(),
            target_page: page,
            page_count,
        })
    }
}

/// Chapters after `frame` in its own sibling list.
fn following_leaves<'a>(frame: &Frame<'a>) -> impl Iterator<Item = (&'a str, usize)> {
    let siblings: &'a [OutlineElement] = frame.siblings;
    siblings[frame.index + 1..]
        .iter()
        .filter_map(OutlineElement::as_leaf)
}
