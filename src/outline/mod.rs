//! Document outline (bookmarks) as a chapter tree.
//!
//! A PDF outline is a tree of titled bookmarks. For chapter selection it is
//! flattened into sibling lists where a bookmark's children follow it as a
//! [`OutlineElement::Group`]:
//!
//! ```text
//! [ Leaf("1 Intro", 0), Leaf("2 Basics", 4), Group[ Leaf("2.1", 5), Leaf("2.2", 9) ], Leaf("3", 14) ]
//! ```
//!
//! Leaves are the selectable chapters; groups only carry nested chapters.

mod parser;

pub(crate) use parser::parse_outline;

/// One element of a sibling list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineElement {
    /// A named bookmark pointing at a page (0-based).
    Leaf {
        /// Bookmark title, the durable identity used for checkpoints
        name: String,
        /// Page the bookmark points at
        target_page: usize,
    },

    /// Nested chapters of the leaf that precedes this group.
    Group(Vec<OutlineElement>),
}

impl OutlineElement {
    /// Build a leaf.
    pub fn leaf(name: impl Into<String>, target_page: usize) -> Self {
        OutlineElement::Leaf {
            name: name.into(),
            target_page,
        }
    }

    /// Build a group.
    pub fn group(children: Vec<OutlineElement>) -> Self {
        OutlineElement::Group(children)
    }

    /// Whether this element is a selectable chapter.
    pub fn is_leaf(&self) -> bool {
        matches!(self, OutlineElement::Leaf { .. })
    }

    /// Name and target page, if this is a leaf.
    pub fn as_leaf(&self) -> Option<(&str, usize)> {
        match self {
            OutlineElement::Leaf { name, target_page } => Some((name.as_str(), *target_page)),
            OutlineElement::Group(_) => None,
        }
    }

    /// Children, if this is a group.
    pub fn children(&self) -> Option<&[OutlineElement]> {
        match self {
            OutlineElement::Group(children) => Some(children),
            OutlineElement::Leaf { .. } => None,
        }
    }
}

/// Immutable chapter tree of one opened document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    root: Vec<OutlineElement>,
    page_count: usize,
}

impl Outline {
    /// Create an outline from its root sibling list and the document's page count.
    pub fn new(root: Vec<OutlineElement>, page_count: usize) -> Self {
        Self { root, page_count }
    }

    /// Root sibling list.
    pub fn root(&self) -> &[OutlineElement] {
        &self.root
    }

    /// Total pages of the document this outline belongs to.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// True when the tree holds no chapter at all, in which case the
    /// document has nothing to select.
    pub fn is_empty(&self) -> bool {
        fn has_leaf(elements: &[OutlineElement]) -> bool {
            elements.iter().any(|element| match element {
                OutlineElement::Leaf { .. } => true,
                OutlineElement::Group(children) => has_leaf(children),
            })
        }
        !has_leaf(&self.root)
    }

    /// Number of chapters in the whole tree.
    pub fn chapter_count(&self) -> usize {
        fn count(elements: &[OutlineElement]) -> usize {
            elements
                .iter()
                .map(|element| match element {
                    OutlineElement::Leaf { .. } => 1,
                    OutlineElement::Group(children) => count(children),
                })
                .sum()
        }
        count(&self.root)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{Outline, OutlineElement};
    use proptest::prelude::*;

    /// Nested outlines with chapters named `c0`, `c1`, ... whose target
    /// pages strictly increase in reading order. The document ends a few
    /// pages after the last chapter starts.
    pub(crate) fn arb_paged_outline() -> impl Strategy<Value = Outline> {
        let shape = Just(OutlineElement::leaf("", 0)).prop_recursive(4, 32, 4, |inner| {
            prop::collection::vec(inner, 1..4).prop_map(OutlineElement::Group)
        });
        (prop::collection::vec(shape, 1..6), prop::collection::vec(1usize..12, 16), 1usize..12)
            .prop_map(|(mut root, gaps, tail)| {
                let mut numbered = 0;
                let mut next_page = 0;
                let mut last_page = 0;
                assign(&mut root, &gaps, &mut numbered, &mut next_page, &mut last_page);
                Outline::new(root, last_page + tail)
            })
    }

    fn assign(
        elements: &mut [OutlineElement],
        gaps: &[usize],
        numbered: &mut usize,
        next_page: &mut usize,
        last_page: &mut usize,
    ) {
        for element in elements {
            match element {
                OutlineElement::Leaf { name, target_page } => {
                    *name = format!("c{}", numbered);
                    *target_page = *next_page;
                    *last_page = *next_page;
                    *next_page += gaps[*numbered % gaps.len()];
                    *numbered += 1;
                },
                OutlineElement::Group(children) => {
                    assign(children, gaps, numbered, next_page, last_page)
                },
            }
        }
    }
}
