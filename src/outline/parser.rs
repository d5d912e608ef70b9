//! Conversion of a PDF `/Outlines` tree into chapter sibling lists.

use super::{Outline, OutlineElement};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};

/// Deepest bookmark nesting that is still followed.
const MAX_OUTLINE_DEPTH: usize = 64;

/// Bound on reference chains and named-destination indirections.
const MAX_INDIRECTION: usize = 8;

/// Parse the document outline into an [`Outline`].
///
/// `page_index` maps page object ids to 0-based page numbers. A document
/// without `/Outlines` yields an empty outline, never an error.
pub(crate) fn parse_outline(doc: &Document, page_index: &HashMap<ObjectId, usize>) -> Outline {
    let page_count = page_index.len();

    let first_ref = match catalog(doc)
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|outlines| resolve(doc, outlines))
        .and_then(|outlines| outlines.as_dict().ok())
        .and_then(|outlines| reference(outlines, b"First"))
    {
        Some(first) => first,
        None => return Outline::new(Vec::new(), page_count),
    };

    let mut walker = OutlineWalker {
        doc,
        page_index,
        visited: HashSet::new(),
    };
    let root = walker.siblings(first_ref, 0);
    log::debug!("Parsed outline with {} root elements", root.len());

    Outline::new(root, page_count)
}

struct OutlineWalker<'a> {
    doc: &'a Document,
    page_index: &'a HashMap<ObjectId, usize>,
    visited: HashSet<ObjectId>,
}

impl<'a> OutlineWalker<'a> {
    /// Walk one `/First` → `/Next` chain.
    fn siblings(&mut self, first: ObjectId, depth: usize) -> Vec<OutlineElement> {
        let mut elements = Vec::new();
        if depth >= MAX_OUTLINE_DEPTH {
            log::warn!("Outline nested deeper than {} levels, truncating", MAX_OUTLINE_DEPTH);
            return elements;
        }

        let mut current = Some(first);
        while let Some(item_id) = current {
            if !self.visited.insert(item_id) {
                log::warn!("Outline item {:?} reached twice, stopping this level", item_id);
                break;
            }

            let item = match self.doc.get_dictionary(item_id) {
                Ok(dict) => dict,
                Err(e) => {
                    log::warn!("Outline item {:?} is not a dictionary: {}", item_id, e);
                    break;
                },
            };

            let title = self.title(item);
            match self.destination_page(item) {
                Some(page) => elements.push(OutlineElement::leaf(title, page)),
                None => log::debug!("Bookmark '{}' has no resolvable page", title),
            }

            if let Some(child) = reference(item, b"First") {
                let children = self.siblings(child, depth + 1);
                if !children.is_empty() {
                    elements.push(OutlineElement::Group(children));
                }
            }

            current = reference(item, b"Next");
        }

        elements
    }

    fn title(&self, item: &Dictionary) -> String {
        match item.get(b"Title").ok().and_then(|title| resolve(self.doc, title)) {
            Some(Object::String(bytes, _)) => decode_text_string(bytes).replace('\0', ""),
            _ => "(No Title)".to_string(),
        }
    }

    /// Page of an item's `/Dest`, or of the `/D` of a GoTo `/A` action.
    fn destination_page(&self, item: &Dictionary) -> Option<usize> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.resolve_destination(dest, 0);
        }

        let action = item.get(b"A").ok().and_then(|a| resolve(self.doc, a))?;
        let action = action.as_dict().ok()?;
        if let Ok(kind) = action.get(b"S").and_then(Object::as_name) {
            if kind != b"GoTo" {
                return None;
            }
        }
        self.resolve_destination(action.get(b"D").ok()?, 0)
    }

    fn resolve_destination(&self, dest: &Object, indirection: usize) -> Option<usize> {
        if indirection > MAX_INDIRECTION {
            return None;
        }

        match resolve(self.doc, dest)? {
            Object::Array(items) => match items.first()? {
                Object::Reference(page_ref) => self.page_index.get(page_ref).copied(),
                Object::Integer(page) if *page >= 0 && (*page as usize) < self.page_index.len() => {
                    Some(*page as usize)
                },
                _ => None,
            },
            Object::Dictionary(dict) => self.resolve_destination(dict.get(b"D").ok()?, indirection + 1),
            Object::String(name, _) | Object::Name(name) => {
                let target = self.named_destination(name)?;
                self.resolve_destination(target, indirection + 1)
            },
            _ => None,
        }
    }

    /// Look a named destination up in the catalog `/Dests` dictionary or the
    /// `/Names` → `/Dests` name tree.
    fn named_destination(&self, name: &[u8]) -> Option<&'a Object> {
        let catalog = catalog(self.doc)?;

        if let Some(dests) = catalog
            .get(b"Dests")
            .ok()
            .and_then(|d| resolve(self.doc, d))
            .and_then(|d| d.as_dict().ok())
        {
            if let Ok(found) = dests.get(name) {
                return Some(found);
            }
        }

        let tree = catalog
            .get(b"Names")
            .ok()
            .and_then(|n| resolve(self.doc, n))
            .and_then(|n| n.as_dict().ok())?
            .get(b"Dests")
            .ok()
            .and_then(|d| resolve(self.doc, d))
            .and_then(|d| d.as_dict().ok())?;
        self.name_tree_lookup(tree, name, 0)
    }

    fn name_tree_lookup(&self, node: &'a Dictionary, key: &[u8], depth: usize) -> Option<&'a Object> {
        if depth > MAX_OUTLINE_DEPTH {
            return None;
        }

        if let Some(names) = node
            .get(b"Names")
            .ok()
            .and_then(|n| resolve(self.doc, n))
            .and_then(|n| n.as_array().ok())
        {
            for pair in names.chunks(2) {
                if let [Object::String(candidate, _), value] = pair {
                    if candidate.as_slice() == key {
                        return Some(value);
                    }
                }
            }
        }

        let kids = node
            .get(b"Kids")
            .ok()
            .and_then(|k| resolve(self.doc, k))
            .and_then(|k| k.as_array().ok())?;
        kids.iter()
            .filter_map(|kid| resolve(self.doc, kid).and_then(|k| k.as_dict().ok()))
            .find_map(|kid| self.name_tree_lookup(kid, key, depth + 1))
    }
}

/// Follow indirect references to the object they point at.
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_INDIRECTION {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn reference(dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    dict.get(key).ok().and_then(|obj| obj.as_reference().ok())
}

fn catalog(doc: &Document) -> Option<&Dictionary> {
    let root = doc.trailer.get(b"Root").ok()?;
    resolve(doc, root)?.as_dict().ok()
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8, or one byte per char.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
