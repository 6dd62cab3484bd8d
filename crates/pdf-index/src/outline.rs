//! Builds the bookmark tree from numbered target titles and writes it into
//! the document catalog.

use crate::error::IndexError;
use itertools::Itertools;
use log::{debug, warn};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

pub const ROOT_TITLE: &str = "Contents";

/// An `/XYZ` destination. `page_index` is 0-based; coordinates are points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destination {
    pub page_index: usize,
    pub left: f64,
    pub top: f64,
}

impl Destination {
    pub fn to_pdf(&self, page_id: ObjectId) -> Vec<Object> {
        vec![
            Object::Reference(page_id),
            "XYZ".into(),
            Object::Real(self.left as f32),
            Object::Real(self.top as f32),
            Object::Integer(0),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub title: String,
    pub levels: Vec<u32>,
    pub destination: Destination,
}

impl OutlineEntry {
    /// Returns `None` when the title carries no numbering.
    pub fn from_title(title: &str, destination: Destination) -> Option<Self> {
        let levels = parse_numbering(title);
        (!levels.is_empty()).then(|| Self {
            title: title.to_string(),
            levels,
            destination,
        })
    }
}

/// Reads the leading dotted-integer prefix of a title.
///
/// "1.2.3 Introduction" gives `[1, 2, 3]`, "1. Intro" gives `[1]` and
/// "Introduction" gives `[]`. A component too large for `u32` empties the
/// whole result.
pub fn parse_numbering(title: &str) -> Vec<u32> {
    let mut levels = Vec::new();
    let mut rest = title;
    loop {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            break;
        }
        match rest[..digits].parse::<u32>() {
            Ok(level) => levels.push(level),
            Err(_) => return Vec::new(),
        }
        rest = &rest[digits..];
        match rest.strip_prefix('.') {
            Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
            _ => break,
        }
    }
    levels
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineNode {
    pub title: String,
    pub destination: Option<Destination>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Arena of outline nodes. Node 0 is the "Contents" root.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineTree {
    nodes: Vec<OutlineNode>,
}

impl OutlineTree {
    pub const ROOT: usize = 0;

    fn new(root_destination: Option<Destination>) -> Self {
        Self {
            nodes: vec![OutlineNode {
                title: ROOT_TITLE.to_string(),
                destination: root_destination,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn node(&self, id: usize) -> &OutlineNode {
        &self.nodes[id]
    }

    pub fn root(&self) -> &OutlineNode {
        self.node(Self::ROOT)
    }

    pub fn children(&self, id: usize) -> impl Iterator<Item = &OutlineNode> {
        self.nodes[id].children.iter().map(|&c| &self.nodes[c])
    }

    /// Number of nodes below the root.
    pub fn entry_count(&self) -> usize {
        self.nodes.len() - 1
    }

    fn push_child(&mut self, parent: usize, entry: OutlineEntry) -> usize {
        let id = self.push_node(parent, entry);
        self.nodes[parent].children.push(id);
        id
    }

    fn push_sibling_after(&mut self, sibling: usize, entry: OutlineEntry) -> usize {
        let parent = self.nodes[sibling].parent.unwrap_or(Self::ROOT);
        let id = self.push_node(parent, entry);
        let children = &mut self.nodes[parent].children;
        let position = children
            .iter()
            .position(|&c| c == sibling)
            .map_or(children.len(), |p| p + 1);
        children.insert(position, id);
        id
    }

    fn push_node(&mut self, parent: usize, entry: OutlineEntry) -> usize {
        self.nodes.push(OutlineNode {
            title: entry.title,
            destination: Some(entry.destination),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }
}

/// Arranges numbered entries into a tree.
///
/// Entries are deduplicated by title (first wins) and stable-sorted by their
/// numbering, a prefix sorting before its children. `stack[d]` holds the node
/// most recently placed at depth `d`; placing a node at depth `d` truncates
/// the stack to `d + 1`. Returns `None` if no entry made it into the tree.
pub fn build(
    entries: Vec<OutlineEntry>,
    toc_destination: Option<Destination>,
    page_count: usize,
) -> Option<OutlineTree> {
    let mut entries: Vec<OutlineEntry> = entries
        .into_iter()
        .unique_by(|e| e.title.clone())
        .collect();
    entries.sort_by(|a, b| a.levels.cmp(&b.levels));

    let root_destination = toc_destination.filter(|d| {
        let valid = d.page_index < page_count;
        if !valid {
            warn!(
                "[INDEX] TOC page {} is outside the document ({} pages); outline root has no destination.",
                d.page_index, page_count
            );
        }
        valid
    });

    let mut tree = OutlineTree::new(root_destination);
    let mut stack: Vec<Option<usize>> = vec![Some(OutlineTree::ROOT)];

    for entry in entries {
        let depth = entry.levels.len();
        if depth == 0 {
            continue;
        }
        if entry.destination.page_index >= page_count {
            warn!(
                "[INDEX] Outline entry '{}' points at page {} of {}; skipped.",
                entry.title,
                entry.destination.page_index + 1,
                page_count
            );
            continue;
        }

        let parent = stack
            .get(depth - 1)
            .copied()
            .flatten()
            .unwrap_or(OutlineTree::ROOT);
        let node = match stack.get(depth).copied().flatten() {
            Some(previous) => tree.push_sibling_after(previous, entry),
            None => tree.push_child(parent, entry),
        };

        if stack.len() <= depth {
            stack.resize(depth + 1, None);
        }
        stack[depth] = Some(node);
        stack.truncate(depth + 1);
    }

    (tree.entry_count() > 0).then_some(tree)
}

/// Encodes a title as a PDF text string.
pub fn pdf_text(title: &str) -> Object {
    if title.is_ascii() {
        Object::String(title.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(title.encode_utf16().flat_map(u16::to_be_bytes));
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Attaches `tree` to the catalog's `/Outlines`, after any existing items.
///
/// The root item is open; every item below it is closed.
pub fn write_outline(
    doc: &mut Document,
    tree: &OutlineTree,
    page_ids: &[ObjectId],
) -> Result<ObjectId, IndexError> {
    let ids: Vec<ObjectId> = (0..tree.nodes.len()).map(|_| doc.new_object_id()).collect();
    let root_item = ids[OutlineTree::ROOT];

    let existing = doc
        .catalog()?
        .get(b"Outlines")
        .and_then(Object::as_reference)
        .ok();

    let (outlines_id, previous_last) = match existing {
        Some(outlines_id) => {
            let outlines = doc.get_object_mut(outlines_id)?.as_dict_mut()?;
            let previous_last = outlines.get(b"Last").and_then(Object::as_reference).ok();
            let count = outlines.get(b"Count").and_then(Object::as_i64).unwrap_or(0).abs();
            outlines.set("Count", count + 1 + tree.root().children.len() as i64);
            outlines.set("Last", Object::Reference(root_item));
            if previous_last.is_none() {
                outlines.set("First", Object::Reference(root_item));
            }
            if let Some(last_id) = previous_last {
                doc.get_object_mut(last_id)?
                    .as_dict_mut()?
                    .set("Next", Object::Reference(root_item));
            }
            debug!("[INDEX] Appending outline after existing items.");
            (outlines_id, previous_last)
        }
        None => {
            let outlines_id = doc.add_object(dictionary! {
                "Type" => "Outlines",
                "First" => Object::Reference(root_item),
                "Last" => Object::Reference(root_item),
                "Count" => 1 + tree.root().children.len() as i64,
            });
            (outlines_id, None)
        }
    };

    let mut root_dict = item_dict(tree, OutlineTree::ROOT, &ids, page_ids);
    root_dict.set("Parent", Object::Reference(outlines_id));
    if let Some(prev) = previous_last {
        root_dict.set("Prev", Object::Reference(prev));
    }
    // Open: a positive count of the visible children.
    root_dict.set("Count", tree.root().children.len() as i64);
    doc.objects.insert(root_item, root_dict.into());
    write_children(doc, tree, OutlineTree::ROOT, &ids, page_ids);

    let catalog = doc.catalog_mut()?;
    catalog.set("Outlines", Object::Reference(outlines_id));
    catalog.set("PageMode", "UseOutlines");
    Ok(outlines_id)
}

fn item_dict(tree: &OutlineTree, node: usize, ids: &[ObjectId], page_ids: &[ObjectId]) -> Dictionary {
    let item = tree.node(node);
    let mut dict = dictionary! { "Title" => pdf_text(&item.title) };
    if let Some(dest) = &item.destination {
        if let Some(&page_id) = page_ids.get(dest.page_index) {
            dict.set("Dest", dest.to_pdf(page_id));
        }
    }
    if let (Some(first), Some(last)) = (item.children.first(), item.children.last()) {
        dict.set("First", Object::Reference(ids[*first]));
        dict.set("Last", Object::Reference(ids[*last]));
        dict.set("Count", -(item.children.len() as i64));
    }
    dict
}

fn write_children(
    doc: &mut Document,
    tree: &OutlineTree,
    parent: usize,
    ids: &[ObjectId],
    page_ids: &[ObjectId],
) {
    let children = &tree.node(parent).children;
    for (i, &child) in children.iter().enumerate() {
        let mut dict = item_dict(tree, child, ids, page_ids);
        dict.set("Parent", Object::Reference(ids[parent]));
        if i > 0 {
            dict.set("Prev", Object::Reference(ids[children[i - 1]]));
        }
        if let Some(&next) = children.get(i + 1) {
            dict.set("Next", Object::Reference(ids[next]));
        }
        doc.objects.insert(ids[child], dict.into());
        write_children(doc, tree, child, ids, page_ids);
    }
}
