//! Page tree traversal.
//!
//! Flattens the catalog's /Pages tree into leaf pages in document order,
//! materializing the inheritable attributes (/Resources, /MediaBox,
//! /CropBox, /Rotate) onto each leaf so downstream code never has to walk
//! parent links.

use super::document::Document;
use super::error::{PdfError, PdfResult};
use super::object::{Dict, Object, ObjectId};
use rustc_hash::FxHashSet;

const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// A leaf page, with inherited attributes already merged into `dict`.
#[derive(Debug, Clone)]
pub struct PageNode {
    pub object_id: ObjectId,
    pub dict: Dict,
}

/// Walk the page tree and return leaves in reading order.
pub fn flatten_pages(doc: &mut Document) -> PdfResult<Vec<PageNode>> {
    let catalog = doc.catalog()?;
    let root = match catalog.get("Pages") {
        Some(Object::Reference(id)) => *id,
        None => return Err(PdfError::MissingCatalog),
        Some(other) => {
            return Err(PdfError::MalformedDocument(format!(
                "catalog /Pages must be a reference, found {:?}",
                other
            )));
        }
    };

    let mut pages = Vec::new();
    let mut visited: FxHashSet<u32> = FxHashSet::default();
    // Each frame carries the inheritable attributes gathered on the path
    // down to this node.
    let mut stack: Vec<(ObjectId, Dict)> = vec![(root, Dict::default())];

    while let Some((id, inherited)) = stack.pop() {
        if !visited.insert(id.num) {
            return Err(PdfError::CyclicPageTree(id.num));
        }

        let dict = match doc.fetch(id.num)? {
            Object::Dictionary(dict) => dict,
            other => {
                log::warn!("page tree node {} is not a dictionary ({:?})", id.num, other);
                continue;
            }
        };

        let mut merged = inherited;
        for key in INHERITABLE {
            if let Some(value) = dict.get(key) {
                merged.insert(key.to_string(), value.clone());
            }
        }

        let node_type = dict.get("Type").and_then(Object::as_name);
        let is_interior = node_type == Some("Pages") || dict.contains_key("Kids");

        if is_interior {
            let kids = match doc.resolve(dict.get("Kids").unwrap_or(&Object::Null))? {
                Object::Array(kids) => kids,
                other => {
                    log::warn!("node {} has non-array /Kids ({:?})", id.num, other);
                    continue;
                }
            };
            // Reversed so the stack pops them left to right.
            for kid in kids.iter().rev() {
                match kid.as_reference() {
                    Some(kid_id) => stack.push((kid_id, merged.clone())),
                    None => log::warn!("node {} has a direct /Kids entry; skipping", id.num),
                }
            }
        } else {
            if node_type != Some("Page") {
                log::warn!("leaf {} lacks /Type /Page", id.num);
            }
            let mut leaf = dict;
            for (key, value) in merged {
                leaf.entry(key).or_insert(value);
            }
            pages.push(PageNode {
                object_id: id,
                dict: leaf,
            });
        }
    }

    Ok(pages)
}
