//! Document assembly.
//!
//! Builds a brand-new object arena from an ordered list of (document, page)
//! selections. Every selected page is deep-cloned together with the objects
//! it transitively references; references are remapped to dense output
//! numbers and a memo keeps shared objects (fonts, images) deduplicated
//! within each source document.

use super::document::Document;
use super::error::{PdfError, PdfResult};
use super::object::{Array, Dict, Object, ObjectId};
use super::page_tree::{flatten_pages, PageNode};
use rustc_hash::FxHashMap;

/// Output object numbers reserved for the synthesized skeleton.
const CATALOG_NUM: u32 = 1;
const PAGES_NUM: u32 = 2;

/// Guard against reference chains long enough to blow the stack. Real page
/// graphs are a few levels deep.
const MAX_CLONE_DEPTH: usize = 512;

/// One selected page: which open document, which page (0-based, reading
/// order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    pub doc_index: usize,
    pub page_index: usize,
}

/// The assembled arena. `objects[i]` is object number `i + 1`; object 1 is
/// the catalog and object 2 the page tree root.
#[derive(Debug)]
pub struct OutputDocument {
    pub objects: Vec<Object>,
}

impl OutputDocument {
    pub fn page_count(&self) -> usize {
        match &self.objects[(PAGES_NUM - 1) as usize] {
            Object::Dictionary(dict) => dict
                .get("Kids")
                .and_then(Object::as_array)
                .map_or(0, |kids| kids.len()),
            _ => 0,
        }
    }
}

pub struct Assembler<'a> {
    docs: &'a mut [Document],
    // Flattened page lists, built on first use per document.
    pages: Vec<Option<Vec<PageNode>>>,
    // (source document, source object number) -> output object number.
    memo: FxHashMap<(usize, u32), u32>,
    objects: Vec<Object>,
}

impl<'a> Assembler<'a> {
    pub fn new(docs: &'a mut [Document]) -> Self {
        let doc_count = docs.len();
        Assembler {
            docs,
            pages: vec![None; doc_count],
            memo: FxHashMap::default(),
            // Slots for the catalog and page tree root, filled last.
            objects: vec![Object::Null, Object::Null],
        }
    }

    /// Number of pages in one source document, flattening its tree on first
    /// call.
    pub fn page_count(&mut self, doc_index: usize) -> PdfResult<usize> {
        Ok(self.pages_for(doc_index)?.len())
    }

    /// Clone every planned page into a fresh arena. The whole plan is
    /// validated up front so a bad selection fails before any work is done.
    pub fn assemble(mut self, plan: &[PlanEntry]) -> PdfResult<OutputDocument> {
        for entry in plan {
            if entry.doc_index >= self.docs.len() {
                return Err(PdfError::PageIndexOutOfRange {
                    doc_index: entry.doc_index,
                    page_index: entry.page_index,
                });
            }
            let count = self.page_count(entry.doc_index)?;
            if entry.page_index >= count {
                return Err(PdfError::PageIndexOutOfRange {
                    doc_index: entry.doc_index,
                    page_index: entry.page_index,
                });
            }
        }

        let mut kids = Array::new();
        for entry in plan {
            let num = self.clone_page(*entry)?;
            kids.push(Box::new(Object::Reference(ObjectId::new(num, 0))));
        }

        let mut pages_root = Dict::default();
        pages_root.insert("Type".to_string(), Object::Name("Pages".to_string()));
        pages_root.insert("Count".to_string(), Object::Number(kids.len() as f64));
        pages_root.insert("Kids".to_string(), Object::Array(kids));
        self.objects[(PAGES_NUM - 1) as usize] = Object::Dictionary(pages_root);

        let mut catalog = Dict::default();
        catalog.insert("Type".to_string(), Object::Name("Catalog".to_string()));
        catalog.insert(
            "Pages".to_string(),
            Object::Reference(ObjectId::new(PAGES_NUM, 0)),
        );
        self.objects[(CATALOG_NUM - 1) as usize] = Object::Dictionary(catalog);

        Ok(OutputDocument {
            objects: self.objects,
        })
    }

    fn pages_for(&mut self, doc_index: usize) -> PdfResult<&[PageNode]> {
        if doc_index >= self.docs.len() {
            return Err(PdfError::MalformedDocument(format!(
                "plan names document {} but only {} are open",
                doc_index,
                self.docs.len()
            )));
        }
        if self.pages[doc_index].is_none() {
            let flat = flatten_pages(&mut self.docs[doc_index])?;
            self.pages[doc_index] = Some(flat);
        }
        Ok(self.pages[doc_index].as_deref().unwrap_or(&[]))
    }

    /// Each plan entry gets its own page object, so selecting a page twice
    /// yields two independent kids. Descendants still deduplicate through
    /// the memo.
    fn clone_page(&mut self, entry: PlanEntry) -> PdfResult<u32> {
        let node = self.pages_for(entry.doc_index)?[entry.page_index].clone();
        let new_num = self.allocate();
        let mut dict = self.clone_dict(entry.doc_index, &node.dict, 0)?;
        dict.insert(
            "Parent".to_string(),
            Object::Reference(ObjectId::new(PAGES_NUM, 0)),
        );
        self.objects[(new_num - 1) as usize] = Object::Dictionary(dict);
        Ok(new_num)
    }

    fn allocate(&mut self) -> u32 {
        self.objects.push(Object::Null);
        self.objects.len() as u32
    }

    fn clone_object(
        &mut self,
        doc_index: usize,
        object: &Object,
        depth: usize,
    ) -> PdfResult<Object> {
        if depth > MAX_CLONE_DEPTH {
            return Err(PdfError::MalformedDocument(
                "object graph nested too deeply".to_string(),
            ));
        }
        match object {
            Object::Reference(id) => self.clone_reference(doc_index, *id, depth),
            Object::Array(items) => {
                let mut out = Array::with_capacity(items.len());
                for item in items {
                    out.push(Box::new(self.clone_object(doc_index, item, depth + 1)?));
                }
                Ok(Object::Array(out))
            }
            Object::Dictionary(dict) => Ok(Object::Dictionary(
                self.clone_dict(doc_index, dict, depth)?,
            )),
            Object::Stream { dict, data } => Ok(Object::Stream {
                dict: self.clone_dict(doc_index, dict, depth)?,
                data: data.clone(),
            }),
            scalar => Ok(scalar.clone()),
        }
    }

    // /Parent is dropped everywhere: cloned pages are re-parented onto the
    // synthesized root, and stale parent links would smuggle in the entire
    // source page tree.
    fn clone_dict(&mut self, doc_index: usize, dict: &Dict, depth: usize) -> PdfResult<Dict> {
        let mut out = Dict::default();
        for (key, value) in dict {
            if key == "Parent" {
                continue;
            }
            out.insert(
                key.clone(),
                self.clone_object(doc_index, value, depth + 1)?,
            );
        }
        Ok(out)
    }

    /// Memo registration happens before descending into the referenced
    /// object, so reference cycles close onto the already-allocated number
    /// instead of recursing forever.
    fn clone_reference(
        &mut self,
        doc_index: usize,
        id: ObjectId,
        depth: usize,
    ) -> PdfResult<Object> {
        if let Some(&new_num) = self.memo.get(&(doc_index, id.num)) {
            return Ok(Object::Reference(ObjectId::new(new_num, 0)));
        }
        let new_num = self.allocate();
        self.memo.insert((doc_index, id.num), new_num);
        let source = self.docs[doc_index].fetch(id.num)?;
        let cloned = self.clone_object(doc_index, &source, depth + 1)?;
        self.objects[(new_num - 1) as usize] = cloned;
        Ok(Object::Reference(ObjectId::new(new_num, 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::multi_page_pdf;

    fn open(markers: &[(&str, usize)]) -> Vec<Document> {
        markers
            .iter()
            .map(|(m, n)| Document::parse(multi_page_pdf(m, *n)).unwrap())
            .collect()
    }

    fn entry(doc_index: usize, page_index: usize) -> PlanEntry {
        PlanEntry {
            doc_index,
            page_index,
        }
    }

    #[test]
    fn test_assembles_in_plan_order() {
        let mut docs = open(&[("A", 2), ("B", 1)]);
        let plan = [entry(0, 1), entry(1, 0), entry(0, 0)];
        let out = Assembler::new(&mut docs).assemble(&plan).unwrap();

        assert_eq!(out.page_count(), 3);
        // Catalog, pages root, then cloned content in plan order.
        assert!(matches!(out.objects[0], Object::Dictionary(_)));
        let kids = match &out.objects[1] {
            Object::Dictionary(dict) => dict.get("Kids").and_then(Object::as_array).unwrap(),
            other => panic!("pages root should be a dictionary, got {:?}", other),
        };
        assert_eq!(kids.len(), 3);
    }

    #[test]
    fn test_pages_reparented_onto_output_root() {
        let mut docs = open(&[("A", 1)]);
        let out = Assembler::new(&mut docs).assemble(&[entry(0, 0)]).unwrap();

        let page = match &out.objects[2] {
            Object::Dictionary(dict) => dict,
            other => panic!("expected page dictionary, got {:?}", other),
        };
        assert_eq!(
            page.get("Parent").and_then(Object::as_reference),
            Some(ObjectId::new(PAGES_NUM, 0))
        );
    }

    #[test]
    fn test_shared_resources_deduplicated() {
        // Three pages share one font object; the output arena must hold a
        // single clone of it.
        let mut docs = open(&[("A", 3)]);
        let plan = [entry(0, 0), entry(0, 1), entry(0, 2)];
        let out = Assembler::new(&mut docs).assemble(&plan).unwrap();

        let fonts = out
            .objects
            .iter()
            .filter(|obj| {
                obj.as_dict()
                    .and_then(|d| d.get("Type"))
                    .and_then(Object::as_name)
                    == Some("Font")
            })
            .count();
        assert_eq!(fonts, 1);
        // Catalog + root + 3 pages + 3 content streams + 1 font.
        assert_eq!(out.objects.len(), 9);
    }

    #[test]
    fn test_same_object_number_from_different_docs_not_conflated() {
        let mut docs = open(&[("A", 1), ("B", 1)]);
        let plan = [entry(0, 0), entry(1, 0)];
        let out = Assembler::new(&mut docs).assemble(&plan).unwrap();

        let markers: Vec<bool> = out
            .objects
            .iter()
            .filter_map(|obj| match obj {
                Object::Stream { data, .. } => {
                    Some(String::from_utf8_lossy(data).contains("page A"))
                }
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![true, false]);
    }

    #[test]
    fn test_out_of_range_page_rejected_before_cloning() {
        let mut docs = open(&[("A", 2)]);
        let plan = [entry(0, 0), entry(0, 5)];
        match Assembler::new(&mut docs).assemble(&plan) {
            Err(PdfError::PageIndexOutOfRange {
                doc_index,
                page_index,
            }) => {
                assert_eq!((doc_index, page_index), (0, 5));
            }
            other => panic!("expected PageIndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_plan_yields_zero_pages() {
        let mut docs = open(&[("A", 1)]);
        let out = Assembler::new(&mut docs).assemble(&[]).unwrap();
        assert_eq!(out.page_count(), 0);
        assert_eq!(out.objects.len(), 2);
    }

    #[test]
    fn test_duplicate_selection_clones_page_twice() {
        let mut docs = open(&[("A", 1)]);
        let plan = [entry(0, 0), entry(0, 0)];
        let out = Assembler::new(&mut docs).assemble(&plan).unwrap();

        let pages = out
            .objects
            .iter()
            .filter(|obj| {
                obj.as_dict()
                    .and_then(|d| d.get("Type"))
                    .and_then(Object::as_name)
                    == Some("Page")
            })
            .count();
        assert_eq!(pages, 2);
    }
}
