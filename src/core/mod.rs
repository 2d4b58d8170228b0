//! Core PDF machinery: object model, parsing, cross-reference resolution,
//! page tree traversal, assembly, and serialization.

pub mod assembler;
pub mod decode;
pub mod document;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod object;
pub mod page_tree;
pub mod parser;
pub mod writer;
pub mod xref;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembler::{Assembler, OutputDocument, PlanEntry};
pub use document::Document;
pub use engine::{merge, remove_pages, reorder};
pub use error::{PdfError, PdfResult};
pub use lexer::{Lexer, Token};
pub use object::{Array, Dict, Object, ObjectId};
pub use page_tree::{flatten_pages, PageNode};
pub use parser::Parser;
pub use writer::serialize;
pub use xref::{Xref, XrefEntry};
