//! # pdf-weld: PDF page assembly
//!
//! pdf-weld merges, reorders, and trims PDF documents by rebuilding them
//! from scratch: source files are parsed down to their object graphs, the
//! selected pages are deep-cloned into a fresh arena with every reference
//! remapped, and the result is serialized as a clean single-section PDF.
//!
//! ## Features
//!
//! - **Merge**: concatenate any number of documents into one
//! - **Reorder**: rebuild a document from an explicit page order, including
//!   interleaving pages from several sources
//! - **Remove**: drop selected pages while keeping the rest intact
//! - **Robust reading**: classic xref tables, xref streams, object streams,
//!   hybrid-reference files, and incremental-update chains
//! - **Deduplication**: resources shared between pages (fonts, images) are
//!   cloned once, not per page
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_weld::merge;
//!
//! let a = std::fs::read("a.pdf")?;
//! let b = std::fs::read("b.pdf")?;
//! let combined = merge(&[a, b])?;
//! std::fs::write("combined.pdf", combined)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Page selections use the 1-based textual notation users type: reorder
//! tokens are two digits (document, page), removal lists are page numbers.
//!
//! ```no_run
//! use pdf_weld::{remove_pages, reorder};
//!
//! let a = std::fs::read("a.pdf")?;
//! let b = std::fs::read("b.pdf")?;
//!
//! // First two pages of each document, interleaved.
//! let interleaved = reorder(&[a.clone(), b], "11,21,12,22")?;
//!
//! // Everything except page 2.
//! let trimmed = remove_pages(&a, "2")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Reader**: lexer, parser, stream decoding, cross-reference
//!    resolution ([`core::lexer`], [`core::parser`], [`core::decode`],
//!    [`core::xref`], [`core::document`])
//! 2. **Page tree walker**: flattens /Pages hierarchies with attribute
//!    inheritance ([`core::page_tree`])
//! 3. **Assembler**: deep clone with reference remapping and memoized
//!    deduplication ([`core::assembler`])
//! 4. **Writer**: deterministic serialization with a fresh cross-reference
//!    table ([`core::writer`])
//!
//! Encrypted input is detected and refused up front rather than
//! mis-processed; malformed files surface typed errors ([`PdfError`]).

pub mod core;

pub use crate::core::{
    merge, remove_pages, reorder, Array, Assembler, Dict, Document, Object, ObjectId,
    OutputDocument, PdfError, PdfResult, PlanEntry,
};
