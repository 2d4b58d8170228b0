//! Error taxonomy for the assembly engine.
//!
//! Every fallible operation in the crate returns [`PdfResult`]. Errors carry
//! enough context (object id, token text, document/page index) for a caller to
//! present an actionable message without re-inspecting the input.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type PdfResult<T> = Result<T, PdfError>;

/// All error conditions the engine can surface.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The trailer or cross-reference structure could not be located, or the
    /// byte stream violates the PDF grammar in a way we do not recover from.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A cross-reference entry points past the end of the buffer.
    #[error("byte offset {offset} is past the end of the {len}-byte buffer")]
    TruncatedFile { offset: u64, len: usize },

    /// Input uses a feature the engine deliberately does not implement,
    /// e.g. encryption or a non-Flate filter on a structural stream.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// An object stream hosting a compressed object could not be decoded.
    /// Carries the id of the object that was being loaded, not the whole
    /// document: the caller decides whether that is fatal.
    #[error("corrupt object stream while loading object {num}: {reason}")]
    CorruptObjectStream { num: u32, reason: String },

    /// Page tree traversal revisited a node. Malformed files can contain
    /// cycles that would otherwise loop forever.
    #[error("page tree contains a cycle at object {0}")]
    CyclicPageTree(u32),

    /// The trailer has no /Root, the catalog is not a dictionary, or the
    /// catalog has no /Pages entry.
    #[error("document catalog or its /Pages entry is missing")]
    MissingCatalog,

    /// An assembly plan entry addresses a page that does not exist.
    /// Indices are 0-based; the facade converts from the 1-based external
    /// notation before constructing the plan.
    #[error("page index {page_index} of source document {doc_index} is out of range")]
    PageIndexOutOfRange { doc_index: usize, page_index: usize },

    /// A custom-order token was not two non-zero digits. The offending token
    /// is echoed back verbatim.
    #[error("invalid order token {0:?}")]
    InvalidOrderToken(String),

    /// Internal invariant violation in the serializer. This can only happen
    /// if assembly produced a dangling reference, which is a bug; it is not
    /// recoverable by the caller.
    #[error("serializer invariant violated: {0}")]
    Serialization(String),
}
