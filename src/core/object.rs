//! The PDF object model.
//!
//! A parsed document is a graph of the primitive object kinds defined in
//! ISO 32000-1 section 7.3: null, booleans, numbers, strings, names, arrays,
//! dictionaries, streams, and indirect references.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Identity of an indirect object: object number plus generation number,
/// written in files as `N G obj` and referenced as `N G R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    /// Object number.
    pub num: u32,

    /// Generation number (0 for freshly written objects).
    pub gen: u16,
}

impl ObjectId {
    #[inline]
    pub const fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

/// Dictionary payload: name keys (without the leading slash) to values.
pub type Dict = FxHashMap<String, Object>;

/// Array payload. Up to 4 elements are stored inline; MediaBox rectangles,
/// small /Kids arrays and filter lists all fit without a heap allocation.
pub type Array = SmallVec<[Box<Object>; 4]>;

/// A PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null value. Also the lenient-parsing stand-in for an unresolvable
    /// reference.
    Null,

    /// Boolean value.
    Boolean(bool),

    /// Numeric value. Integers and reals share one representation; the
    /// writer emits integers without a decimal point.
    Number(f64),

    /// Literal string, e.g. `(hello)`. Raw bytes, escapes already undone.
    String(Vec<u8>),

    /// Hexadecimal string, e.g. `<48656C6C6F>`. Kept distinct from literal
    /// strings so serialization preserves the original spelling.
    HexString(Vec<u8>),

    /// Name, e.g. `/Type`. `#xx` escapes already undone.
    Name(String),

    /// Array of values.
    Array(Array),

    /// Dictionary of name -> value.
    Dictionary(Dict),

    /// Stream: a dictionary plus a raw byte payload. The payload is kept
    /// exactly as read; filters are only applied when the engine itself
    /// needs the decoded bytes (xref streams, object streams).
    Stream { dict: Dict, data: Vec<u8> },

    /// Indirect reference, e.g. `5 0 R`.
    Reference(ObjectId),
}

impl Object {
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The number as a non-negative integer, if it is one.
    pub fn as_index(&self) -> Option<u64> {
        match self {
            Object::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Box<Object>]> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// The dictionary of a plain dictionary or of a stream.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }
}
