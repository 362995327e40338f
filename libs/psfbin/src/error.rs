//! Decoder errors.

use thiserror::Error as ThisError;

/// The result type returned by PSF decoding functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Possible PSF decoding errors.
///
/// Offsets are absolute byte offsets into the input file.
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O error reading the input file.
    #[error("io error")]
    Io(#[from] std::io::Error),
    /// The file ended in the middle of a primitive read.
    #[error("unexpected end of file at offset {offset:#x}")]
    UnexpectedEof {
        /// Offset at which the short read started.
        offset: usize,
    },
    /// A section preamble carried the wrong code word.
    #[error("invalid section code {found} at offset {offset:#x}, expected {expected}")]
    BadSectionCode {
        /// The code the preamble was required to carry.
        expected: u32,
        /// The code actually read.
        found: u32,
        /// Offset of the code word.
        offset: usize,
    },
    /// A section did not end at the position its preamble declared.
    #[error("section ends at offset {found:#x}, expected end position {expected:#x}")]
    BadSectionEnd {
        /// The end position declared by the preamble.
        expected: usize,
        /// The offset actually reached.
        found: usize,
    },
    /// A top-level section marker word was not one of the known markers.
    #[error("invalid section marker {found} at offset {offset:#x}")]
    BadTag {
        /// The marker word actually read.
        found: u32,
        /// Offset of the marker word.
        offset: usize,
    },
    /// A swept file ended before the value section marker.
    #[error("file ends at offset {offset:#x} before a value section")]
    MissingValueSection {
        /// Offset at which the input ended.
        offset: usize,
    },
    /// A variable whose values must be decoded has an undecodable type.
    #[error("variable `{variable}` has unsupported type `{type_name}` (data type tag {data_type})")]
    UnsupportedType {
        /// Name of the offending variable.
        variable: String,
        /// Name of its type definition.
        type_name: String,
        /// The on-wire data type tag of that definition.
        data_type: u32,
    },
    /// A variable references a type id absent from the type dictionary.
    #[error("variable `{variable}` references undefined type id {type_id}")]
    UnknownTypeId {
        /// Name of the offending variable.
        variable: String,
        /// The unresolved type id.
        type_id: u32,
    },
    /// The sweep section declared more than one sweep variable.
    #[error("multi-dimensional sweeps are not supported: file declares {count} sweep variables")]
    MultipleSweeps {
        /// Number of sweep variables declared.
        count: usize,
    },
    /// A swept file has no `"PSF sweep points"` header property.
    #[error("swept file is missing an integer \"PSF sweep points\" header property")]
    MissingSweepPoints,
    /// In windowed mode, a trace's type size differs from the sweep's.
    #[error("windowed trace `{variable}` has type size {found}, but the sweep type has size {expected}")]
    TypeSizeMismatch {
        /// Name of the offending trace variable.
        variable: String,
        /// On-disk size of the sweep type, in bytes.
        expected: u32,
        /// On-disk size of the trace type, in bytes.
        found: u32,
    },
    /// A group declared more member variables than could be decoded.
    #[error("group `{group}` declares {expected} members, but only {found} could be decoded")]
    MalformedGroup {
        /// Name of the offending group.
        group: String,
        /// Declared member count.
        expected: u32,
        /// Members actually decoded.
        found: u32,
    },
    /// A window size word is inconsistent with the window layout.
    #[error(
        "bad window at offset {offset:#x}: size word declares {points} valid points \
         of size {size} bytes for a {window_bytes}-byte window"
    )]
    BadWindow {
        /// Offset of the window's size word.
        offset: usize,
        /// Valid-point count claimed by the size word.
        points: u32,
        /// On-disk size of one point, in bytes.
        size: u32,
        /// Window width, in bytes.
        window_bytes: u32,
    },
    /// Error reported by the output sink.
    #[error("sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wraps an output-layer error.
    pub fn sink<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self::Sink(err.into())
    }
}
