//! The decoded PSF data model.

use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt::Display;

use indexmap::IndexMap;

/// A name or string value from the file, preserved as raw bytes.
///
/// PSF strings are not guaranteed to be UTF-8; the decoder passes their
/// bytes through unchanged. Conversion to text is lossy and happens only
/// on display.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PsfString(Vec<u8>);

impl PsfString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The string as text, with invalid UTF-8 sequences replaced.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for PsfString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for PsfString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl Borrow<[u8]> for PsfString {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<str> for PsfString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for PsfString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl Display for PsfString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

impl std::fmt::Debug for PsfString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

/// A property value attached to the header, a type, or a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Real(f64),
    Str(PsfString),
}

impl Value {
    pub fn int(&self) -> i32 {
        match self {
            Self::Int(v) => *v,
            _ => panic!("Failed to unwrap value as integer"),
        }
    }

    pub fn real(&self) -> f64 {
        match self {
            Self::Real(v) => *v,
            _ => panic!("Failed to unwrap value as real"),
        }
    }

    pub fn str(&self) -> &PsfString {
        match self {
            Self::Str(v) => v,
            _ => panic!("Failed to unwrap value as str"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "\"{v}\""),
        }
    }
}

/// An ordered name-to-value mapping.
///
/// Iteration follows insertion order. Each name occurs at most once;
/// inserting an existing name overwrites its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: IndexMap<PsfString, Value>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: PsfString, value: Value) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name.as_bytes())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PsfString, &Value)> {
        self.values.iter()
    }
}

/// Portable description of one value's on-disk shape.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalType {
    /// A full word, low byte significant.
    Int8,
    /// One big-endian word.
    Int32,
    /// An 8-byte big-endian IEEE-754 double.
    Double,
    /// Two consecutive big-endian doubles: real, then imaginary.
    ComplexDouble,
    /// Byte-packed concatenation of the fields, in declared order.
    Struct(Vec<StructField>),
}

/// One member of a struct type, carrying its own resolved shape so that
/// value decoding never needs a second dictionary lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: PsfString,
    pub ty: LogicalType,
}

impl LogicalType {
    /// The number of bytes one value of this type occupies on disk.
    pub fn size_bytes(&self) -> u32 {
        match self {
            Self::Int8 | Self::Int32 => 4,
            Self::Double => 8,
            Self::ComplexDouble => 16,
            Self::Struct(fields) => fields.iter().map(|f| f.ty.size_bytes()).sum(),
        }
    }
}

/// A type definition from the type dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub id: u32,
    pub name: PsfString,
    pub array_type: u32,
    /// The raw on-wire data type tag.
    pub data_type: u32,
    /// The resolved shape, or `None` when the on-wire category (string,
    /// array, or an unknown tag) cannot be decoded. Registering such a
    /// type is not an error; decoding a value of it is.
    pub logical: Option<LogicalType>,
    pub properties: Properties,
}

impl TypeDef {
    pub fn is_supported(&self) -> bool {
        self.logical.is_some()
    }

    pub fn size_bytes(&self) -> Option<u32> {
        self.logical.as_ref().map(LogicalType::size_bytes)
    }
}

/// The type dictionary, keyed by type id.
///
/// Populated while the type section is decoded and read-only afterwards.
/// A re-declared id overwrites the earlier definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Types {
    pub types: HashMap<u32, TypeDef>,
}

impl Types {
    pub fn get(&self, id: u32) -> Option<&TypeDef> {
        self.types.get(&id)
    }

    pub fn insert(&mut self, def: TypeDef) {
        self.types.insert(def.id, def);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A sweep or trace variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: u32,
    pub name: PsfString,
    pub type_id: u32,
    pub properties: Properties,
}

/// Which layout the value region uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    /// No sweep variable; the value region holds named scalar records.
    NoSweep,
    /// One sweep variable, one record per point per variable.
    FlatSweep,
    /// One sweep variable, values interleaved in fixed-width windows.
    WindowedSweep {
        /// Width of one per-variable slab, in bytes.
        window_bytes: u32,
    },
}

/// Everything decoded from a PSF file except the values themselves,
/// which are streamed to the sink during decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PsfFile {
    pub header: Properties,
    pub types: Types,
    pub sweeps: Vec<Variable>,
    /// Trace variables, with groups flattened in declaration order.
    pub traces: Vec<Variable>,
    pub value_mode: ValueMode,
    pub num_points: u32,
}
