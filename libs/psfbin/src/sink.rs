//! The typed-sink contract between the decoder and the output layer.

use num::complex::Complex64;

use crate::ast::{LogicalType, PsfString, Value};
use crate::error::Result;
use crate::reader::Reader;

/// Receives named, typed datasets and their attributes as the value
/// region is decoded.
///
/// Dataset creation order equals the order variables appear in the sweep
/// list followed by the trace list. Within a dataset, slab offsets are
/// monotonically increasing and cover the full length exactly once on a
/// successful decode. A closed dataset is never reopened.
pub trait TypedSink {
    /// Per-dataset state, owned by the sink.
    type Handle;

    /// Creates a dataset of exactly `len` points.
    fn create_dataset(&mut self, name: &PsfString, ty: &LogicalType, len: u32)
        -> Result<Self::Handle>;

    /// Writes `count` points starting at point offset `start`.
    ///
    /// `bytes` holds the on-disk (big-endian) encoding of exactly `count`
    /// values; the sink owns the translation to its output encoding.
    fn write_slab(
        &mut self,
        handle: &mut Self::Handle,
        start: u32,
        count: u32,
        bytes: &[u8],
    ) -> Result<()>;

    /// Attaches one named scalar attribute to a dataset.
    fn attach_property(
        &mut self,
        handle: &mut Self::Handle,
        name: &PsfString,
        value: &Value,
    ) -> Result<()>;

    /// Releases a dataset. No further writes will target it.
    fn close_dataset(&mut self, handle: Self::Handle) -> Result<()>;

    /// Called once after the value region has been fully decoded.
    fn finish(&mut self) -> Result<()>;
}

/// Host-order column storage for one dataset.
///
/// This is the portable typed representation sinks translate slabs into:
/// one vector per scalar shape, and one child column per field for
/// structs.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Int8(Vec<i8>),
    Int32(Vec<i32>),
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
    /// One `(field name, column)` pair per struct field, all columns of
    /// equal length.
    Struct(Vec<(PsfString, Values)>),
}

impl Values {
    /// An empty column of the given shape.
    pub fn new(ty: &LogicalType) -> Self {
        match ty {
            LogicalType::Int8 => Self::Int8(Vec::new()),
            LogicalType::Int32 => Self::Int32(Vec::new()),
            LogicalType::Double => Self::Real(Vec::new()),
            LogicalType::ComplexDouble => Self::Complex(Vec::new()),
            LogicalType::Struct(fields) => Self::Struct(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), Self::new(&f.ty)))
                    .collect(),
            ),
        }
    }

    /// Decodes `count` on-disk points from `bytes` and appends them.
    pub fn extend_from_disk(&mut self, bytes: &[u8], count: u32) -> Result<()> {
        let mut r = Reader::new(bytes);
        for _ in 0..count {
            self.push_point(&mut r)?;
        }
        Ok(())
    }

    fn push_point(&mut self, r: &mut Reader) -> Result<()> {
        match self {
            Self::Int8(v) => v.push(r.read_i8()?),
            Self::Int32(v) => v.push(r.read_i32()?),
            Self::Real(v) => v.push(r.read_f64()?),
            Self::Complex(v) => {
                let re = r.read_f64()?;
                let im = r.read_f64()?;
                v.push(Complex64::new(re, im));
            }
            Self::Struct(fields) => {
                for (_, column) in fields.iter_mut() {
                    column.push_point(r)?;
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int8(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Real(v) => v.len(),
            Self::Complex(v) => v.len(),
            Self::Struct(fields) => fields.first().map(|(_, v)| v.len()).unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn int8(&self) -> &Vec<i8> {
        match self {
            Self::Int8(v) => v,
            _ => panic!("not an int8 value column"),
        }
    }

    pub fn int32(&self) -> &Vec<i32> {
        match self {
            Self::Int32(v) => v,
            _ => panic!("not an int32 value column"),
        }
    }

    pub fn real(&self) -> &Vec<f64> {
        match self {
            Self::Real(v) => v,
            _ => panic!("not a real value column"),
        }
    }

    pub fn complex(&self) -> &Vec<Complex64> {
        match self {
            Self::Complex(v) => v,
            _ => panic!("not a complex value column"),
        }
    }

    /// The named field column of a struct dataset.
    pub fn field(&self, name: &str) -> &Values {
        match self {
            Self::Struct(fields) => fields
                .iter()
                .find(|(n, _)| n.as_bytes() == name.as_bytes())
                .map(|(_, v)| v)
                .unwrap_or_else(|| panic!("no struct field named `{name}`")),
            _ => panic!("not a struct value column"),
        }
    }

    pub fn unwrap_real(self) -> Vec<f64> {
        match self {
            Self::Real(v) => v,
            _ => panic!("not a real value column"),
        }
    }

    pub fn unwrap_complex(self) -> Vec<Complex64> {
        match self {
            Self::Complex(v) => v,
            _ => panic!("not a complex value column"),
        }
    }
}
