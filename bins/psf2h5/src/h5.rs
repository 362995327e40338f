//! HDF5 implementation of the decoder's typed sink.
//!
//! Scalar logical types map to native HDF5 datasets; complex values map
//! to a two-field compound type. Properties become scalar attributes.
//! Composite (struct) traces are not supported by this writer.

use std::path::Path;

use hdf5::types::VarLenUnicode;
use hdf5::H5Type;
use thiserror::Error as ThisError;

use psfbin::ast::{LogicalType, PsfString, Value};
use psfbin::error::{Error, Result};
use psfbin::sink::{TypedSink, Values};

/// On-file layout for complex samples.
#[derive(H5Type, Clone, Copy, Debug)]
#[repr(C)]
struct H5Complex {
    re: f64,
    im: f64,
}

#[derive(Debug, Copy, Clone, ThisError)]
#[error("composite datasets are not supported by the HDF5 writer")]
struct CompositeUnsupported;

/// Streams datasets into an HDF5 file.
pub struct Hdf5Sink {
    file: hdf5::File,
}

/// One open HDF5 dataset plus the shape used to translate slabs.
pub struct Hdf5Dataset {
    dataset: hdf5::Dataset,
    ty: LogicalType,
}

impl Hdf5Sink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = hdf5::File::create(path).map_err(Error::sink)?;
        Ok(Self { file })
    }
}

impl TypedSink for Hdf5Sink {
    type Handle = Hdf5Dataset;

    fn create_dataset(
        &mut self,
        name: &PsfString,
        ty: &LogicalType,
        len: u32,
    ) -> Result<Hdf5Dataset> {
        // HDF5 object names are text; this is the presentation boundary
        // where raw PSF name bytes become (lossy) UTF-8.
        let name = name.to_string_lossy();
        let name = name.as_ref();
        let shape = len as usize;
        let dataset = match ty {
            LogicalType::Int8 => self.file.new_dataset::<i8>().shape(shape).create(name),
            LogicalType::Int32 => self.file.new_dataset::<i32>().shape(shape).create(name),
            LogicalType::Double => self.file.new_dataset::<f64>().shape(shape).create(name),
            LogicalType::ComplexDouble => {
                self.file.new_dataset::<H5Complex>().shape(shape).create(name)
            }
            LogicalType::Struct(_) => return Err(Error::sink(CompositeUnsupported)),
        }
        .map_err(Error::sink)?;
        Ok(Hdf5Dataset {
            dataset,
            ty: ty.clone(),
        })
    }

    fn write_slab(
        &mut self,
        handle: &mut Hdf5Dataset,
        start: u32,
        count: u32,
        bytes: &[u8],
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let mut column = Values::new(&handle.ty);
        column.extend_from_disk(bytes, count)?;

        let range = start as usize..(start + count) as usize;
        match column {
            Values::Int8(v) => handle.dataset.write_slice(&v, range),
            Values::Int32(v) => handle.dataset.write_slice(&v, range),
            Values::Real(v) => handle.dataset.write_slice(&v, range),
            Values::Complex(v) => {
                let v: Vec<H5Complex> = v
                    .into_iter()
                    .map(|z| H5Complex { re: z.re, im: z.im })
                    .collect();
                handle.dataset.write_slice(&v, range)
            }
            Values::Struct(_) => return Err(Error::sink(CompositeUnsupported)),
        }
        .map_err(Error::sink)
    }

    fn attach_property(
        &mut self,
        handle: &mut Hdf5Dataset,
        name: &PsfString,
        value: &Value,
    ) -> Result<()> {
        let name = name.to_string_lossy();
        let name = name.as_ref();
        let dataset = &handle.dataset;
        match value {
            Value::Int(v) => dataset
                .new_attr::<i32>()
                .create(name)
                .and_then(|attr| attr.write_scalar(v)),
            Value::Real(v) => dataset
                .new_attr::<f64>()
                .create(name)
                .and_then(|attr| attr.write_scalar(v)),
            Value::Str(v) => {
                let v: VarLenUnicode = v.to_string_lossy().parse().map_err(Error::sink)?;
                dataset
                    .new_attr::<VarLenUnicode>()
                    .create(name)
                    .and_then(|attr| attr.write_scalar(&v))
            }
        }
        .map_err(Error::sink)
    }

    fn close_dataset(&mut self, handle: Hdf5Dataset) -> Result<()> {
        drop(handle);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.file.flush().map_err(Error::sink)
    }
}
