//! Decoder for the Cadence PSF (Parameter Storage Format) binary file
//! format, the output container written by analog-circuit simulators.
//!
//! A PSF file is a self-describing, sectioned binary container holding
//! simulation metadata, a user-defined type dictionary, sweep and trace
//! variable lists, and a value region laid out in one of three modes
//! (non-sweep records, a flat per-point layout, or interleaved fixed-width
//! windows). The decoder reads the file once, front to back, and streams
//! every dataset to a [`TypedSink`] implementation; the rest of the file
//! is returned as a [`PsfFile`].
//!
//! ```no_run
//! use psfbin::memory::MemorySink;
//!
//! let mut sink = MemorySink::new();
//! let decoded = psfbin::parse_file("input.tran", &mut sink)?;
//! println!("decoded {} point(s) in mode {:?}", decoded.num_points, decoded.value_mode);
//! for (name, dataset) in sink.datasets.iter() {
//!     println!("{name}: {} points", dataset.values.len());
//! }
//! # Ok::<(), psfbin::Error>(())
//! ```

pub mod ast;
pub mod error;
pub mod memory;
pub mod parser;
pub mod reader;
pub mod section;
pub mod sink;
mod values;


pub use ast::{PsfFile, ValueMode};
pub use error::{Error, Result};
pub use parser::parse;
pub use sink::{TypedSink, Values};

/// Reads and decodes the PSF file at `path`, streaming values into
/// `sink`.
pub fn parse_file<P, S>(path: P, sink: &mut S) -> Result<PsfFile>
where
    P: AsRef<std::path::Path>,
    S: TypedSink,
{
    let data = std::fs::read(path)?;
    parse(&data, sink)
}
