//! The three value-region decoders.
//!
//! All three read the major section preamble first. The non-sweep layout
//! holds self-describing named records; the two sweep layouts are
//! positional, with datasets created up front in sweep-then-traces order.

use tracing::{debug, trace};

use crate::ast::{Types, Variable};
use crate::error::{Error, Result};
use crate::parser::{read_properties, resolve_type, PsfParser};
use crate::section::{self, IndexFormat};
use crate::sink::TypedSink;

impl<S: TypedSink> PsfParser<'_, '_, S> {
    /// Non-sweep layout: named scalar records, each carrying its own type
    /// id and trailing properties.
    pub(crate) fn parse_nosweep_values(&mut self, types: &Types) -> Result<()> {
        let sec = section::read_preamble(&mut self.reader, section::MAJOR_SECTION_CODE)?;
        let sub = section::read_preamble(&mut self.reader, section::MINOR_SECTION_CODE)?;

        while self.reader.offset() < sub.end_pos && self.reader.try_tag(section::ELEMENT_CODE)? {
            let id = self.reader.read_u32()?;
            let name = self.reader.read_string()?;
            let type_id = self.reader.read_u32()?;
            debug!(id, name = %name, type_id, "non-sweep value");

            let def = types.get(type_id).ok_or_else(|| Error::UnknownTypeId {
                variable: name.to_string_lossy().into_owned(),
                type_id,
            })?;
            let ty = def.logical.as_ref().ok_or_else(|| Error::UnsupportedType {
                variable: name.to_string_lossy().into_owned(),
                type_name: def.name.to_string_lossy().into_owned(),
                data_type: def.data_type,
            })?;

            let bytes = self.reader.read_bytes(ty.size_bytes() as usize)?;
            let mut handle = self.sink.create_dataset(&name, ty, 1)?;
            self.sink.write_slab(&mut handle, 0, 1, bytes)?;

            let props = read_properties(&mut self.reader)?;
            for (pname, pvalue) in props.iter() {
                self.sink.attach_property(&mut handle, pname, pvalue)?;
            }
            self.sink.close_dataset(handle)?;
        }

        section::read_index(&mut self.reader, IndexFormat::TwoWord)?;
        section::check_end(&mut self.reader, sec)
    }

    /// Flat sweep layout: for each point, one record per variable in
    /// sweep-then-traces order. The per-record code and variable id words
    /// are discarded; order is positional.
    pub(crate) fn parse_flat_values(
        &mut self,
        num_points: u32,
        sweep: &Variable,
        traces: &[Variable],
        types: &Types,
    ) -> Result<()> {
        let sec = section::read_preamble(&mut self.reader, section::MAJOR_SECTION_CODE)?;
        let mut datasets = self.create_sweep_datasets(num_points, sweep, traces, types)?;

        for point in 0..num_points {
            for (handle, size) in datasets.iter_mut() {
                self.reader.read_u32()?;
                self.reader.read_u32()?;
                let bytes = self.reader.read_bytes(*size)?;
                trace!(point, "flat record");
                self.sink.write_slab(handle, point, 1, bytes)?;
            }
        }

        for (handle, _) in datasets {
            self.sink.close_dataset(handle)?;
        }
        section::skip_to_end(&mut self.reader, sec)
    }

    /// Windowed sweep layout: a zero-padding block, then windows of one
    /// fixed-width slab per variable. The low half of each window's size
    /// word is the number of valid points; the rest of every slab is
    /// padding that must still be consumed.
    pub(crate) fn parse_windowed_values(
        &mut self,
        window_bytes: u32,
        num_points: u32,
        sweep: &Variable,
        traces: &[Variable],
        types: &Types,
    ) -> Result<()> {
        let sec = section::read_preamble(&mut self.reader, section::MAJOR_SECTION_CODE)?;
        let mut datasets = self.create_sweep_datasets(num_points, sweep, traces, types)?;
        let window = window_bytes as usize;

        if num_points > 0 {
            self.skip_zero_pad()?;

            let mut points_read = 0u32;
            while points_read < num_points {
                let offset = self.read_window_code()?;
                let size_word = self.reader.read_u32()?;
                let windows_left = size_word >> 16;
                let n = size_word & 0xffff;
                debug!(windows_left, n, points_read, "window");

                let valid = datasets
                    .first()
                    .map(|(_, size)| n as usize * size)
                    .unwrap_or(0);
                if n == 0 || valid > window || points_read + n > num_points {
                    return Err(Error::BadWindow {
                        offset,
                        points: n,
                        size: datasets.first().map(|(_, size)| *size as u32).unwrap_or(0),
                        window_bytes,
                    });
                }

                for (handle, size) in datasets.iter_mut() {
                    let slab = self.reader.read_bytes(window)?;
                    self.sink
                        .write_slab(handle, points_read, n, &slab[..n as usize * *size])?;
                }
                points_read += n;
            }
        }

        for (handle, _) in datasets {
            self.sink.close_dataset(handle)?;
        }
        section::skip_to_end(&mut self.reader, sec)
    }

    /// Skips one zero-padding block. The code word is producer-specific
    /// and not validated.
    fn skip_zero_pad(&mut self) -> Result<()> {
        let code = self.reader.read_u32()?;
        let size = self.reader.read_u32()? as usize;
        debug!(code, size, "skipping zero padding");
        self.reader.skip(size)
    }

    /// Reads the next window record tag, tolerating interleaved padding
    /// blocks. Returns the offset of the consumed tag word.
    fn read_window_code(&mut self) -> Result<usize> {
        loop {
            let offset = self.reader.offset();
            let code = self.reader.read_u32()?;
            match code {
                section::ELEMENT_CODE => return Ok(offset),
                section::ZERO_PAD_CODE => {
                    let size = self.reader.read_u32()? as usize;
                    debug!(size, "skipping padding between windows");
                    self.reader.skip(size)?;
                }
                found => {
                    return Err(Error::BadSectionCode {
                        expected: section::ELEMENT_CODE,
                        found,
                        offset,
                    })
                }
            }
        }
    }

    /// Creates one dataset per variable in sweep-then-traces order,
    /// attaching each variable's properties immediately after creation.
    /// Returns handles paired with on-disk point sizes.
    fn create_sweep_datasets(
        &mut self,
        num_points: u32,
        sweep: &Variable,
        traces: &[Variable],
        types: &Types,
    ) -> Result<Vec<(S::Handle, usize)>> {
        let mut datasets = Vec::with_capacity(1 + traces.len());
        for var in std::iter::once(sweep).chain(traces) {
            let ty = resolve_type(types, var)?;
            let mut handle = self.sink.create_dataset(&var.name, ty, num_points)?;
            for (name, value) in var.properties.iter() {
                self.sink.attach_property(&mut handle, name, value)?;
            }
            datasets.push((handle, ty.size_bytes() as usize));
        }
        Ok(datasets)
    }
}
