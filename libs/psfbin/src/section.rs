//! Section framing: preambles, index trailers, and end-position checks.

use tracing::debug;

use crate::error::{Error, Result};
use crate::reader::{Reader, WORD_SIZE};

/// Top-level section marker words.
pub const TYPE_START: u32 = 1;
pub const SWEEP_START: u32 = 2;
pub const TRACE_START: u32 = 3;
pub const VALUE_START: u32 = 4;

/// Section preamble codes.
pub const MAJOR_SECTION_CODE: u32 = 21;
pub const MINOR_SECTION_CODE: u32 = 22;

/// Body tags. Tag 16 marks type definitions, variables, non-sweep value
/// records, and window records; context disambiguates.
pub const ELEMENT_CODE: u32 = 16;
pub const GROUP_CODE: u32 = 17;
pub const TUPLE_CODE: u32 = 18;
pub const ZERO_PAD_CODE: u32 = 20;

/// Property entry tags.
pub const PROP_STRING_CODE: u32 = 33;
pub const PROP_INT_CODE: u32 = 34;
pub const PROP_REAL_CODE: u32 = 35;

/// The byte span of a section, as declared by its preamble.
///
/// `end_pos` is the absolute offset of the byte immediately following the
/// section's end-marker word.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub end_pos: usize,
}

/// Index-trailer entry widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// `(id, offset)` entries (type and non-sweep value sections).
    TwoWord,
    /// `(id, offset, extra, extra)` entries (trace section).
    FourWord,
}

/// Reads a section preamble, checking its code word.
pub fn read_preamble(r: &mut Reader, code: u32) -> Result<Section> {
    let offset = r.offset();
    let found = r.read_u32()?;
    if found != code {
        return Err(Error::BadSectionCode {
            expected: code,
            found,
            offset,
        });
    }
    let end_pos = r.read_u32()? as usize;
    debug!(code, end_pos, offset, "section preamble");
    Ok(Section { end_pos })
}

/// Reads and discards an index trailer.
///
/// Decoding is strictly sequential, so the offsets recorded in the index
/// are never needed.
pub fn read_index(r: &mut Reader, format: IndexFormat) -> Result<()> {
    let index_type = r.read_u32()?;
    let index_size = r.read_u32()? as usize;
    debug!(index_type, index_size, ?format, "skipping index trailer");
    r.skip(index_size)
}

/// Consumes the end-marker word and verifies the section ends exactly at
/// its declared end position.
pub fn check_end(r: &mut Reader, section: Section) -> Result<()> {
    r.read_u32()?;
    let found = r.offset();
    if found != section.end_pos {
        return Err(Error::BadSectionEnd {
            expected: section.end_pos,
            found,
        });
    }
    Ok(())
}

/// Forward-skips any residual bytes, then consumes and checks the section
/// end marker.
pub fn skip_to_end(r: &mut Reader, section: Section) -> Result<()> {
    let marker_pos = section
        .end_pos
        .checked_sub(WORD_SIZE)
        .filter(|&pos| pos >= r.offset())
        .ok_or(Error::BadSectionEnd {
            expected: section.end_pos,
            found: r.offset(),
        })?;
    r.skip(marker_pos - r.offset())?;
    check_end(r, section)
}
