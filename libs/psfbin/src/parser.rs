//! Section decoders and the top-level driver.

use tracing::{debug, span, Level};

use crate::ast::{
    LogicalType, Properties, PsfFile, StructField, TypeDef, Types, Value, ValueMode, Variable,
};
use crate::error::{Error, Result};
use crate::reader::{Reader, WORD_SIZE};
use crate::section::{self, IndexFormat};
use crate::sink::TypedSink;

/// Decodes `data` as a binary PSF file, streaming values into `sink`.
///
/// The returned [`PsfFile`] carries everything except the values, which
/// have already been delivered to the sink when this returns.
pub fn parse<S: TypedSink>(data: &[u8], sink: &mut S) -> Result<PsfFile> {
    PsfParser {
        reader: Reader::new(data),
        sink,
    }
    .parse()
}

pub(crate) struct PsfParser<'a, 's, S> {
    pub(crate) reader: Reader<'a>,
    pub(crate) sink: &'s mut S,
}

impl<S: TypedSink> PsfParser<'_, '_, S> {
    fn parse(&mut self) -> Result<PsfFile> {
        // File magic; its value is not interpreted.
        self.reader.read_u32()?;

        let header = self.parse_header()?;

        let mut types = Types::default();
        let mut sweeps = Vec::new();
        let mut traces = Vec::new();

        let mut marker = self.next_marker();
        if marker == Some(section::TYPE_START) {
            types = self.parse_types()?;
            marker = self.next_marker();
        }
        if marker == Some(section::SWEEP_START) {
            sweeps = self.parse_sweeps()?;
            marker = self.next_marker();
        }
        if marker == Some(section::TRACE_START) {
            traces = self.parse_traces()?;
            marker = self.next_marker();
        }

        if sweeps.len() > 1 {
            return Err(Error::MultipleSweeps {
                count: sweeps.len(),
            });
        }

        let (value_mode, num_points) = match marker {
            // A file may end before any value section only when no sweep
            // was declared; a swept file without one is truncated.
            None if sweeps.is_empty() => (ValueMode::NoSweep, 0),
            None => {
                return Err(Error::MissingValueSection {
                    offset: self.reader.offset(),
                })
            }
            Some(section::VALUE_START) => {
                let _guard = span!(Level::DEBUG, "values").entered();
                if let Some(sweep) = sweeps.first() {
                    let num_points = match header.get("PSF sweep points") {
                        Some(Value::Int(n)) => *n as u32,
                        _ => return Err(Error::MissingSweepPoints),
                    };
                    let window = match header.get("PSF window size") {
                        Some(Value::Int(w)) if *w > 0 => Some(*w as u32),
                        _ => None,
                    };

                    let sweep_size = resolve_type(&types, sweep)?.size_bytes();
                    for trace in &traces {
                        let size = resolve_type(&types, trace)?.size_bytes();
                        if window.is_some() && size != sweep_size {
                            return Err(Error::TypeSizeMismatch {
                                variable: trace.name.to_string(),
                                expected: sweep_size,
                                found: size,
                            });
                        }
                    }

                    match window {
                        Some(window_bytes) => {
                            self.parse_windowed_values(
                                window_bytes,
                                num_points,
                                sweep,
                                &traces,
                                &types,
                            )?;
                            (ValueMode::WindowedSweep { window_bytes }, num_points)
                        }
                        None => {
                            self.parse_flat_values(num_points, sweep, &traces, &types)?;
                            (ValueMode::FlatSweep, num_points)
                        }
                    }
                } else {
                    self.parse_nosweep_values(&types)?;
                    (ValueMode::NoSweep, 0)
                }
            }
            Some(found) => {
                return Err(Error::BadTag {
                    found,
                    offset: self.reader.offset() - WORD_SIZE,
                })
            }
        };

        self.sink.finish()?;

        Ok(PsfFile {
            header,
            types,
            sweeps,
            traces,
            value_mode,
            num_points,
        })
    }

    /// Reads the next top-level section marker, or `None` at end of file.
    fn next_marker(&mut self) -> Option<u32> {
        if self.reader.remaining() < WORD_SIZE {
            return None;
        }
        self.reader.read_u32().ok()
    }

    fn parse_header(&mut self) -> Result<Properties> {
        let _guard = span!(Level::DEBUG, "header").entered();
        let sec = section::read_preamble(&mut self.reader, section::MAJOR_SECTION_CODE)?;
        let props = read_properties(&mut self.reader)?;
        section::check_end(&mut self.reader, sec)?;
        Ok(props)
    }

    fn parse_types(&mut self) -> Result<Types> {
        let _guard = span!(Level::DEBUG, "types").entered();
        let sec = section::read_preamble(&mut self.reader, section::MAJOR_SECTION_CODE)?;
        let sub = section::read_preamble(&mut self.reader, section::MINOR_SECTION_CODE)?;

        let mut types = Types::default();
        while self.reader.offset() < sub.end_pos && self.reader.try_tag(section::ELEMENT_CODE)? {
            read_type_def(&mut self.reader, &mut types)?;
        }

        section::read_index(&mut self.reader, IndexFormat::TwoWord)?;
        section::check_end(&mut self.reader, sec)?;
        Ok(types)
    }

    fn parse_sweeps(&mut self) -> Result<Vec<Variable>> {
        let _guard = span!(Level::DEBUG, "sweeps").entered();
        let sec = section::read_preamble(&mut self.reader, section::MAJOR_SECTION_CODE)?;

        let mut vars = Vec::new();
        while self.reader.try_tag(section::ELEMENT_CODE)? {
            vars.push(read_variable(&mut self.reader)?);
        }

        section::check_end(&mut self.reader, sec)?;
        Ok(vars)
    }

    /// Trace entries are either bare variables or groups; groups are
    /// flattened into the output list and their identity discarded.
    fn parse_traces(&mut self) -> Result<Vec<Variable>> {
        let _guard = span!(Level::DEBUG, "traces").entered();
        let sec = section::read_preamble(&mut self.reader, section::MAJOR_SECTION_CODE)?;
        let sub = section::read_preamble(&mut self.reader, section::MINOR_SECTION_CODE)?;

        let mut vars = Vec::new();
        while self.reader.offset() < sub.end_pos {
            if self.reader.try_tag(section::GROUP_CODE)? {
                read_group_into(&mut self.reader, &mut vars)?;
            } else if self.reader.try_tag(section::ELEMENT_CODE)? {
                vars.push(read_variable(&mut self.reader)?);
            } else {
                break;
            }
        }

        section::read_index(&mut self.reader, IndexFormat::FourWord)?;
        section::check_end(&mut self.reader, sec)?;
        Ok(vars)
    }
}

/// Resolves a variable's type to its logical shape, failing if the id is
/// undefined or the type cannot be decoded.
pub(crate) fn resolve_type<'t>(types: &'t Types, var: &Variable) -> Result<&'t LogicalType> {
    let def = types.get(var.type_id).ok_or_else(|| Error::UnknownTypeId {
        variable: var.name.to_string_lossy().into_owned(),
        type_id: var.type_id,
    })?;
    def.logical.as_ref().ok_or_else(|| Error::UnsupportedType {
        variable: var.name.to_string_lossy().into_owned(),
        type_name: def.name.to_string_lossy().into_owned(),
        data_type: def.data_type,
    })
}

/// Decodes property entries until a non-property tag is peeked, leaving
/// the stream positioned just before that tag. A repeated name overwrites
/// the earlier entry.
pub(crate) fn read_properties(r: &mut Reader) -> Result<Properties> {
    let mut props = Properties::new();
    while r.remaining() >= WORD_SIZE {
        let (name, value) = match r.peek_u32()? {
            section::PROP_STRING_CODE => {
                r.skip(WORD_SIZE)?;
                let name = r.read_string()?;
                (name, Value::Str(r.read_string()?))
            }
            section::PROP_INT_CODE => {
                r.skip(WORD_SIZE)?;
                let name = r.read_string()?;
                (name, Value::Int(r.read_i32()?))
            }
            section::PROP_REAL_CODE => {
                r.skip(WORD_SIZE)?;
                let name = r.read_string()?;
                (name, Value::Real(r.read_f64()?))
            }
            // Entry boundary; the tag stays unread.
            _ => break,
        };
        debug!(name = %name, value = %value, "property");
        props.insert(name, value);
    }
    Ok(props)
}

/// Decodes one type definition body (its leading tag already consumed)
/// and registers it in the dictionary. Returns the registered id.
fn read_type_def(r: &mut Reader, types: &mut Types) -> Result<u32> {
    let id = r.read_u32()?;
    let name = r.read_string()?;
    let array_type = r.read_u32()?;
    let data_type = r.read_u32()?;
    debug!(id, name = %name, array_type, data_type, "type definition");

    let logical = match data_type {
        1 => Some(LogicalType::Int8),
        5 => Some(LogicalType::Int32),
        11 => Some(LogicalType::Double),
        12 => Some(LogicalType::ComplexDouble),
        16 => read_struct_fields(r, types)?,
        // Strings, arrays, and unknown tags are registered but cannot be
        // decoded.
        _ => None,
    };

    let properties = read_properties(r)?;
    types.insert(TypeDef {
        id,
        name,
        array_type,
        data_type,
        logical,
        properties,
    });
    Ok(id)
}

/// Decodes a struct's subtype list. Each member is a full type definition
/// prefixed by the tuple tag; members are registered in the dictionary
/// under their own ids and simultaneously snapshotted as struct fields.
/// One undecodable member makes the whole struct undecodable.
fn read_struct_fields(r: &mut Reader, types: &mut Types) -> Result<Option<LogicalType>> {
    let mut fields = Vec::new();
    let mut supported = true;
    while r.try_tag(section::TUPLE_CODE)? {
        // Each member is a complete type entry, leading tag included.
        let offset = r.offset();
        let found = r.read_u32()?;
        if found != section::ELEMENT_CODE {
            return Err(Error::BadSectionCode {
                expected: section::ELEMENT_CODE,
                found,
                offset,
            });
        }
        let id = read_type_def(r, types)?;
        let member = types.get(id).expect("member type was just registered");
        match &member.logical {
            Some(ty) => fields.push(StructField {
                name: member.name.clone(),
                ty: ty.clone(),
            }),
            None => supported = false,
        }
    }
    Ok(supported.then_some(LogicalType::Struct(fields)))
}

/// Decodes one variable body (its leading tag already consumed).
fn read_variable(r: &mut Reader) -> Result<Variable> {
    let id = r.read_u32()?;
    let name = r.read_string()?;
    let type_id = r.read_u32()?;
    debug!(id, name = %name, type_id, "variable");
    let properties = read_properties(r)?;
    Ok(Variable {
        id,
        name,
        type_id,
        properties,
    })
}

/// Decodes a group body (its leading tag already consumed), flattening
/// its members into `out`. The declared length is authoritative.
fn read_group_into(r: &mut Reader, out: &mut Vec<Variable>) -> Result<()> {
    let id = r.read_u32()?;
    let name = r.read_string()?;
    let len = r.read_u32()?;
    debug!(id, name = %name, len, "group");
    for i in 0..len {
        if !r.try_tag(section::ELEMENT_CODE)? {
            return Err(Error::MalformedGroup {
                group: name.to_string_lossy().into_owned(),
                expected: len,
                found: i,
            });
        }
        out.push(read_variable(r)?);
    }
    Ok(())
}
