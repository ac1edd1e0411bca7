//! Named binary tag trees as stored in world records.
//!
//! `level.dat`, palette entries and entity records are little-endian. The
//! codec stays generic over [`ByteOrder`] so tests can pin the layout.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::NbtError;

/// Compounds nested deeper than this are treated as corrupt.
const MAX_DEPTH: usize = 512;

/// Upper bound on speculative pre-allocation for length-prefixed payloads.
const MAX_PREALLOC: usize = 4096;

pub type Compound = BTreeMap<String, Tag>;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Reads one named tag.
    pub fn read<B: ByteOrder, R: Read>(reader: &mut R) -> Result<(String, Tag), NbtError> {
        read_named::<B, R>(reader, 0)
    }

    /// Writes this tag with the given name.
    pub fn write<B: ByteOrder, W: Write>(&self, writer: &mut W, name: &str) -> Result<(), NbtError> {
        writer.write_u8(self.type_id())?;
        if !matches!(self, Tag::End) {
            write_string::<B, W>(writer, name)?;
        }
        self.write_payload::<B, W>(writer)
    }

    fn write_payload<B: ByteOrder, W: Write>(&self, writer: &mut W) -> Result<(), NbtError> {
        match self {
            Tag::End => {}
            Tag::Byte(v) => writer.write_i8(*v)?,
            Tag::Short(v) => writer.write_i16::<B>(*v)?,
            Tag::Int(v) => writer.write_i32::<B>(*v)?,
            Tag::Long(v) => writer.write_i64::<B>(*v)?,
            Tag::Float(v) => writer.write_f32::<B>(*v)?,
            Tag::Double(v) => writer.write_f64::<B>(*v)?,
            Tag::ByteArray(v) => {
                writer.write_i32::<B>(v.len() as i32)?;
                writer.write_all(v)?;
            }
            Tag::String(v) => write_string::<B, W>(writer, v)?,
            Tag::List(v) => {
                // Empty lists carry TAG_End as their element type.
                writer.write_u8(v.first().map_or(0, Tag::type_id))?;
                writer.write_i32::<B>(v.len() as i32)?;
                for tag in v {
                    tag.write_payload::<B, W>(writer)?;
                }
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    tag.write::<B, W>(writer, name)?;
                }
                writer.write_u8(0)?;
            }
            Tag::IntArray(v) => {
                writer.write_i32::<B>(v.len() as i32)?;
                for &i in v {
                    writer.write_i32::<B>(i)?;
                }
            }
            Tag::LongArray(v) => {
                writer.write_i32::<B>(v.len() as i32)?;
                for &l in v {
                    writer.write_i64::<B>(l)?;
                }
            }
        }
        Ok(())
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a child of a compound tag.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.as_compound().and_then(|map| map.get(name))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value of any integral tag, widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Tag::Byte(v) => Some(i64::from(v)),
            Tag::Short(v) => Some(i64::from(v)),
            Tag::Int(v) => Some(i64::from(v)),
            Tag::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }
}

fn read_named<B: ByteOrder, R: Read>(reader: &mut R, depth: usize) -> Result<(String, Tag), NbtError> {
    let type_id = reader.read_u8()?;
    if type_id == 0 {
        return Ok((String::new(), Tag::End));
    }
    let name = read_string::<B, R>(reader)?;
    let tag = read_payload::<B, R>(reader, type_id, depth)?;
    Ok((name, tag))
}

fn read_len<B: ByteOrder, R: Read>(reader: &mut R) -> Result<usize, NbtError> {
    let len = reader.read_i32::<B>()?;
    usize::try_from(len).map_err(|_| NbtError::NegativeLength(len))
}

fn read_string<B: ByteOrder, R: Read>(reader: &mut R) -> Result<String, NbtError> {
    let len = reader.read_u16::<B>()? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| NbtError::InvalidUtf8)
}

fn write_string<B: ByteOrder, W: Write>(writer: &mut W, s: &str) -> Result<(), NbtError> {
    writer.write_u16::<B>(s.len() as u16)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn read_payload<B: ByteOrder, R: Read>(
    reader: &mut R,
    type_id: u8,
    depth: usize,
) -> Result<Tag, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::TooDeep(MAX_DEPTH));
    }
    let tag = match type_id {
        0 => Tag::End,
        1 => Tag::Byte(reader.read_i8()?),
        2 => Tag::Short(reader.read_i16::<B>()?),
        3 => Tag::Int(reader.read_i32::<B>()?),
        4 => Tag::Long(reader.read_i64::<B>()?),
        5 => Tag::Float(reader.read_f32::<B>()?),
        6 => Tag::Double(reader.read_f64::<B>()?),
        7 => {
            let len = read_len::<B, R>(reader)?;
            let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
            reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
            if bytes.len() != len {
                return Err(NbtError::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            Tag::ByteArray(bytes)
        }
        8 => Tag::String(read_string::<B, R>(reader)?),
        9 => {
            let element = reader.read_u8()?;
            let len = read_len::<B, R>(reader)?;
            let mut list = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                list.push(read_payload::<B, R>(reader, element, depth + 1)?);
            }
            Tag::List(list)
        }
        10 => {
            let mut compound = Compound::new();
            loop {
                let (name, tag) = read_named::<B, R>(reader, depth + 1)?;
                if let Tag::End = tag {
                    break;
                }
                compound.insert(name, tag);
            }
            Tag::Compound(compound)
        }
        11 => {
            let len = read_len::<B, R>(reader)?;
            let mut ints = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                ints.push(reader.read_i32::<B>()?);
            }
            Tag::IntArray(ints)
        }
        12 => {
            let len = read_len::<B, R>(reader)?;
            let mut longs = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                longs.push(reader.read_i64::<B>()?);
            }
            Tag::LongArray(longs)
        }
        other => return Err(NbtError::UnknownTag(other)),
    };
    Ok(tag)
}

// ---------------------------------------------------------------------------
// Little-endian helpers (world records)
// ---------------------------------------------------------------------------

/// Reads one little-endian root compound from the front of `cursor`,
/// leaving the cursor just past it.
pub fn read_le_compound(cursor: &mut Cursor<&[u8]>) -> Result<(String, Compound), NbtError> {
    match Tag::read::<LittleEndian, _>(cursor)? {
        (name, Tag::Compound(map)) => Ok((name, map)),
        _ => Err(NbtError::RootNotCompound),
    }
}

/// Reads every little-endian root compound packed back to back in `bytes`.
///
/// Entity and block-entity records store one compound per object this way.
pub fn read_le_all(bytes: &[u8]) -> Result<Vec<Compound>, NbtError> {
    let mut cursor = Cursor::new(bytes);
    let mut roots = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        let (_, map) = read_le_compound(&mut cursor)?;
        roots.push(map);
    }
    Ok(roots)
}

/// Serializes a little-endian root compound.
pub fn write_le(name: &str, root: &Compound) -> Result<Vec<u8>, NbtError> {
    let mut out = Vec::new();
    Tag::Compound(root.clone()).write::<LittleEndian, _>(&mut out, name)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
