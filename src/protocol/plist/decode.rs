//! Binary plist parsing.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::Value;

/// Errors that can occur during plist decoding
#[derive(Debug, Error)]
pub enum PlistDecodeError {
    /// Body does not start with the `bplist00` magic
    #[error("invalid magic: expected 'bplist00'")]
    InvalidMagic,

    /// Body ends before the structure it promises
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall {
        /// Bytes the structure requires
        needed: usize,
        /// Bytes actually present
        have: usize,
    },

    /// Trailer fields are inconsistent with the body
    #[error("invalid trailer")]
    InvalidTrailer,

    /// Unknown object type marker
    #[error("invalid object marker: 0x{0:02x}")]
    InvalidObjectMarker(u8),

    /// Object offset or index points outside the body
    #[error("invalid offset: {0}")]
    InvalidOffset(u64),

    /// String bytes are not valid UTF-8/UTF-16
    #[error("string is not valid unicode")]
    InvalidString,

    /// Object kind this codec does not handle (e.g. keyed-archiver UIDs)
    #[error("unsupported object type: {0}")]
    UnsupportedType(&'static str),

    /// An object graph that references itself
    #[error("circular reference detected")]
    CircularReference,

    /// Integer wider than 64 bits
    #[error("integer overflow")]
    IntegerOverflow,
}

/// Decode binary plist data into a [`Value`].
///
/// # Errors
///
/// Returns [`PlistDecodeError`] for anything that is not a well-formed
/// `bplist00` document built from the supported object kinds.
pub fn decode(data: &[u8]) -> Result<Value, PlistDecodeError> {
    if data.len() < 8 || &data[0..8] != b"bplist00" {
        return Err(PlistDecodeError::InvalidMagic);
    }

    let trailer = Trailer::parse(data)?;
    let decoder = Decoder::new(data, &trailer)?;

    decoder.decode_object(trailer.root_index, &mut HashSet::new())
}

/// Last 32 bytes of the document
struct Trailer {
    offset_size: u8,
    object_ref_size: u8,
    num_objects: u64,
    root_index: u64,
    offset_table_offset: u64,
}

impl Trailer {
    fn parse(data: &[u8]) -> Result<Self, PlistDecodeError> {
        if data.len() < 40 {
            // magic + at least one object + trailer
            return Err(PlistDecodeError::BufferTooSmall {
                needed: 40,
                have: data.len(),
            });
        }

        let trailer = &data[data.len() - 32..];
        Ok(Self {
            offset_size: trailer[6],
            object_ref_size: trailer[7],
            num_objects: u64::from_be_bytes(trailer[8..16].try_into().unwrap()),
            root_index: u64::from_be_bytes(trailer[16..24].try_into().unwrap()),
            offset_table_offset: u64::from_be_bytes(trailer[24..32].try_into().unwrap()),
        })
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    offset_table: Vec<u64>,
    object_ref_size: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], trailer: &Trailer) -> Result<Self, PlistDecodeError> {
        let start = usize::try_from(trailer.offset_table_offset)
            .map_err(|_| PlistDecodeError::InvalidTrailer)?;
        let entry_size = trailer.offset_size as usize;
        let count =
            usize::try_from(trailer.num_objects).map_err(|_| PlistDecodeError::InvalidTrailer)?;

        if !matches!(entry_size, 1 | 2 | 4 | 8) {
            return Err(PlistDecodeError::InvalidTrailer);
        }
        let table_len = count
            .checked_mul(entry_size)
            .ok_or(PlistDecodeError::InvalidTrailer)?;
        if start.checked_add(table_len).is_none_or(|end| end > data.len()) {
            return Err(PlistDecodeError::BufferTooSmall {
                needed: start.saturating_add(table_len),
                have: data.len(),
            });
        }

        let mut offset_table = Vec::with_capacity(count);
        for i in 0..count {
            let entry = &data[start + i * entry_size..start + (i + 1) * entry_size];
            offset_table.push(read_sized_int(entry, entry_size)?);
        }

        Ok(Self {
            data,
            offset_table,
            object_ref_size: trailer.object_ref_size as usize,
        })
    }

    fn decode_object(
        &self,
        index: u64,
        seen: &mut HashSet<u64>,
    ) -> Result<Value, PlistDecodeError> {
        if !seen.insert(index) {
            return Err(PlistDecodeError::CircularReference);
        }

        let idx = usize::try_from(index).map_err(|_| PlistDecodeError::InvalidOffset(index))?;
        let offset = *self
            .offset_table
            .get(idx)
            .ok_or(PlistDecodeError::InvalidOffset(index))?;
        let pos = usize::try_from(offset).map_err(|_| PlistDecodeError::InvalidOffset(offset))?;
        if pos >= self.data.len() {
            return Err(PlistDecodeError::InvalidOffset(offset));
        }

        let marker = self.data[pos];
        let value = self.decode_value(marker, pos + 1, seen)?;

        seen.remove(&index);
        Ok(value)
    }

    fn decode_value(
        &self,
        marker: u8,
        pos: usize,
        seen: &mut HashSet<u64>,
    ) -> Result<Value, PlistDecodeError> {
        let kind = marker >> 4;
        let nibble = marker & 0x0F;

        match kind {
            0x0 => match nibble {
                0x0 | 0xF => Ok(Value::Data(Vec::new())),
                0x8 => Ok(Value::Boolean(false)),
                0x9 => Ok(Value::Boolean(true)),
                _ => Err(PlistDecodeError::InvalidObjectMarker(marker)),
            },
            0x1 => self.decode_integer(pos, nibble),
            0x2 => self.decode_real(pos, nibble),
            // Absolute dates are a float in disguise (seconds since the
            // Apple epoch); surface them as plain reals.
            0x3 => self.decode_real(pos, 3),
            0x4 => self.decode_data(pos, nibble),
            0x5 => self.decode_ascii_string(pos, nibble),
            0x6 => self.decode_utf16_string(pos, nibble),
            0x8 => Err(PlistDecodeError::UnsupportedType("uid")),
            0xA => self.decode_array(pos, nibble, seen),
            0xD => self.decode_dictionary(pos, nibble, seen),
            _ => Err(PlistDecodeError::InvalidObjectMarker(marker)),
        }
    }

    fn take(&self, pos: usize, len: usize) -> Result<&'a [u8], PlistDecodeError> {
        let end = pos.checked_add(len).ok_or(PlistDecodeError::IntegerOverflow)?;
        if end > self.data.len() {
            return Err(PlistDecodeError::BufferTooSmall {
                needed: end,
                have: self.data.len(),
            });
        }
        Ok(&self.data[pos..end])
    }

    fn decode_integer(&self, pos: usize, size_exp: u8) -> Result<Value, PlistDecodeError> {
        let len = 1usize << size_exp;
        let bytes = self.take(pos, len)?;

        // Widths of 1, 2 and 4 bytes are unsigned in the format; only the
        // 8 and 16 byte forms carry a sign.
        match len {
            1 => Ok(Value::Integer(i64::from(bytes[0]))),
            2 => Ok(Value::Integer(i64::from(u16::from_be_bytes(
                bytes.try_into().unwrap(),
            )))),
            4 => Ok(Value::Integer(i64::from(u32::from_be_bytes(
                bytes.try_into().unwrap(),
            )))),
            8 => Ok(Value::Integer(i64::from_be_bytes(
                bytes.try_into().unwrap(),
            ))),
            16 => {
                // 128-bit storage is only used for values above i64::MAX.
                let wide = u128::from_be_bytes(bytes.try_into().unwrap());
                i64::try_from(wide)
                    .map(Value::Integer)
                    .map_err(|_| PlistDecodeError::IntegerOverflow)
            }
            _ => Err(PlistDecodeError::IntegerOverflow),
        }
    }

    fn decode_real(&self, pos: usize, size_exp: u8) -> Result<Value, PlistDecodeError> {
        let len = 1usize << size_exp;
        let bytes = self.take(pos, len)?;

        match len {
            4 => Ok(Value::Real(f64::from(f32::from_be_bytes(
                bytes.try_into().unwrap(),
            )))),
            8 => Ok(Value::Real(f64::from_be_bytes(bytes.try_into().unwrap()))),
            _ => Err(PlistDecodeError::UnsupportedType("real size")),
        }
    }

    /// Resolve the length of a variable-size object: the marker nibble, or
    /// a following integer object when the nibble is 0xF.
    fn decode_size(&self, pos: usize, nibble: u8) -> Result<(usize, usize), PlistDecodeError> {
        if nibble != 0xF {
            return Ok((nibble as usize, pos));
        }

        let marker = self.take(pos, 1)?[0];
        if marker >> 4 != 0x1 {
            return Err(PlistDecodeError::InvalidObjectMarker(marker));
        }
        let len = 1usize << (marker & 0x0F);
        let bytes = self.take(pos + 1, len)?;
        let size = read_sized_int(bytes, len)?;
        let size = usize::try_from(size).map_err(|_| PlistDecodeError::IntegerOverflow)?;
        Ok((size, pos + 1 + len))
    }

    fn decode_data(&self, pos: usize, nibble: u8) -> Result<Value, PlistDecodeError> {
        let (len, start) = self.decode_size(pos, nibble)?;
        Ok(Value::Data(self.take(start, len)?.to_vec()))
    }

    fn decode_ascii_string(&self, pos: usize, nibble: u8) -> Result<Value, PlistDecodeError> {
        let (len, start) = self.decode_size(pos, nibble)?;
        let s = std::str::from_utf8(self.take(start, len)?)
            .map_err(|_| PlistDecodeError::InvalidString)?;
        Ok(Value::String(s.to_string()))
    }

    fn decode_utf16_string(&self, pos: usize, nibble: u8) -> Result<Value, PlistDecodeError> {
        let (len, start) = self.decode_size(pos, nibble)?;
        let byte_len = len
            .checked_mul(2)
            .ok_or(PlistDecodeError::IntegerOverflow)?;
        let units: Vec<u16> = self
            .take(start, byte_len)?
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes(c.try_into().unwrap()))
            .collect();
        let s = String::from_utf16(&units).map_err(|_| PlistDecodeError::InvalidString)?;
        Ok(Value::String(s))
    }

    fn object_ref(&self, pos: usize) -> Result<u64, PlistDecodeError> {
        let bytes = self.take(pos, self.object_ref_size)?;
        read_sized_int(bytes, self.object_ref_size)
    }

    fn decode_array(
        &self,
        pos: usize,
        nibble: u8,
        seen: &mut HashSet<u64>,
    ) -> Result<Value, PlistDecodeError> {
        let (count, refs_start) = self.decode_size(pos, nibble)?;

        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            let index = self.object_ref(refs_start + i * self.object_ref_size)?;
            items.push(self.decode_object(index, seen)?);
        }
        Ok(Value::Array(items))
    }

    fn decode_dictionary(
        &self,
        pos: usize,
        nibble: u8,
        seen: &mut HashSet<u64>,
    ) -> Result<Value, PlistDecodeError> {
        let (count, refs_start) = self.decode_size(pos, nibble)?;

        let mut map = HashMap::with_capacity(count);
        for i in 0..count {
            let key_index = self.object_ref(refs_start + i * self.object_ref_size)?;
            let val_index = self.object_ref(refs_start + (count + i) * self.object_ref_size)?;

            let Value::String(key) = self.decode_object(key_index, seen)? else {
                return Err(PlistDecodeError::UnsupportedType("non-string dictionary key"));
            };
            let value = self.decode_object(val_index, seen)?;
            map.insert(key, value);
        }
        Ok(Value::Dictionary(map))
    }
}

fn read_sized_int(bytes: &[u8], size: usize) -> Result<u64, PlistDecodeError> {
    match size {
        1 => Ok(u64::from(bytes[0])),
        2 => Ok(u64::from(u16::from_be_bytes(bytes[..2].try_into().unwrap()))),
        4 => Ok(u64::from(u32::from_be_bytes(bytes[..4].try_into().unwrap()))),
        8 => Ok(u64::from_be_bytes(bytes[..8].try_into().unwrap())),
        _ => Err(PlistDecodeError::InvalidTrailer),
    }
}
