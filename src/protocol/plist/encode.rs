//! Binary plist serialization.

use thiserror::Error;

use super::Value;

/// Errors that can occur during plist encoding
#[derive(Debug, Error)]
pub enum PlistEncodeError {
    /// Object count exceeds what a 4-byte reference can address
    #[error("too many objects: {0}")]
    TooManyObjects(usize),
}

/// Encode a [`Value`] to binary plist format.
///
/// Layout: `bplist00` magic, object table, offset table, 32-byte trailer.
/// Dictionary keys are written in sorted order so output is deterministic.
///
/// # Errors
///
/// Returns [`PlistEncodeError`] if the value tree holds more objects than a
/// reference can address. Request payloads are a handful of objects.
pub fn encode(value: &Value) -> Result<Vec<u8>, PlistEncodeError> {
    let count = count_objects(value);
    let ref_size = match count {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFFFF_FFFF => 4,
        _ => return Err(PlistEncodeError::TooManyObjects(count)),
    };

    let mut encoder = Encoder {
        objects: Vec::new(),
        offsets: Vec::new(),
        ref_size,
    };
    let root = encoder.encode_value(value);

    let mut output = Vec::with_capacity(8 + encoder.objects.len() + 32);
    output.extend_from_slice(b"bplist00");
    let objects_start = output.len();
    output.extend_from_slice(&encoder.objects);

    let offset_table_offset = output.len();
    let max_offset = objects_start + encoder.objects.len();
    let offset_size = int_width(max_offset as u64);
    for &offset in &encoder.offsets {
        write_sized_int(&mut output, (objects_start + offset) as u64, offset_size);
    }

    // Trailer: 5 unused bytes, sort version, offset size, ref size, then
    // object count, root index and offset table offset as big-endian u64.
    output.extend_from_slice(&[0u8; 5]);
    output.push(0);
    output.push(offset_size);
    output.push(encoder.ref_size);
    output.extend_from_slice(&(encoder.offsets.len() as u64).to_be_bytes());
    output.extend_from_slice(&(root as u64).to_be_bytes());
    output.extend_from_slice(&(offset_table_offset as u64).to_be_bytes());

    Ok(output)
}

fn count_objects(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(count_objects).sum::<usize>(),
        Value::Dictionary(map) => {
            1 + map.len() + map.values().map(count_objects).sum::<usize>()
        }
        _ => 1,
    }
}

struct Encoder {
    /// Concatenated object bodies
    objects: Vec<u8>,
    /// Offset of each object within `objects`
    offsets: Vec<usize>,
    /// Bytes per object reference
    ref_size: u8,
}

impl Encoder {
    fn encode_value(&mut self, value: &Value) -> usize {
        // Containers encode their children first so the references are
        // known when the container body is written.
        let body = match value {
            Value::Array(items) => {
                let refs: Vec<usize> = items.iter().map(|v| self.encode_value(v)).collect();
                let mut body = Vec::new();
                write_header(&mut body, 0xA, refs.len());
                for r in refs {
                    self.write_ref(&mut body, r);
                }
                Some(body)
            }
            Value::Dictionary(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();

                let key_refs: Vec<usize> = keys
                    .iter()
                    .map(|k| self.encode_value(&Value::String((*k).clone())))
                    .collect();
                let val_refs: Vec<usize> =
                    keys.iter().map(|k| self.encode_value(&map[*k])).collect();

                let mut body = Vec::new();
                write_header(&mut body, 0xD, keys.len());
                for r in key_refs {
                    self.write_ref(&mut body, r);
                }
                for r in val_refs {
                    self.write_ref(&mut body, r);
                }
                Some(body)
            }
            _ => None,
        };

        self.offsets.push(self.objects.len());
        let index = self.offsets.len() - 1;

        if let Some(body) = body {
            self.objects.extend_from_slice(&body);
        } else {
            match value {
                Value::Boolean(b) => self.objects.push(if *b { 0x09 } else { 0x08 }),
                Value::Integer(i) => self.encode_integer(*i),
                Value::Real(f) => {
                    self.objects.push(0x23);
                    self.objects.extend_from_slice(&f.to_be_bytes());
                }
                Value::String(s) => self.encode_string(s),
                Value::Data(d) => {
                    write_header(&mut self.objects, 0x4, d.len());
                    self.objects.extend_from_slice(d);
                }
                Value::Array(_) | Value::Dictionary(_) => unreachable!(),
            }
        }

        index
    }

    fn encode_integer(&mut self, value: i64) {
        if value < 0 {
            // Negative integers are always 8 bytes in bplist.
            self.objects.push(0x13);
            self.objects.extend_from_slice(&value.to_be_bytes());
        } else if value <= i64::from(u8::MAX) {
            self.objects.push(0x10);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            self.objects.push(value as u8);
        } else if value <= i64::from(u16::MAX) {
            self.objects.push(0x11);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            self.objects.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value <= i64::from(u32::MAX) {
            self.objects.push(0x12);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            self.objects.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.objects.push(0x13);
            self.objects.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn encode_string(&mut self, value: &str) {
        if value.is_ascii() {
            write_header(&mut self.objects, 0x5, value.len());
            self.objects.extend_from_slice(value.as_bytes());
        } else {
            // UTF-16 BE, length counted in code units
            let units: Vec<u16> = value.encode_utf16().collect();
            write_header(&mut self.objects, 0x6, units.len());
            for unit in units {
                self.objects.extend_from_slice(&unit.to_be_bytes());
            }
        }
    }

    fn write_ref(&self, output: &mut Vec<u8>, index: usize) {
        write_sized_int(output, index as u64, self.ref_size);
    }
}

/// Marker byte: object kind in the high nibble, length in the low nibble,
/// with 0xF escaping to a following integer object for long lengths.
fn write_header(output: &mut Vec<u8>, kind: u8, len: usize) {
    if len < 15 {
        #[allow(clippy::cast_possible_truncation)]
        output.push((kind << 4) | len as u8);
    } else {
        output.push((kind << 4) | 0xF);
        let len = len as u64;
        let width = int_width(len);
        // Width is a power of two for the size exponent.
        let (marker, width) = match width {
            1 => (0x10, 1),
            2 => (0x11, 2),
            4 => (0x12, 4),
            _ => (0x13, 8),
        };
        output.push(marker);
        write_sized_int(output, len, width);
    }
}

fn int_width(value: u64) -> u8 {
    if value <= 0xFF {
        1
    } else if value <= 0xFFFF {
        2
    } else if value <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_sized_int(output: &mut Vec<u8>, value: u64, size: u8) {
    match size {
        1 => output.push(value as u8),
        2 => output.extend_from_slice(&(value as u16).to_be_bytes()),
        4 => output.extend_from_slice(&(value as u32).to_be_bytes()),
        _ => output.extend_from_slice(&value.to_be_bytes()),
    }
}
