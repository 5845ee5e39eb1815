use crate::error::CodecError;

/// The wire encoding of a field's payload. Tag keys on the wire are
/// `(field_tag << 3) | kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireKind {
    pub fn bits(self) -> u8 {
        match self {
            WireKind::Varint => 0,
            WireKind::Fixed64 => 1,
            WireKind::LengthDelimited => 2,
            WireKind::Fixed32 => 5,
        }
    }

    pub fn from_bits(bits: u8) -> Option<WireKind> {
        match bits {
            0 => Some(WireKind::Varint),
            1 => Some(WireKind::Fixed64),
            2 => Some(WireKind::LengthDelimited),
            5 => Some(WireKind::Fixed32),
            _ => None,
        }
    }
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_len(value: u64) -> usize {
    let mut len = 1;
    let mut value = value >> 7;
    while value != 0 {
        len += 1;
        value >>= 7;
    }
    len
}

/// Number of bytes a tag key occupies. The wire kind lives in the low three
/// bits, so it never changes the key's length.
pub fn key_len(tag: u32) -> usize {
    varint_len((tag as u64) << 3)
}

/// A wire-format byte buffer meant for reading.
///
/// Example usage:
///
/// ```
/// use protoforge_runtime::wire::{ProtoReader, WireKind};
/// let mut reader = ProtoReader::new(&[0x08, 0x96, 0x01]);
/// assert_eq!(reader.read_key().unwrap(), Some((1, WireKind::Varint)));
/// assert_eq!(reader.read_varint().unwrap(), 150);
/// assert_eq!(reader.read_key().unwrap(), None);
/// ```
pub struct ProtoReader<'a> {
    data:  &'a [u8],
    index: usize,
}

impl<'a> ProtoReader<'a> {
    pub fn new(data: &[u8]) -> ProtoReader {
        ProtoReader { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current index into the underlying byte slice. Starts at 0 and ends at
    /// `self.data().len()` when everything has been read.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn read_byte(&mut self, what: &'static str) -> Result<u8, CodecError> {
        if self.index >= self.data.len() {
            Err(CodecError::Truncated(what))
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    pub fn read_bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        if len > self.data.len() - self.index {
            Err(CodecError::Truncated(what))
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    /// Reads a varint of at most ten bytes.
    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        let mut result: u64 = 0;
        for i in 0..10 {
            let byte = self.read_byte("varint")?;
            result |= ((byte & 0x7f) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(CodecError::Malformed(
            "varint is longer than ten bytes".to_owned(),
        ))
    }

    pub fn read_fixed32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.read_bytes(4, "fixed32")?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_bytes(8, "fixed64")?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads a varint length prefix followed by that many bytes.
    pub fn read_len_delimited(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| CodecError::Malformed(format!("length prefix {} overflows", len)))?;
        self.read_bytes(len, "length-delimited payload")
    }

    /// Reads the next tag key, or `None` when the input is exhausted.
    pub fn read_key(&mut self) -> Result<Option<(u32, WireKind)>, CodecError> {
        if self.index >= self.data.len() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let tag = u32::try_from(key >> 3)
            .map_err(|_| CodecError::Malformed(format!("tag in key {} overflows", key)))?;
        if tag == 0 {
            return Err(CodecError::Malformed("zero field tag".to_owned()));
        }
        let kind = WireKind::from_bits((key & 7) as u8)
            .ok_or_else(|| CodecError::Malformed(format!("invalid wire kind in key {}", key)))?;
        Ok(Some((tag, kind)))
    }

    /// Skips over one payload of the given kind.
    pub fn skip(&mut self, kind: WireKind) -> Result<(), CodecError> {
        match kind {
            WireKind::Varint => {
                self.read_varint()?;
            }
            WireKind::Fixed64 => {
                self.read_bytes(8, "fixed64")?;
            }
            WireKind::LengthDelimited => {
                self.read_len_delimited()?;
            }
            WireKind::Fixed32 => {
                self.read_bytes(4, "fixed32")?;
            }
        }
        Ok(())
    }
}

/// A wire-format byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// use protoforge_runtime::wire::{ProtoWriter, WireKind};
/// let mut writer = ProtoWriter::new();
/// writer.write_key(1, WireKind::Varint);
/// writer.write_varint(150);
/// assert_eq!(writer.data(), [0x08, 0x96, 0x01]);
/// ```
#[derive(Default)]
pub struct ProtoWriter {
    data: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> ProtoWriter {
        ProtoWriter { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> ProtoWriter {
        ProtoWriter {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Consumes this writer and returns the bytes written so far.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.data.push(byte);
                return;
            }
            self.data.push(byte | 0x80);
        }
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_len_delimited(&mut self, value: &[u8]) {
        self.write_varint(value.len() as u64);
        self.data.extend_from_slice(value);
    }

    pub fn write_key(&mut self, tag: u32, kind: WireKind) {
        self.write_varint(((tag as u64) << 3) | kind.bits() as u64);
    }
}
