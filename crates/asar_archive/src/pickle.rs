//! Length prefixed block codec.
//!
//! Both blocks at the start of an archive use the pickle layout: a little-endian `u32` holding
//! the payload length, followed by the payload zero-padded to a multiple of four bytes.
//!
//! | Offset (bytes) | Field        | Description                                         |
//! |----------------|--------------|-----------------------------------------------------|
//! | 0x0000         | Payload size | 4 bytes: length of everything after this field      |
//! | 0x0004         | Payload      | values, each one padded to a 4 byte boundary        |
//!
//! A `u32` value occupies exactly 4 payload bytes. A string is written as an `i32` byte count
//! followed by its UTF-8 bytes and the padding.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Size of the payload length prefix
pub const PREFIX_SIZE: usize = 4;

const ALIGNMENT: usize = 4;

fn aligned(len: usize) -> usize {
    len + (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

fn invalid(reason: &str) -> Error {
    Error::InvalidArchive(reason.to_owned())
}

/// Builder for a single length prefixed block
#[derive(Debug, Clone, Default)]
pub struct Pickle {
    payload: Vec<u8>,
}

impl Pickle {
    /// Creates an empty block
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a little-endian `u32`
    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.write_bytes(&bytes);
        self
    }

    /// Appends a length prefixed UTF-8 string
    pub fn write_string(&mut self, value: &str) -> Result<&mut Self> {
        let len = i32::try_from(value.len())
            .map_err(|_| Error::InvalidPath("string is too long to encode".into()))?;

        let mut bytes = [0u8; 4];
        LittleEndian::write_i32(&mut bytes, len);
        self.write_bytes(&bytes);
        self.write_bytes(value.as_bytes());
        Ok(self)
    }

    fn write_bytes(&mut self, data: &[u8]) {
        self.payload.extend_from_slice(data);
        self.payload.resize(aligned(self.payload.len()), 0);
    }

    /// Length of the payload, excluding the prefix
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Returns the encoded block, prefix included
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = vec![0u8; PREFIX_SIZE];
        LittleEndian::write_u32(&mut out, self.payload.len() as u32);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Sequential reader over the payload of a block
#[derive(Debug)]
pub struct PickleIter<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl<'a> PickleIter<'a> {
    /// Validates the prefix of `block` and positions the reader at the first value
    pub fn new(block: &'a [u8]) -> Result<Self> {
        if block.len() < PREFIX_SIZE {
            return Err(invalid("block is shorter than its length prefix"));
        }

        let payload_size = LittleEndian::read_u32(&block[..PREFIX_SIZE]) as usize;
        let payload = block
            .get(PREFIX_SIZE..PREFIX_SIZE + payload_size)
            .ok_or_else(|| invalid("block payload is truncated"))?;

        Ok(Self { payload, offset: 0 })
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self
            .payload
            .get(self.offset..self.offset + len)
            .ok_or_else(|| invalid("value runs past the end of the block"))?;

        // padding is skipped here, the payload itself does not record it
        self.offset = (self.offset + aligned(len)).min(self.payload.len());
        Ok(bytes)
    }

    /// Reads a little-endian `u32`
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    /// Reads a length prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let len = LittleEndian::read_i32(self.read_bytes(4)?);
        let len = usize::try_from(len).map_err(|_| invalid("negative string length"))?;

        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| invalid("string is not valid UTF-8"))
    }
}

/// Encodes a block holding a single `u32`
pub fn encode_u32(value: u32) -> Vec<u8> {
    let mut pickle = Pickle::new();
    pickle.write_u32(value);
    pickle.into_bytes()
}

/// Encodes a block holding a single string
pub fn encode_string(value: &str) -> Result<Vec<u8>> {
    let mut pickle = Pickle::new();
    pickle.write_string(value)?;
    Ok(pickle.into_bytes())
}

/// Decodes a block holding a single `u32`
pub fn decode_u32(block: &[u8]) -> Result<u32> {
    PickleIter::new(block)?.read_u32()
}

/// Decodes a block holding a single string
pub fn decode_string(block: &[u8]) -> Result<String> {
    PickleIter::new(block)?.read_string()
}
