//! Variable-Length Integer Packing
//!
//! Records are built from DDNet `CVariableInt` integers, raw bytes and
//! NUL-terminated strings. The byte-level work is done by `libtw2_packer`;
//! this module adapts it to a growable buffer the recorder owns.
//!
//! ```text
//! first byte:  E S D D D D D D   (extend, sign, 6 data bits)
//! next bytes:  E D D D D D D D   (extend, 7 data bits)
//! ```

use libtw2_packer::with_packer;
use warn::Ignore;

/// Maximum encoded size of one `i32`.
pub const MAX_INT_BYTES: usize = 5;

/// Append the varint encoding of `value` to `out`.
pub fn pack_int(value: i32, out: &mut Vec<u8>) {
    out.reserve(MAX_INT_BYTES);
    let written = with_packer(out, |mut packer| packer.write_int(value).is_ok());
    assert!(written, "varint exceeds reserved space");
}

/// Record builder: integers, raw bytes and NUL-terminated strings appended
/// to one buffer.
#[derive(Clone, Debug, Default)]
pub struct Packer {
    buffer: Vec<u8>,
}

impl Packer {
    /// Create an empty packer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Drop all packed data, keeping the allocation.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Append a varint.
    #[inline]
    pub fn add_int(&mut self, value: i32) {
        pack_int(value, &mut self.buffer);
    }

    /// Append bytes verbatim.
    pub fn add_raw(&mut self, data: &[u8]) {
        self.buffer.reserve(data.len());
        let written = with_packer(&mut self.buffer, |mut packer| packer.write_raw(data).is_ok());
        assert!(written, "raw data exceeds reserved space");
    }

    /// Append a string followed by a NUL terminator.
    ///
    /// Everything from the first interior NUL onwards is dropped.
    pub fn add_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let bytes = &bytes[..end];

        self.buffer.reserve(bytes.len() + 1);
        let written =
            with_packer(&mut self.buffer, |mut packer| packer.write_string(bytes).is_ok());
        assert!(written, "string exceeds reserved space");
    }

    /// Packed bytes so far.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of packed bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.buffer.len()
    }
}

/// Sequential reader over packed data.
///
/// Malformed input ends the read with `None`; non-canonical encodings are
/// accepted silently.
pub struct Unpacker<'a> {
    inner: libtw2_packer::Unpacker<'a>,
}

impl<'a> Unpacker<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: libtw2_packer::Unpacker::new(data),
        }
    }

    /// Read one varint.
    pub fn get_int(&mut self) -> Option<i32> {
        self.inner.read_int(&mut Ignore).ok()
    }

    /// Read `len` raw bytes.
    pub fn get_raw(&mut self, len: usize) -> Option<&'a [u8]> {
        self.inner.read_raw(len).ok()
    }

    /// Read a NUL-terminated string. Invalid UTF-8 is replaced lossily.
    pub fn get_string(&mut self) -> Option<String> {
        let raw = self.inner.read_string().ok()?;
        Some(String::from_utf8_lossy(raw).into_owned())
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
