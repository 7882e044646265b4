//! Presentation layer: positional little-endian stream codec.
//!
//! There are no type tags in the byte stream; layout is positional and
//! known to both sides. The encoder appends to a bounded buffer, the
//! decoder walks a byte slice. All multi-byte primitives are little-endian;
//! floats travel as their IEEE-754 bit patterns.

use heapless::{String, Vec};

/// Encoder appending primitives to a bounded byte buffer.
///
/// Offsets are measured from the buffer length at construction. Capacity is
/// a caller contract: every message sizes its buffer by its maximum encoded
/// size, so the encoder never runs out.
pub struct StreamEncoder<'a, const CAP: usize> {
    out: &'a mut Vec<u8, CAP>,
    base: usize,
}

impl<'a, const CAP: usize> StreamEncoder<'a, CAP> {
    pub fn new(out: &'a mut Vec<u8, CAP>) -> Self {
        let base = out.len();
        Self { out, base }
    }

    /// Bytes written through this encoder.
    pub fn offset(&self) -> usize {
        self.out.len() - self.base
    }

    pub fn add_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    pub fn add_u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_u64(&mut self, value: u64) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_i8(&mut self, value: i8) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_i16(&mut self, value: i16) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_i64(&mut self, value: i64) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_f32(&mut self, value: f32) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_f64(&mut self, value: f64) {
        self.put(&value.to_le_bytes());
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    /// Write `fill` bytes until the offset reaches `target`.
    ///
    /// `target` must not lie behind the current offset.
    pub fn fill_up_to_offset(&mut self, target: usize, fill: u8) {
        debug_assert!(target >= self.offset());
        while self.offset() < target {
            self.put(&[fill]);
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        let fits = self.out.extend_from_slice(bytes).is_ok();
        debug_assert!(fits, "presentation buffer overrun");
    }
}

/// Forward-only decoder over a byte slice.
///
/// Every fetch returns `None` on underflow, which the enclosing message
/// decoder propagates as a failed parse.
pub struct StreamDecoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> StreamDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left in the stream.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn fetch_u8(&mut self) -> Option<u8> {
        let &byte = self.data.get(self.offset)?;
        self.offset += 1;
        Some(byte)
    }

    pub fn fetch_u16(&mut self) -> Option<u16> {
        Some(u16::from_le_bytes(self.fetch_array()?))
    }

    pub fn fetch_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.fetch_array()?))
    }

    pub fn fetch_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.fetch_array()?))
    }

    pub fn fetch_i8(&mut self) -> Option<i8> {
        Some(self.fetch_u8()? as i8)
    }

    pub fn fetch_i16(&mut self) -> Option<i16> {
        Some(i16::from_le_bytes(self.fetch_array()?))
    }

    pub fn fetch_i32(&mut self) -> Option<i32> {
        Some(i32::from_le_bytes(self.fetch_array()?))
    }

    pub fn fetch_i64(&mut self) -> Option<i64> {
        Some(i64::from_le_bytes(self.fetch_array()?))
    }

    pub fn fetch_f32(&mut self) -> Option<f32> {
        Some(f32::from_le_bytes(self.fetch_array()?))
    }

    pub fn fetch_f64(&mut self) -> Option<f64> {
        Some(f64::from_le_bytes(self.fetch_array()?))
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn fetch_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(count)?;
        let bytes = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(bytes)
    }

    /// Advance to an absolute offset without reading.
    ///
    /// Fails when `target` lies behind the cursor or past the stream end.
    pub fn skip_up_to_offset(&mut self, target: usize) -> Option<()> {
        if target < self.offset || target > self.data.len() {
            return None;
        }
        self.offset = target;
        Some(())
    }

    /// Read an ASCII string into `out`.
    ///
    /// Stops at a nul terminator (which is consumed), when `out` is full
    /// (the terminator, if any, is left in the stream), or at the end of
    /// the stream. A non-ASCII byte terminates the string without being
    /// consumed.
    pub fn fetch_ascii_string<const N: usize>(&mut self, out: &mut String<N>) {
        out.clear();
        while let Some(&byte) = self.data.get(self.offset) {
            if byte == 0 {
                self.offset += 1;
                break;
            }
            if !byte.is_ascii() || out.push(byte as char).is_err() {
                break;
            }
            self.offset += 1;
        }
    }

    fn fetch_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.fetch_bytes(N)?.try_into().ok()
    }
}
