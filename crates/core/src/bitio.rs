//! Bit-level I/O for the tag stream.
//!
//! [`BitReader`] and [`BitWriter`] share one model: a byte buffer and a cursor
//! measured in bits. Bit fields are MSB-first within each byte; multi-byte
//! words are byte-aligned and little-endian.
//!
//! # Padding Rules
//! - Byte-aligned operations (`*_byte`, `*_word`, strings, floats) align first
//! - BitWriter: `align` pads skipped bits with zeros
//! - BitReader: `align` discards the rest of the current byte
//!
//! # Example
//! ```
//! use flashtag_core::bitio::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_ubits(0b101, 3).unwrap();
//! writer.write_sbits(-2, 4).unwrap();
//! writer.write_u16(0x1234).unwrap(); // aligns first
//!
//! let bytes = writer.finish();
//! assert_eq!(bytes, vec![0b1011_1100, 0x34, 0x12]);
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_ubits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_sbits(4).unwrap(), -2);
//! assert_eq!(reader.read_u16().unwrap(), 0x1234);
//! assert!(reader.eof());
//! ```

use crate::error::{BitIoError, Error, Result};

/// Widest bit field the engine reads or writes in one call.
pub const MAX_FIELD_BITS: u32 = 32;

/// Number of bits needed to hold `value` as an unsigned field.
pub fn unsigned_width(value: u32) -> u32 {
    32 - value.leading_zeros()
}

/// Number of bits needed to hold `value` as a signed (two's complement) field.
pub fn signed_width(value: i32) -> u32 {
    let magnitude = if value < 0 { !value } else { value } as u32;
    33 - magnitude.leading_zeros()
}

/// Character encoding used for strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// UTF-8, used by format version 6 and later
    Utf8,
    /// ISO-8859-1, used by earlier versions
    Latin1,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }

    /// Decode string bytes (without the terminating null).
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| {
                Error::from(BitIoError::InvalidText {
                    encoding: self.name(),
                })
            }),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encode a string (without the terminating null).
    ///
    /// Interior nulls are rejected since they would end the string early on decode.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        let invalid = || BitIoError::InvalidText {
            encoding: self.name(),
        };
        if text.contains('\0') {
            return Err(invalid().into());
        }
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| Error::from(invalid())))
                .collect(),
        }
    }
}

/// A saved cursor position.
///
/// Taken with `mark` and restored with `reset`; used for lookahead and for
/// bodies that interleave two parallel lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Bit position captured by this checkpoint.
    pub fn position(self) -> usize {
        self.0
    }
}

/// Reads bit fields and little-endian words from a byte buffer.
///
/// # Invariants
/// - `bit_position` never exceeds `data.len() * 8`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source data
    data: &'a [u8],
    /// Current bit position (0 = MSB of first byte)
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader positioned at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    fn ensure(&self, count: usize) -> Result<()> {
        let available = self.bits_remaining();
        if count > available {
            return Err(BitIoError::TruncatedBuffer {
                position: self.bit_position,
                requested: count,
                available,
            }
            .into());
        }
        Ok(())
    }

    /// Read `count` bits MSB-first starting at `position` without moving.
    fn peek_raw(&self, count: u32) -> Result<u64> {
        self.ensure(count as usize)?;

        let mut position = self.bit_position;
        let mut result = 0u64;
        let mut remaining = count as usize;

        while remaining > 0 {
            let bit_offset = position % 8;

            // How many bits can we read from the current byte?
            let bits_in_byte = 8 - bit_offset;
            let bits_to_read = remaining.min(bits_in_byte);

            let byte = self.data[position / 8];
            let mask = ((1u16 << bits_to_read) - 1) as u8;
            let bits = (byte >> (bits_in_byte - bits_to_read)) & mask;

            result = (result << bits_to_read) | u64::from(bits);

            position += bits_to_read;
            remaining -= bits_to_read;
        }

        Ok(result)
    }

    /// Read a `count`-bit field (0-32), sign-extending from bit `count - 1`
    /// when `signed` is set.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 32
    /// - `BitIoError::TruncatedBuffer` if not enough bits remain
    pub fn read_bits(&mut self, count: u32, signed: bool) -> Result<i64> {
        if count > MAX_FIELD_BITS {
            return Err(BitIoError::InvalidBitCount(count).into());
        }
        if count == 0 {
            return Ok(0);
        }

        let raw = self.peek_raw(count)?;
        self.bit_position += count as usize;

        if signed {
            let shift = 64 - count;
            Ok(((raw << shift) as i64) >> shift)
        } else {
            Ok(raw as i64)
        }
    }

    /// Read an unsigned bit field.
    pub fn read_ubits(&mut self, count: u32) -> Result<u32> {
        Ok(self.read_bits(count, false)? as u32)
    }

    /// Read a signed bit field.
    pub fn read_sbits(&mut self, count: u32) -> Result<i32> {
        Ok(self.read_bits(count, true)? as i32)
    }

    /// Read a single bit.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits(1, false)? == 1)
    }

    /// Skip to the next byte boundary.
    pub fn align(&mut self) {
        self.bit_position = self.bit_position.div_ceil(8) * 8;
        // A buffer always ends on a byte boundary, so this cannot overshoot.
        debug_assert!(self.bit_position <= self.bit_len());
    }

    /// Read one byte-aligned byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.align();
        Ok(self.read_bits(8, false)? as u8)
    }

    /// Read a little-endian integer of `byte_count` bytes (1-4).
    pub fn read_word(&mut self, byte_count: u32, signed: bool) -> Result<i64> {
        if byte_count == 0 || byte_count > 4 {
            return Err(BitIoError::InvalidBitCount(byte_count * 8).into());
        }
        self.align();
        self.ensure(byte_count as usize * 8)?;

        let start = self.bit_position / 8;
        let raw = self.data[start..start + byte_count as usize]
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        self.bit_position += byte_count as usize * 8;

        let bits = byte_count * 8;
        if signed {
            let shift = 64 - bits;
            Ok(((raw << shift) as i64) >> shift)
        } else {
            Ok(raw as i64)
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_word(2, false)? as u16)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_word(2, true)? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_word(4, false)? as u32)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_word(4, true)? as i32)
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        self.align();
        self.ensure(count * 8)?;
        let start = self.bit_position / 8;
        let bytes = self.data[start..start + count].to_vec();
        self.bit_position += count * 8;
        Ok(bytes)
    }

    /// Read a null-terminated string.
    pub fn read_string(&mut self, encoding: TextEncoding) -> Result<String> {
        self.align();
        let start = self.bit_position / 8;
        let Some(len) = self.data[start..].iter().position(|&b| b == 0) else {
            return Err(BitIoError::TruncatedBuffer {
                position: self.bit_position,
                requested: (self.data.len() - start + 1) * 8,
                available: self.bits_remaining(),
            }
            .into());
        };
        let text = encoding.decode(&self.data[start..start + len])?;
        self.bit_position += (len + 1) * 8;
        Ok(text)
    }

    /// Read a string stored in exactly `count` bytes, padded with nulls.
    pub fn read_fixed_string(&mut self, count: usize, encoding: TextEncoding) -> Result<String> {
        let bytes = self.read_bytes(count)?;
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        encoding.decode(&bytes[..len])
    }

    /// Read a 32-bit IEEE-754 float.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a 64-bit float stored as two little-endian words, high word first.
    pub fn read_f64(&mut self) -> Result<f64> {
        let high = u64::from(self.read_u32()?);
        let low = u64::from(self.read_u32()?);
        Ok(f64::from_bits((high << 32) | low))
    }

    /// Read a signed 8.8 fixed-point word.
    pub fn read_fixed8(&mut self) -> Result<f32> {
        Ok(f32::from(self.read_i16()?) / 256.0)
    }

    /// Read a signed 16.16 fixed-point word.
    pub fn read_fixed16(&mut self) -> Result<f32> {
        Ok((f64::from(self.read_i32()?) / 65536.0) as f32)
    }

    /// Peek the next byte without moving the cursor.
    pub fn scan_byte(&self) -> Result<u8> {
        let mut lookahead = self.clone();
        lookahead.read_byte()
    }

    /// Peek the next 16-bit word without moving the cursor.
    pub fn scan_u16(&self) -> Result<u16> {
        let mut lookahead = self.clone();
        lookahead.read_u16()
    }

    /// Peek the next 32-bit word without moving the cursor.
    pub fn scan_u32(&self) -> Result<u32> {
        let mut lookahead = self.clone();
        lookahead.read_u32()
    }

    /// Return the current bit position.
    pub fn position(&self) -> usize {
        self.bit_position
    }

    /// Move the cursor to an absolute bit position.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.bit_len() {
            return Err(BitIoError::PositionOutOfRange {
                position: position as i64,
                limit: self.bit_len(),
            }
            .into());
        }
        self.bit_position = position;
        Ok(())
    }

    /// Move the cursor by `delta` bits in either direction.
    pub fn adjust(&mut self, delta: i64) -> Result<()> {
        let target = (self.bit_position as i64).checked_add(delta);
        match target {
            Some(target) if target >= 0 => self.set_position(target as usize),
            _ => Err(BitIoError::PositionOutOfRange {
                position: target.unwrap_or(if delta < 0 { i64::MIN } else { i64::MAX }),
                limit: self.bit_len(),
            }
            .into()),
        }
    }

    pub fn mark(&self) -> Checkpoint {
        Checkpoint(self.bit_position)
    }

    pub fn reset(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.set_position(checkpoint.0)
    }

    /// Total length of the buffer in bits.
    pub fn bit_len(&self) -> usize {
        self.data.len() * 8
    }

    /// Return the number of bits remaining in the buffer.
    pub fn bits_remaining(&self) -> usize {
        self.bit_len() - self.bit_position
    }

    /// Check if the whole buffer has been consumed.
    pub fn eof(&self) -> bool {
        self.bit_position >= self.bit_len()
    }
}

/// Writes bit fields and little-endian words into a byte buffer.
///
/// A writer from [`BitWriter::new`] grows on demand. One from
/// [`BitWriter::sized`] has a fixed capacity computed in advance by the
/// framing layer; writing past it means the length accounting is wrong and
/// fails with `TruncatedBuffer`.
#[derive(Debug, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_position: usize,
    /// Fixed capacity in bytes, `None` for a growable writer
    capacity: Option<usize>,
}

impl BitWriter {
    /// Create a growable BitWriter with empty output.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_position: 0,
            capacity: None,
        }
    }

    /// Create a writer over a zeroed buffer of exactly `len` bytes.
    pub fn sized(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
            bit_position: 0,
            capacity: Some(len),
        }
    }

    fn limit_bits(&self) -> usize {
        self.capacity.unwrap_or(self.bytes.len()) * 8
    }

    /// Make room for `count` more bits at the cursor.
    fn reserve(&mut self, count: usize) -> Result<()> {
        let needed = (self.bit_position + count).div_ceil(8);
        match self.capacity {
            Some(capacity) if needed > capacity => Err(BitIoError::TruncatedBuffer {
                position: self.bit_position,
                requested: count,
                available: capacity * 8 - self.bit_position,
            }
            .into()),
            Some(_) => Ok(()),
            None => {
                if needed > self.bytes.len() {
                    self.bytes.resize(needed, 0);
                }
                Ok(())
            }
        }
    }

    /// Write the low `count` bits of `raw` MSB-first, replacing what was there.
    fn put_raw(&mut self, raw: u64, count: u32) -> Result<()> {
        self.reserve(count as usize)?;

        let mut remaining = count as usize;
        while remaining > 0 {
            let bit_offset = self.bit_position % 8;
            let room = 8 - bit_offset;
            let bits_to_write = remaining.min(room);

            // Extract the top bits_to_write bits of what is left
            let shift = remaining - bits_to_write;
            let bits = ((raw >> shift) & ((1 << bits_to_write) - 1)) as u8;

            let lshift = room - bits_to_write;
            let mask = (((1u16 << bits_to_write) - 1) as u8) << lshift;
            let byte = &mut self.bytes[self.bit_position / 8];
            *byte = (*byte & !mask) | (bits << lshift);

            self.bit_position += bits_to_write;
            remaining -= bits_to_write;
        }
        Ok(())
    }

    /// Write a `count`-bit field (0-32).
    ///
    /// The value must fit in `count` bits either as a signed or as an
    /// unsigned field. It is never truncated.
    pub fn write_bits(&mut self, value: i64, count: u32) -> Result<()> {
        if count > MAX_FIELD_BITS {
            return Err(BitIoError::InvalidBitCount(count).into());
        }
        if count == 0 {
            if value != 0 {
                return Err(BitIoError::ValueTooWide { value, bits: 0 }.into());
            }
            return Ok(());
        }

        let min = -(1i64 << (count - 1));
        let max = (1i64 << count) - 1;
        if value < min || value > max {
            return Err(BitIoError::ValueTooWide { value, bits: count }.into());
        }

        let mask = (1u64 << count) - 1;
        self.put_raw(value as u64 & mask, count)
    }

    /// Write an unsigned bit field.
    pub fn write_ubits(&mut self, value: u32, count: u32) -> Result<()> {
        self.write_bits(i64::from(value), count)
    }

    /// Write a signed bit field; `value` must fit the two's complement range.
    pub fn write_sbits(&mut self, value: i32, count: u32) -> Result<()> {
        if count == 0 || count > MAX_FIELD_BITS || signed_width(value) > count {
            return Err(BitIoError::ValueTooWide {
                value: i64::from(value),
                bits: count,
            }
            .into());
        }
        self.write_bits(i64::from(value), count)
    }

    /// Write a single bit.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_bits(i64::from(value), 1)
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align(&mut self) -> Result<()> {
        let partial = self.bit_position % 8;
        if partial != 0 {
            self.put_raw(0, (8 - partial) as u32)?;
        }
        Ok(())
    }

    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.align()?;
        self.put_raw(u64::from(value), 8)
    }

    /// Write a little-endian integer of `byte_count` bytes (1-4).
    pub fn write_word(&mut self, value: i64, byte_count: u32) -> Result<()> {
        if byte_count == 0 || byte_count > 4 {
            return Err(BitIoError::InvalidBitCount(byte_count * 8).into());
        }
        let bits = byte_count * 8;
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << bits) - 1;
        if value < min || value > max {
            return Err(BitIoError::ValueTooWide { value, bits }.into());
        }

        self.align()?;
        for i in 0..byte_count {
            self.put_raw((value >> (8 * i)) as u64 & 0xFF, 8)?;
        }
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_word(i64::from(value), 2)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_word(i64::from(value), 2)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_word(i64::from(value), 4)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_word(i64::from(value), 4)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.align()?;
        self.reserve(bytes.len() * 8)?;
        let start = self.bit_position / 8;
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        self.bit_position += bytes.len() * 8;
        Ok(())
    }

    /// Write a string followed by a null terminator.
    pub fn write_string(&mut self, text: &str, encoding: TextEncoding) -> Result<()> {
        let bytes = encoding.encode(text)?;
        self.write_bytes(&bytes)?;
        self.write_byte(0)
    }

    /// Write a string into exactly `count` bytes, padding with nulls.
    pub fn write_fixed_string(
        &mut self,
        text: &str,
        count: usize,
        encoding: TextEncoding,
    ) -> Result<()> {
        let mut bytes = encoding.encode(text)?;
        if bytes.len() > count {
            return Err(BitIoError::ValueTooWide {
                value: bytes.len() as i64,
                bits: (count * 8) as u32,
            }
            .into());
        }
        bytes.resize(count, 0);
        self.write_bytes(&bytes)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u32(value.to_bits())
    }

    /// Write a 64-bit float as two little-endian words, high word first.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        let bits = value.to_bits();
        self.write_u32((bits >> 32) as u32)?;
        self.write_u32(bits as u32)
    }

    /// Write a signed 8.8 fixed-point word.
    pub fn write_fixed8(&mut self, value: f32) -> Result<()> {
        let raw = (f64::from(value) * 256.0).round() as i64;
        check_signed(raw, 16)?;
        self.write_word(raw, 2)
    }

    /// Write a signed 16.16 fixed-point word.
    pub fn write_fixed16(&mut self, value: f32) -> Result<()> {
        let raw = (f64::from(value) * 65536.0).round() as i64;
        check_signed(raw, 32)?;
        self.write_word(raw, 4)
    }

    /// Return the current bit position.
    pub fn position(&self) -> usize {
        self.bit_position
    }

    /// Move the cursor to an absolute bit position within the written or
    /// reserved buffer.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.limit_bits() {
            return Err(BitIoError::PositionOutOfRange {
                position: position as i64,
                limit: self.limit_bits(),
            }
            .into());
        }
        self.bit_position = position;
        Ok(())
    }

    pub fn adjust(&mut self, delta: i64) -> Result<()> {
        let target = (self.bit_position as i64).checked_add(delta);
        match target {
            Some(target) if target >= 0 => self.set_position(target as usize),
            _ => Err(BitIoError::PositionOutOfRange {
                position: target.unwrap_or(if delta < 0 { i64::MIN } else { i64::MAX }),
                limit: self.limit_bits(),
            }
            .into()),
        }
    }

    pub fn mark(&self) -> Checkpoint {
        Checkpoint(self.bit_position)
    }

    pub fn reset(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.set_position(checkpoint.0)
    }

    /// Return the number of bytes in the output buffer.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Finish writing and return the output bytes.
    ///
    /// A partial final byte is already zero padded. This consumes the writer.
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn check_signed(raw: i64, bits: u32) -> Result<()> {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if raw < min || raw > max {
        return Err(BitIoError::ValueTooWide { value: raw, bits }.into());
    }
    Ok(())
}
