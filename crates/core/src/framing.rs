//! Record framing: length-prefixed headers and the end-position check.
//!
//! Every record is a header followed by a body whose length the header
//! declares. After a body is decoded or encoded the cursor must sit exactly
//! where the declared length says; anything else is a
//! `RecordLengthMismatch`, because every later record would otherwise be read
//! from the wrong offset.
//!
//! # Tag Header Format
//!
//! ```text
//! short form (body < 63 bytes):
//! +-----------------------------+
//! | code << 6 | length  (u16 LE) |
//! +-----------------------------+
//!
//! long form (body >= 63 bytes):
//! +-----------------------------+---------------------+
//! | code << 6 | 0x3F    (u16 LE) | length   (u32 LE)   |
//! +-----------------------------+---------------------+
//! ```
//!
//! The 6-bit value 63 is reserved as the long-form marker, so a 63-byte body
//! always uses the long form.
//!
//! # Action Header Format
//!
//! ```text
//! +--------------+-------------------------------+
//! | opcode (u8)  | length (u16 LE), opcode >= 0x80 |
//! +--------------+-------------------------------+
//! ```
//!
//! # Encoding
//!
//! Encoding is two steps. [`Encode::prepare`] computes a plan (at minimum the
//! body length, plus whatever derived values the body writer needs), then the
//! header is written from the plan and [`Encode::encode`] writes the body from
//! the same plan. Nothing crosses the two steps except the plan.

use tracing::debug;

use crate::bitio::{BitReader, BitWriter};
use crate::context::Context;
use crate::error::{FramingError, RegistryError, Result};
use crate::registry::{Discriminant, Dispatch};

/// Low six bits of a tag header that announce a 32-bit length word.
pub const LONG_FORM_SENTINEL: u16 = 0x3F;

/// Longest body that fits the short form.
pub const MAX_SHORT_LENGTH: usize = 62;

/// Largest tag code that fits the 10-bit field.
pub const MAX_TAG_CODE: u16 = 0x3FF;

/// Opcodes at or above this value carry a length and a body.
pub const ACTION_WITH_BODY: u16 = 0x80;

/// A decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Discriminant
    pub code: u16,
    /// Declared body length in bytes
    pub length: usize,
    /// Byte offset of the header
    pub offset: usize,
    /// Whether the header used an explicit 32-bit length
    pub long_form: bool,
    /// Bit position of the first body bit
    pub body_start: usize,
}

impl RecordHeader {
    /// Bit position where the body must end.
    pub fn end(&self) -> usize {
        self.body_start + self.length * 8
    }
}

/// A physical header layout.
pub trait Framing {
    /// Encoded header size for a body of `body_len` bytes.
    fn header_len(code: u16, body_len: usize) -> usize;

    /// Read the discriminant without consuming anything.
    fn peek_code(reader: &BitReader<'_>) -> Result<u16>;

    fn read_header(reader: &mut BitReader<'_>) -> Result<RecordHeader>;

    fn write_header(code: u16, body_len: usize, writer: &mut BitWriter) -> Result<()>;
}

/// 16-bit short/long headers used by top-level tags.
#[derive(Debug, Clone, Copy)]
pub struct TagFraming;

impl Framing for TagFraming {
    fn header_len(_code: u16, body_len: usize) -> usize {
        if body_len <= MAX_SHORT_LENGTH {
            2
        } else {
            6
        }
    }

    fn peek_code(reader: &BitReader<'_>) -> Result<u16> {
        Ok(reader.scan_u16()? >> 6)
    }

    fn read_header(reader: &mut BitReader<'_>) -> Result<RecordHeader> {
        reader.align();
        let offset = reader.position() / 8;
        let word = reader.read_u16()?;
        let code = word >> 6;

        let (length, long_form) = if word & LONG_FORM_SENTINEL == LONG_FORM_SENTINEL {
            let length = reader.read_u32()?;
            if length > i32::MAX as u32 {
                return Err(FramingError::MalformedHeader {
                    offset,
                    reason: "long-form length has the sign bit set",
                }
                .into());
            }
            (length as usize, true)
        } else {
            (usize::from(word & LONG_FORM_SENTINEL), false)
        };

        Ok(RecordHeader {
            code,
            length,
            offset,
            long_form,
            body_start: reader.position(),
        })
    }

    fn write_header(code: u16, body_len: usize, writer: &mut BitWriter) -> Result<()> {
        let offset = writer.position() / 8;
        if code > MAX_TAG_CODE {
            return Err(FramingError::MalformedHeader {
                offset,
                reason: "tag code does not fit in 10 bits",
            }
            .into());
        }
        if body_len > i32::MAX as usize {
            return Err(FramingError::MalformedHeader {
                offset,
                reason: "body length does not fit in 31 bits",
            }
            .into());
        }

        if body_len <= MAX_SHORT_LENGTH {
            writer.write_u16((code << 6) | body_len as u16)
        } else {
            writer.write_u16((code << 6) | LONG_FORM_SENTINEL)?;
            writer.write_u32(body_len as u32)
        }
    }
}

/// One-byte opcode headers used inside action blocks.
#[derive(Debug, Clone, Copy)]
pub struct ActionFraming;

impl Framing for ActionFraming {
    fn header_len(code: u16, _body_len: usize) -> usize {
        if code >= ACTION_WITH_BODY {
            3
        } else {
            1
        }
    }

    fn peek_code(reader: &BitReader<'_>) -> Result<u16> {
        Ok(u16::from(reader.scan_byte()?))
    }

    fn read_header(reader: &mut BitReader<'_>) -> Result<RecordHeader> {
        reader.align();
        let offset = reader.position() / 8;
        let code = u16::from(reader.read_byte()?);
        let length = if code >= ACTION_WITH_BODY {
            usize::from(reader.read_u16()?)
        } else {
            0
        };

        Ok(RecordHeader {
            code,
            length,
            offset,
            long_form: false,
            body_start: reader.position(),
        })
    }

    fn write_header(code: u16, body_len: usize, writer: &mut BitWriter) -> Result<()> {
        let offset = writer.position() / 8;
        let malformed = |reason| FramingError::MalformedHeader { offset, reason };

        let opcode = u8::try_from(code).map_err(|_| malformed("opcode does not fit in a byte"))?;
        if code < ACTION_WITH_BODY {
            if body_len != 0 {
                return Err(malformed("opcode below 0x80 cannot carry a body").into());
            }
            return writer.write_byte(opcode);
        }

        let length =
            u16::try_from(body_len).map_err(|_| malformed("action body longer than 65535 bytes"))?;
        writer.write_byte(opcode)?;
        writer.write_u16(length)
    }
}

/// Something an encode plan can report a body length for.
pub trait EncodePlan {
    fn body_len(&self) -> usize;
}

impl EncodePlan for usize {
    fn body_len(&self) -> usize {
        *self
    }
}

/// The two encode steps every record implements.
pub trait Encode {
    type Plan: EncodePlan;

    /// Compute the body length and any derived values the body writer needs.
    ///
    /// Does not touch the output buffer. May set context flags that later
    /// records in the same pass consult.
    fn prepare(&self, ctx: &mut Context<'_>) -> Result<Self::Plan>;

    /// Write exactly `plan.body_len()` bytes of body.
    fn encode(&self, plan: &Self::Plan, writer: &mut BitWriter, ctx: &mut Context<'_>)
        -> Result<()>;
}

/// A framed record: knows its discriminant and its header layout.
pub trait Record: Encode {
    type Framing: Framing;

    fn code(&self) -> u16;

    fn name(&self) -> &'static str;
}

/// Total encoded size, header included, of a prepared record.
pub fn framed_len<R: Record>(record: &R, plan: &R::Plan) -> usize {
    let body_len = plan.body_len();
    R::Framing::header_len(record.code(), body_len) + body_len
}

/// Convert a bit difference into bytes, never rounding a mismatch to zero.
pub(crate) fn byte_delta(bits: i64) -> i64 {
    if bits % 8 == 0 {
        bits / 8
    } else {
        bits.signum() * ((bits.abs() + 7) / 8)
    }
}

/// Fail unless `position` is the end the header predicted.
pub fn check_end(record: &'static str, header: &RecordHeader, position: usize) -> Result<()> {
    let end = header.end();
    if position != end {
        return Err(FramingError::RecordLengthMismatch {
            record,
            offset: header.offset,
            declared: header.length,
            delta: byte_delta(position as i64 - end as i64),
        }
        .into());
    }
    Ok(())
}

/// Decode one framed record of category `T`.
///
/// The discriminant is peeked first so that a strict-mode miss fails with the
/// cursor still at the start of the record.
pub fn read_record<T>(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<T>
where
    T: Record + Dispatch,
{
    reader.align();
    let registry = ctx.registry();
    let offset = reader.position() / 8;

    let code = T::Framing::peek_code(reader)?;
    if !ctx.is_lenient() && !registry.contains::<T>(code) {
        return Err(RegistryError::UnsupportedType {
            category: T::CATEGORY,
            code,
            offset,
        }
        .into());
    }

    let header = T::Framing::read_header(reader)?;
    debug!(
        category = %T::CATEGORY,
        code = header.code,
        offset = header.offset,
        length = header.length,
        long_form = header.long_form,
        "record header"
    );

    if header.end() > reader.bit_len() {
        // Body cut short; delta is how far the buffer falls short.
        return Err(FramingError::RecordLengthMismatch {
            record: T::kind_name(code),
            offset: header.offset,
            declared: header.length,
            delta: byte_delta(reader.bit_len() as i64 - header.end() as i64),
        }
        .into());
    }

    let value = registry.decode::<T>(&Discriminant::framed(&header), reader, ctx)?;
    check_end(value.name(), &header, reader.position())?;
    ctx.stats_mut().record_decoded(&header);
    Ok(value)
}

/// Write a record whose plan has already been computed.
pub fn write_prepared<R: Record>(
    record: &R,
    plan: &R::Plan,
    writer: &mut BitWriter,
    ctx: &mut Context<'_>,
) -> Result<()> {
    writer.align()?;
    let offset = writer.position() / 8;
    let length = plan.body_len();

    R::Framing::write_header(record.code(), length, writer)?;
    let header = RecordHeader {
        code: record.code(),
        length,
        offset,
        long_form: R::Framing::header_len(record.code(), length) == 6,
        body_start: writer.position(),
    };

    record.encode(plan, writer, ctx)?;
    check_end(record.name(), &header, writer.position())?;
    ctx.stats_mut().record_encoded(&header);
    Ok(())
}

/// Prepare and write a record, returning the number of bytes emitted.
pub fn write_record<R: Record>(
    record: &R,
    writer: &mut BitWriter,
    ctx: &mut Context<'_>,
) -> Result<usize> {
    let plan = record.prepare(ctx)?;
    write_prepared(record, &plan, writer, ctx)?;
    Ok(framed_len(record, &plan))
}
