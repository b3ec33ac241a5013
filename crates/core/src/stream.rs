//! Tag streams and the movie file header.
//!
//! # Movie Format
//!
//! ```text
//! +-----------+-------------+-------------------+
//! | "FWS" (3) | version (1) | file length (u32) |
//! +-----------+-------------+-------------------+
//! | frame size (Bounds) | frame rate (u16, 8.8) | frame count (u16) |
//! +---------------------+-----------------------+-------------------+
//! | tags ... | End tag |
//! +----------+---------+
//! ```
//!
//! The file length covers the whole file, signature included. `CWS` and
//! `ZWS` files carry a compressed body that has to be inflated before it
//! reaches this module.

use tracing::{debug, warn};

use crate::bitio::{BitReader, BitWriter};
use crate::context::Context;
use crate::error::{check_range, FramingError, Result};
use crate::framing::{byte_delta, framed_len, read_record, write_prepared, Encode};
use crate::values::geometry::Bounds;
use crate::values::tag::Tag;
use crate::values::Element;

pub const SIGNATURE: [u8; 3] = *b"FWS";
pub const COMPRESSED_SIGNATURES: [[u8; 3]; 2] = [*b"CWS", *b"ZWS"];

/// Bytes before the frame size: signature, version and file length.
const PREAMBLE_LEN: usize = 8;

/// Decode every tag in `bytes` until the buffer is exhausted.
pub fn decode_tags(bytes: &[u8], ctx: &mut Context<'_>) -> Result<Vec<Tag>> {
    let mut reader = BitReader::new(bytes);
    let mut tags = Vec::new();
    while !reader.eof() {
        tags.push(read_record::<Tag>(&mut reader, ctx)?);
    }
    debug!(count = tags.len(), bytes = bytes.len(), "decoded tag stream");
    Ok(tags)
}

/// Encode `tags` into a buffer sized up front from their plans.
pub fn encode_tags(tags: &[Tag], ctx: &mut Context<'_>) -> Result<Vec<u8>> {
    let (plans, total) = prepare_tags(tags, ctx)?;
    let mut writer = BitWriter::sized(total);
    write_tags(tags, &plans, &mut writer, ctx)?;
    check_total("TagStream", 0, total, writer.position())?;
    debug!(count = tags.len(), bytes = total, "encoded tag stream");
    Ok(writer.finish())
}

type TagPlans = Vec<<Tag as Encode>::Plan>;

fn prepare_tags(tags: &[Tag], ctx: &mut Context<'_>) -> Result<(TagPlans, usize)> {
    let mut plans = Vec::with_capacity(tags.len());
    let mut total = 0;
    for tag in tags {
        let plan = tag.prepare(ctx)?;
        total += framed_len(tag, &plan);
        plans.push(plan);
    }
    Ok((plans, total))
}

fn write_tags(
    tags: &[Tag],
    plans: &TagPlans,
    writer: &mut BitWriter,
    ctx: &mut Context<'_>,
) -> Result<()> {
    for (tag, plan) in tags.iter().zip(plans) {
        write_prepared(tag, plan, writer, ctx)?;
    }
    Ok(())
}

fn check_total(record: &'static str, offset: usize, declared: usize, position: usize) -> Result<()> {
    let end = (offset + declared) * 8;
    if position != end {
        return Err(FramingError::RecordLengthMismatch {
            record,
            offset,
            declared,
            delta: byte_delta(position as i64 - end as i64),
        }
        .into());
    }
    Ok(())
}

/// Fields between the file length and the first tag.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieHeader {
    pub version: u8,
    /// Stage size in twips
    pub frame_size: Bounds,
    /// Frames per second, unsigned 8.8 fixed point on the wire
    pub frame_rate: f32,
    pub frame_count: u16,
}

impl MovieHeader {
    fn frame_rate_raw(&self) -> Result<u16> {
        let raw = (f64::from(self.frame_rate) * 256.0).round() as i64;
        check_range("frame rate", raw, 0, i64::from(u16::MAX))?;
        Ok(raw as u16)
    }

    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        Ok(PREAMBLE_LEN + self.frame_size.encoded_len(ctx)? + 4)
    }
}

/// An uncompressed movie: header plus tags.
///
/// `tags` does not hold the terminating `End` tag; decoding stops at it and
/// encoding appends it.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub header: MovieHeader,
    pub tags: Vec<Tag>,
}

impl Movie {
    /// Decode a complete movie file.
    ///
    /// The movie's version becomes the context's version, so string encoding
    /// follows the file.
    pub fn decode(bytes: &[u8], ctx: &mut Context<'_>) -> Result<Self> {
        let mut reader = BitReader::new(bytes);
        let signature: [u8; 3] = [
            reader.read_byte()?,
            reader.read_byte()?,
            reader.read_byte()?,
        ];
        if COMPRESSED_SIGNATURES.contains(&signature) {
            return Err(FramingError::CompressedMovie(signature).into());
        }
        if signature != SIGNATURE {
            return Err(FramingError::InvalidSignature(signature).into());
        }

        let version = reader.read_byte()?;
        ctx.set_version(version);
        let file_length = reader.read_u32()? as usize;
        if file_length != bytes.len() {
            return Err(FramingError::RecordLengthMismatch {
                record: "Movie",
                offset: 0,
                declared: file_length,
                delta: bytes.len() as i64 - file_length as i64,
            }
            .into());
        }

        let frame_size = Bounds::decode(&mut reader, ctx)?;
        let frame_rate = f32::from(reader.read_u16()?) / 256.0;
        let frame_count = reader.read_u16()?;
        debug!(version, file_length, frame_count, "movie header");

        let mut tags = Vec::new();
        while !reader.eof() {
            match read_record::<Tag>(&mut reader, ctx)? {
                Tag::End => break,
                tag => tags.push(tag),
            }
        }
        if !reader.eof() {
            warn!(
                trailing = reader.bits_remaining() / 8,
                "bytes after the end tag ignored"
            );
        }

        Ok(Self {
            header: MovieHeader {
                version,
                frame_size,
                frame_rate,
                frame_count,
            },
            tags,
        })
    }

    /// Encode the movie, appending the `End` tag.
    ///
    /// `tags` must not contain `End` itself.
    pub fn encode(&self, ctx: &mut Context<'_>) -> Result<Vec<u8>> {
        if let Some(index) = self.tags.iter().position(|tag| *tag == Tag::End) {
            return Err(FramingError::MisplacedEnd { index }.into());
        }
        ctx.set_version(self.header.version);
        let header_len = self.header.encoded_len(ctx)?;
        let frame_rate = self.header.frame_rate_raw()?;

        let (plans, tags_len) = prepare_tags(&self.tags, ctx)?;
        let end_plan = Tag::End.prepare(ctx)?;
        let total = header_len + tags_len + framed_len(&Tag::End, &end_plan);
        let file_length = u32::try_from(total).map_err(|_| FramingError::MalformedHeader {
            offset: 4,
            reason: "movie longer than 4 GiB",
        })?;

        let mut writer = BitWriter::sized(total);
        writer.write_bytes(&SIGNATURE)?;
        writer.write_byte(self.header.version)?;
        writer.write_u32(file_length)?;
        self.header.frame_size.encode(&mut writer, ctx)?;
        writer.write_u16(frame_rate)?;
        writer.write_u16(self.header.frame_count)?;

        write_tags(&self.tags, &plans, &mut writer, ctx)?;
        write_prepared(&Tag::End, &end_plan, &mut writer, ctx)?;
        check_total("Movie", 0, total, writer.position())?;
        Ok(writer.finish())
    }
}
