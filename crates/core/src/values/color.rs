//! Colors and color transforms.

use crate::bitio::{BitReader, BitWriter};
use crate::context::{Context, Flag};
use crate::error::{check_range, Result};

use super::{field_width, Element};

/// An RGB color, with an alpha channel when the context carries [`Flag::Alpha`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    /// An opaque color.
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }

    pub fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

impl Color {
    /// Without an alpha channel on the wire only opaque colors survive.
    fn check_representable(&self, ctx: &Context<'_>) -> Result<()> {
        if ctx.flag(Flag::Alpha) {
            return Ok(());
        }
        check_range("alpha", i64::from(self.alpha), 255, 255)
    }
}

impl Element for Color {
    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        self.check_representable(ctx)?;
        Ok(if ctx.flag(Flag::Alpha) { 4 } else { 3 })
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        self.check_representable(ctx)?;
        writer.write_byte(self.red)?;
        writer.write_byte(self.green)?;
        writer.write_byte(self.blue)?;
        if ctx.flag(Flag::Alpha) {
            writer.write_byte(self.alpha)?;
        }
        Ok(())
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self> {
        let red = reader.read_byte()?;
        let green = reader.read_byte()?;
        let blue = reader.read_byte()?;
        let alpha = if ctx.flag(Flag::Alpha) {
            reader.read_byte()?
        } else {
            255
        };
        Ok(Self::rgba(red, green, blue, alpha))
    }
}

/// Smallest and largest transform term the 4-bit width field allows.
const MIN_TERM: i32 = -16384;
const MAX_TERM: i32 = 16383;

/// Per-channel multiply and add terms, in red, green, blue, alpha order.
///
/// Terms are signed 8.8 fixed point: a multiply term of 256 leaves the channel
/// unchanged. The alpha terms are only written when the context carries
/// [`Flag::Alpha`]; decoded without it they come back as the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTransform {
    pub multiply: Option<[i32; 4]>,
    pub add: Option<[i32; 4]>,
}

impl ColorTransform {
    pub const IDENTITY_MULTIPLY: [i32; 4] = [256, 256, 256, 256];

    pub fn new(multiply: Option<[i32; 4]>, add: Option<[i32; 4]>) -> Result<Self> {
        let transform = Self { multiply, add };
        transform.validate()?;
        Ok(transform)
    }

    /// A transform that changes nothing.
    pub fn identity() -> Self {
        Self {
            multiply: None,
            add: None,
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, terms) in [("multiply", self.multiply), ("add", self.add)] {
            for term in terms.iter().flatten() {
                check_range(field, i64::from(*term), i64::from(MIN_TERM), i64::from(MAX_TERM))?;
            }
        }
        Ok(())
    }

    fn channel_count(ctx: &Context<'_>) -> usize {
        if ctx.flag(Flag::Alpha) {
            4
        } else {
            3
        }
    }

    /// The terms that go on the wire, multiply terms first.
    fn written_terms(&self, channels: usize) -> Vec<i32> {
        let mut terms = Vec::with_capacity(channels * 2);
        if let Some(multiply) = &self.multiply {
            terms.extend_from_slice(&multiply[..channels]);
        }
        if let Some(add) = &self.add {
            terms.extend_from_slice(&add[..channels]);
        }
        terms
    }
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Element for ColorTransform {
    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        self.validate()?;
        let terms = self.written_terms(Self::channel_count(ctx));
        let bits = 6 + field_width(&terms) as usize * terms.len();
        Ok(bits.div_ceil(8))
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        self.validate()?;
        let terms = self.written_terms(Self::channel_count(ctx));
        let width = field_width(&terms);

        writer.align()?;
        writer.write_bool(self.add.is_some())?;
        writer.write_bool(self.multiply.is_some())?;
        writer.write_ubits(width, 4)?;
        for term in terms {
            writer.write_sbits(term, width)?;
        }
        writer.align()
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self> {
        let channels = Self::channel_count(ctx);
        reader.align();
        let has_add = reader.read_bool()?;
        let has_multiply = reader.read_bool()?;
        let width = reader.read_ubits(4)?;

        let mut read_terms = |default_alpha: i32| -> Result<[i32; 4]> {
            let mut terms = [0, 0, 0, default_alpha];
            for term in terms.iter_mut().take(channels) {
                *term = reader.read_sbits(width)?;
            }
            Ok(terms)
        };
        let multiply = if has_multiply {
            Some(read_terms(256)?)
        } else {
            None
        };
        let add = if has_add { Some(read_terms(0)?) } else { None };

        reader.align();
        Ok(Self { multiply, add })
    }
}
