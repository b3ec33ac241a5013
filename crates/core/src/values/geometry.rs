//! Bit-packed rectangles and coordinate transforms.
//!
//! Both are written as groups of signed fields sharing one width, where each
//! group is prefixed by a 5-bit width and the whole value is byte aligned.

use crate::bitio::{BitReader, BitWriter};
use crate::context::Context;
use crate::error::{check_range, Error, Result};

use super::{field_width, Element};

/// Widest field a 5-bit width prefix can announce.
const MAX_WIDTH: u32 = 31;

/// Coordinate limits, in twips, for a 31-bit field.
pub const MIN_COORD: i32 = -(1 << 30);
pub const MAX_COORD: i32 = (1 << 30) - 1;

fn group_width(field: &'static str, values: &[i32]) -> Result<u32> {
    let width = field_width(values);
    if width > MAX_WIDTH {
        return Err(Error::ValueOutOfRange {
            field,
            value: i64::from(width),
            min: 0,
            max: i64::from(MAX_WIDTH),
        });
    }
    Ok(width)
}

/// An axis-aligned rectangle in twips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Result<Self> {
        let bounds = Self {
            min_x,
            min_y,
            max_x,
            max_y,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.max_y) - i64::from(self.min_y)
    }

    fn validate(&self) -> Result<()> {
        let (min, max) = (i64::from(MIN_COORD), i64::from(MAX_COORD));
        check_range("min_x", i64::from(self.min_x), min, max)?;
        check_range("min_y", i64::from(self.min_y), min, max)?;
        check_range("max_x", i64::from(self.max_x), min, max)?;
        check_range("max_y", i64::from(self.max_y), min, max)
    }

    /// Fields in wire order.
    fn fields(&self) -> [i32; 4] {
        [self.min_x, self.max_x, self.min_y, self.max_y]
    }
}

impl Element for Bounds {
    fn encoded_len(&self, _ctx: &mut Context<'_>) -> Result<usize> {
        self.validate()?;
        let width = field_width(&self.fields()) as usize;
        Ok((5 + 4 * width).div_ceil(8))
    }

    fn encode(&self, writer: &mut BitWriter, _ctx: &mut Context<'_>) -> Result<()> {
        self.validate()?;
        let fields = self.fields();
        let width = field_width(&fields);

        writer.align()?;
        writer.write_ubits(width, 5)?;
        for value in fields {
            writer.write_sbits(value, width)?;
        }
        writer.align()
    }

    fn decode(reader: &mut BitReader<'_>, _ctx: &mut Context<'_>) -> Result<Self> {
        reader.align();
        let width = reader.read_ubits(5)?;
        let min_x = reader.read_sbits(width)?;
        let max_x = reader.read_sbits(width)?;
        let min_y = reader.read_sbits(width)?;
        let max_y = reader.read_sbits(width)?;
        reader.align();
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }
}

/// A 2D affine transform.
///
/// Scale and rotate terms are raw signed 16.16 fixed point; translation is in
/// twips. Absent scale means 1.0 and absent rotation means 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordTransform {
    pub scale: Option<(i32, i32)>,
    pub rotate: Option<(i32, i32)>,
    pub translate_x: i32,
    pub translate_y: i32,
}

fn to_fixed16(value: f32) -> i32 {
    (f64::from(value) * 65536.0).round() as i32
}

impl CoordTransform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn translation(x: i32, y: i32) -> Self {
        Self {
            translate_x: x,
            translate_y: y,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, x: f32, y: f32) -> Self {
        self.scale = Some((to_fixed16(x), to_fixed16(y)));
        self
    }

    pub fn with_rotation(mut self, skew0: f32, skew1: f32) -> Self {
        self.rotate = Some((to_fixed16(skew0), to_fixed16(skew1)));
        self
    }

    fn bit_len(&self) -> Result<usize> {
        let mut bits = 1 + 1 + 5;
        if let Some((x, y)) = self.scale {
            bits += 5 + 2 * group_width("scale", &[x, y])? as usize;
        }
        if let Some((a, b)) = self.rotate {
            bits += 5 + 2 * group_width("rotate", &[a, b])? as usize;
        }
        bits += 2 * group_width("translate", &[self.translate_x, self.translate_y])? as usize;
        Ok(bits)
    }
}

fn write_pair(writer: &mut BitWriter, field: &'static str, a: i32, b: i32) -> Result<()> {
    let width = group_width(field, &[a, b])?;
    writer.write_ubits(width, 5)?;
    writer.write_sbits(a, width)?;
    writer.write_sbits(b, width)
}

fn read_pair(reader: &mut BitReader<'_>) -> Result<(i32, i32)> {
    let width = reader.read_ubits(5)?;
    Ok((reader.read_sbits(width)?, reader.read_sbits(width)?))
}

impl Element for CoordTransform {
    fn encoded_len(&self, _ctx: &mut Context<'_>) -> Result<usize> {
        Ok(self.bit_len()?.div_ceil(8))
    }

    fn encode(&self, writer: &mut BitWriter, _ctx: &mut Context<'_>) -> Result<()> {
        writer.align()?;
        writer.write_bool(self.scale.is_some())?;
        if let Some((x, y)) = self.scale {
            write_pair(writer, "scale", x, y)?;
        }
        writer.write_bool(self.rotate.is_some())?;
        if let Some((a, b)) = self.rotate {
            write_pair(writer, "rotate", a, b)?;
        }
        write_pair(writer, "translate", self.translate_x, self.translate_y)?;
        writer.align()
    }

    fn decode(reader: &mut BitReader<'_>, _ctx: &mut Context<'_>) -> Result<Self> {
        reader.align();
        let scale = if reader.read_bool()? {
            Some(read_pair(reader)?)
        } else {
            None
        };
        let rotate = if reader.read_bool()? {
            Some(read_pair(reader)?)
        } else {
            None
        };
        let (translate_x, translate_y) = read_pair(reader)?;
        reader.align();
        Ok(Self {
            scale,
            rotate,
            translate_x,
            translate_y,
        })
    }
}
