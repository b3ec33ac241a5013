//! Display filters applied to placed objects.
//!
//! Each filter starts with a type byte dispatched through the registry.
//! Filter colors always carry alpha, whatever the enclosing record uses.

use crate::bitio::{BitReader, BitWriter};
use crate::context::{Context, Flag};
use crate::error::{check_range, Error, Result};
use crate::registry::{Discriminant, Registry};

use super::color::Color;
use super::style::GradientStop;
use super::Element;

/// Filter type bytes.
pub mod codes {
    pub const DROP_SHADOW: u16 = 0;
    pub const BLUR: u16 = 1;
    pub const GLOW: u16 = 2;
    pub const BEVEL: u16 = 3;
    pub const GRADIENT_GLOW: u16 = 4;
    pub const CONVOLUTION: u16 = 5;
    pub const COLOR_MATRIX: u16 = 6;
    pub const GRADIENT_BEVEL: u16 = 7;
}

/// Compositing switches shared by the shadow, glow and bevel filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterMode {
    pub inner: bool,
    pub knockout: bool,
    pub composite_source: bool,
    /// Only written by filters with a 4-bit pass count
    pub on_top: bool,
    pub passes: u8,
}

impl FilterMode {
    pub fn passes(passes: u8) -> Self {
        Self {
            composite_source: true,
            passes,
            ..Self::default()
        }
    }

    /// Write the mode byte; `with_on_top` selects the 4-bit pass layout.
    fn encode(&self, with_on_top: bool, writer: &mut BitWriter) -> Result<()> {
        writer.write_bool(self.inner)?;
        writer.write_bool(self.knockout)?;
        writer.write_bool(self.composite_source)?;
        if with_on_top {
            writer.write_bool(self.on_top)?;
            writer.write_ubits(u32::from(self.passes), 4)
        } else {
            writer.write_ubits(u32::from(self.passes), 5)
        }
    }

    fn decode(with_on_top: bool, reader: &mut BitReader<'_>) -> Result<Self> {
        let inner = reader.read_bool()?;
        let knockout = reader.read_bool()?;
        let composite_source = reader.read_bool()?;
        let (on_top, passes) = if with_on_top {
            (reader.read_bool()?, reader.read_ubits(4)?)
        } else {
            (false, reader.read_ubits(5)?)
        };
        Ok(Self {
            inner,
            knockout,
            composite_source,
            on_top,
            passes: passes as u8,
        })
    }

    fn validate(&self, with_on_top: bool) -> Result<()> {
        let max = if with_on_top { 15 } else { 31 };
        check_range("passes", i64::from(self.passes), 0, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropShadow {
    pub color: Color,
    pub blur_x: f32,
    pub blur_y: f32,
    /// Radians
    pub angle: f32,
    pub distance: f32,
    pub strength: f32,
    pub mode: FilterMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blur {
    pub blur_x: f32,
    pub blur_y: f32,
    pub passes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub color: Color,
    pub blur_x: f32,
    pub blur_y: f32,
    pub strength: f32,
    pub mode: FilterMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bevel {
    pub shadow: Color,
    pub highlight: Color,
    pub blur_x: f32,
    pub blur_y: f32,
    pub angle: f32,
    pub distance: f32,
    pub strength: f32,
    pub mode: FilterMode,
}

/// Body shared by the gradient glow and gradient bevel filters.
///
/// On the wire the stop colors come first as one list and the ratios follow
/// as a second list of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientFilter {
    pub stops: Vec<GradientStop>,
    pub blur_x: f32,
    pub blur_y: f32,
    pub angle: f32,
    pub distance: f32,
    pub strength: f32,
    pub mode: FilterMode,
}

/// A convolution kernel applied to every pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Convolution {
    /// Kernel rows; every row has the same length
    pub matrix: Vec<Vec<f32>>,
    pub divisor: f32,
    pub bias: f32,
    pub default_color: Color,
    pub clamp: bool,
    pub preserve_alpha: bool,
}

impl Convolution {
    pub fn new(matrix: Vec<Vec<f32>>, divisor: f32, bias: f32) -> Result<Self> {
        let convolution = Self {
            matrix,
            divisor,
            bias,
            default_color: Color::rgba(0, 0, 0, 0),
            clamp: true,
            preserve_alpha: true,
        };
        convolution.dimensions()?;
        Ok(convolution)
    }

    /// Columns and rows, derived from the kernel.
    fn dimensions(&self) -> Result<(usize, usize)> {
        let rows = self.matrix.len();
        let columns = self.matrix.first().map_or(0, Vec::len);
        check_range("convolution rows", rows as i64, 0, 255)?;
        check_range("convolution columns", columns as i64, 0, 255)?;
        if let Some(row) = self.matrix.iter().find(|row| row.len() != columns) {
            return Err(Error::ValueOutOfRange {
                field: "convolution row length",
                value: row.len() as i64,
                min: columns as i64,
                max: columns as i64,
            });
        }
        Ok((columns, rows))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    DropShadow(DropShadow),
    Blur(Blur),
    Glow(Glow),
    Bevel(Bevel),
    GradientGlow(GradientFilter),
    Convolution(Convolution),
    ColorMatrix([f32; 20]),
    GradientBevel(GradientFilter),
}

impl Filter {
    pub fn code(&self) -> u16 {
        match self {
            Filter::DropShadow(_) => codes::DROP_SHADOW,
            Filter::Blur(_) => codes::BLUR,
            Filter::Glow(_) => codes::GLOW,
            Filter::Bevel(_) => codes::BEVEL,
            Filter::GradientGlow(_) => codes::GRADIENT_GLOW,
            Filter::Convolution(_) => codes::CONVOLUTION,
            Filter::ColorMatrix(_) => codes::COLOR_MATRIX,
            Filter::GradientBevel(_) => codes::GRADIENT_BEVEL,
        }
    }

    fn body_len(&self) -> Result<usize> {
        Ok(match self {
            Filter::DropShadow(f) => {
                f.mode.validate(false)?;
                4 + 16 + 2 + 1
            }
            Filter::Blur(f) => {
                check_range("passes", i64::from(f.passes), 0, 31)?;
                8 + 1
            }
            Filter::Glow(f) => {
                f.mode.validate(false)?;
                4 + 8 + 2 + 1
            }
            Filter::Bevel(f) => {
                f.mode.validate(true)?;
                8 + 16 + 2 + 1
            }
            Filter::GradientGlow(f) | Filter::GradientBevel(f) => {
                f.mode.validate(true)?;
                check_range("gradient stops", f.stops.len() as i64, 0, 255)?;
                1 + f.stops.len() * 5 + 16 + 2 + 1
            }
            Filter::Convolution(f) => {
                let (columns, rows) = f.dimensions()?;
                2 + 8 + columns * rows * 4 + 4 + 1
            }
            Filter::ColorMatrix(_) => 80,
        })
    }

    fn encode_body(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        match self {
            Filter::DropShadow(f) => {
                f.color.encode(writer, ctx)?;
                write_fixed16s(writer, &[f.blur_x, f.blur_y, f.angle, f.distance])?;
                writer.write_fixed8(f.strength)?;
                f.mode.encode(false, writer)
            }
            Filter::Blur(f) => {
                write_fixed16s(writer, &[f.blur_x, f.blur_y])?;
                writer.write_ubits(u32::from(f.passes), 5)?;
                writer.write_ubits(0, 3)
            }
            Filter::Glow(f) => {
                f.color.encode(writer, ctx)?;
                write_fixed16s(writer, &[f.blur_x, f.blur_y])?;
                writer.write_fixed8(f.strength)?;
                f.mode.encode(false, writer)
            }
            Filter::Bevel(f) => {
                f.shadow.encode(writer, ctx)?;
                f.highlight.encode(writer, ctx)?;
                write_fixed16s(writer, &[f.blur_x, f.blur_y, f.angle, f.distance])?;
                writer.write_fixed8(f.strength)?;
                f.mode.encode(true, writer)
            }
            Filter::GradientGlow(f) | Filter::GradientBevel(f) => {
                writer.write_byte(f.stops.len() as u8)?;
                for stop in &f.stops {
                    stop.color.encode(writer, ctx)?;
                }
                for stop in &f.stops {
                    writer.write_byte(stop.ratio)?;
                }
                write_fixed16s(writer, &[f.blur_x, f.blur_y, f.angle, f.distance])?;
                writer.write_fixed8(f.strength)?;
                f.mode.encode(true, writer)
            }
            Filter::Convolution(f) => {
                let (columns, rows) = f.dimensions()?;
                writer.write_byte(columns as u8)?;
                writer.write_byte(rows as u8)?;
                writer.write_f32(f.divisor)?;
                writer.write_f32(f.bias)?;
                for value in f.matrix.iter().flatten() {
                    writer.write_f32(*value)?;
                }
                f.default_color.encode(writer, ctx)?;
                writer.write_ubits(0, 6)?;
                writer.write_bool(f.clamp)?;
                writer.write_bool(f.preserve_alpha)
            }
            Filter::ColorMatrix(values) => {
                for value in values {
                    writer.write_f32(*value)?;
                }
                Ok(())
            }
        }
    }
}

fn write_fixed16s(writer: &mut BitWriter, values: &[f32]) -> Result<()> {
    for value in values {
        writer.write_fixed16(*value)?;
    }
    Ok(())
}

impl Element for Filter {
    fn encoded_len(&self, _ctx: &mut Context<'_>) -> Result<usize> {
        Ok(1 + self.body_len()?)
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        writer.write_byte(self.code() as u8)?;
        ctx.with_flag(Flag::Alpha, true, |ctx| self.encode_body(writer, ctx))
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self> {
        reader.align();
        let offset = reader.position() / 8;
        let code = u16::from(reader.read_byte()?);
        let key = Discriminant::unframed(code, offset, reader.position());
        let registry = ctx.registry();
        ctx.with_flag(Flag::Alpha, true, |ctx| registry.decode(&key, reader, ctx))
    }
}

/// Read the colors and ratios lists of a gradient filter in one pass over
/// the stops, keeping one checkpoint in each list.
fn read_gradient_stops(
    reader: &mut BitReader<'_>,
    ctx: &mut Context<'_>,
) -> Result<Vec<GradientStop>> {
    let count = usize::from(reader.read_byte()?);
    let mut colors = reader.mark();
    reader.adjust((count * 4 * 8) as i64)?;
    let mut ratios = reader.mark();

    let mut stops = Vec::with_capacity(count);
    for _ in 0..count {
        reader.reset(colors)?;
        let color = Color::decode(reader, ctx)?;
        colors = reader.mark();

        reader.reset(ratios)?;
        let ratio = reader.read_byte()?;
        ratios = reader.mark();

        stops.push(GradientStop { ratio, color });
    }
    reader.reset(ratios)?;
    Ok(stops)
}

fn read_gradient_filter(
    reader: &mut BitReader<'_>,
    ctx: &mut Context<'_>,
) -> Result<GradientFilter> {
    let stops = read_gradient_stops(reader, ctx)?;
    Ok(GradientFilter {
        stops,
        blur_x: reader.read_fixed16()?,
        blur_y: reader.read_fixed16()?,
        angle: reader.read_fixed16()?,
        distance: reader.read_fixed16()?,
        strength: reader.read_fixed8()?,
        mode: FilterMode::decode(true, reader)?,
    })
}

pub(crate) fn register_defaults(registry: &mut Registry) {
    registry.register(codes::DROP_SHADOW, |reader, ctx, _key: &Discriminant| {
        Ok(Filter::DropShadow(DropShadow {
            color: Color::decode(reader, ctx)?,
            blur_x: reader.read_fixed16()?,
            blur_y: reader.read_fixed16()?,
            angle: reader.read_fixed16()?,
            distance: reader.read_fixed16()?,
            strength: reader.read_fixed8()?,
            mode: FilterMode::decode(false, reader)?,
        }))
    });
    registry.register(codes::BLUR, |reader, _ctx, _key: &Discriminant| {
        let blur_x = reader.read_fixed16()?;
        let blur_y = reader.read_fixed16()?;
        let passes = reader.read_ubits(5)? as u8;
        reader.read_ubits(3)?;
        Ok(Filter::Blur(Blur {
            blur_x,
            blur_y,
            passes,
        }))
    });
    registry.register(codes::GLOW, |reader, ctx, _key: &Discriminant| {
        Ok(Filter::Glow(Glow {
            color: Color::decode(reader, ctx)?,
            blur_x: reader.read_fixed16()?,
            blur_y: reader.read_fixed16()?,
            strength: reader.read_fixed8()?,
            mode: FilterMode::decode(false, reader)?,
        }))
    });
    registry.register(codes::BEVEL, |reader, ctx, _key: &Discriminant| {
        Ok(Filter::Bevel(Bevel {
            shadow: Color::decode(reader, ctx)?,
            highlight: Color::decode(reader, ctx)?,
            blur_x: reader.read_fixed16()?,
            blur_y: reader.read_fixed16()?,
            angle: reader.read_fixed16()?,
            distance: reader.read_fixed16()?,
            strength: reader.read_fixed8()?,
            mode: FilterMode::decode(true, reader)?,
        }))
    });
    registry.register(codes::GRADIENT_GLOW, |reader, ctx, _key: &Discriminant| {
        Ok(Filter::GradientGlow(read_gradient_filter(reader, ctx)?))
    });
    registry.register(codes::CONVOLUTION, |reader, ctx, _key: &Discriminant| {
        let columns = usize::from(reader.read_byte()?);
        let rows = usize::from(reader.read_byte()?);
        let divisor = reader.read_f32()?;
        let bias = reader.read_f32()?;
        let mut matrix = Vec::with_capacity(rows);
        for _ in 0..rows {
            let mut row = Vec::with_capacity(columns);
            for _ in 0..columns {
                row.push(reader.read_f32()?);
            }
            matrix.push(row);
        }
        let default_color = Color::decode(reader, ctx)?;
        reader.read_ubits(6)?;
        let clamp = reader.read_bool()?;
        let preserve_alpha = reader.read_bool()?;
        Ok(Filter::Convolution(Convolution {
            matrix,
            divisor,
            bias,
            default_color,
            clamp,
            preserve_alpha,
        }))
    });
    registry.register(codes::COLOR_MATRIX, |reader, _ctx, _key: &Discriminant| {
        let mut values = [0.0f32; 20];
        for value in values.iter_mut() {
            *value = reader.read_f32()?;
        }
        Ok(Filter::ColorMatrix(values))
    });
    registry.register(codes::GRADIENT_BEVEL, |reader, ctx, _key: &Discriminant| {
        Ok(Filter::GradientBevel(read_gradient_filter(reader, ctx)?))
    });
}

/// Encoded size of a filter list with its count byte.
pub(crate) fn filters_len(filters: &[Filter], ctx: &mut Context<'_>) -> Result<usize> {
    check_range("filter count", filters.len() as i64, 0, 255)?;
    Ok(1 + super::list_len(filters, ctx)?)
}

pub(crate) fn write_filters(
    filters: &[Filter],
    writer: &mut BitWriter,
    ctx: &mut Context<'_>,
) -> Result<()> {
    check_range("filter count", filters.len() as i64, 0, 255)?;
    writer.write_byte(filters.len() as u8)?;
    for filter in filters {
        filter.encode(writer, ctx)?;
    }
    Ok(())
}

pub(crate) fn read_filters(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Vec<Filter>> {
    let count = reader.read_byte()?;
    (0..count).map(|_| Filter::decode(reader, ctx)).collect()
}
