//! Fill and line styles.
//!
//! Fill styles are dispatched through the registry on their leading type
//! byte. Line styles have no type byte: the enclosing shape decides which
//! kind it holds.

use crate::bitio::{BitReader, BitWriter};
use crate::context::{Context, Flag};
use crate::error::{check_range, Error, Result};
use crate::registry::{Discriminant, Registry};

use super::color::Color;
use super::geometry::CoordTransform;
use super::{list_len, Element};

/// Most stops a gradient's 4-bit count can hold.
pub const MAX_GRADIENT_STOPS: usize = 15;

/// Fill style type bytes.
pub mod codes {
    pub const SOLID: u16 = 0x00;
    pub const LINEAR: u16 = 0x10;
    pub const RADIAL: u16 = 0x12;
    pub const FOCAL: u16 = 0x13;
    pub const BITMAP_REPEAT: u16 = 0x40;
    pub const BITMAP_CLIPPED: u16 = 0x41;
    pub const BITMAP_REPEAT_HARD: u16 = 0x42;
    pub const BITMAP_CLIPPED_HARD: u16 = 0x43;
}

/// One color position along a gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientStop {
    /// Position along the gradient, 0 to 255
    pub ratio: u8,
    pub color: Color,
}

impl GradientStop {
    pub fn new(ratio: u8, color: Color) -> Self {
        Self { ratio, color }
    }
}

/// Color stops plus spread and interpolation modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Gradient {
    /// 0 = pad, 1 = reflect, 2 = repeat
    pub spread: u8,
    /// 0 = normal RGB, 1 = linear RGB
    pub interpolation: u8,
    pub stops: Vec<GradientStop>,
}

impl Gradient {
    pub fn new(stops: Vec<GradientStop>) -> Result<Self> {
        let gradient = Self {
            spread: 0,
            interpolation: 0,
            stops,
        };
        gradient.validate()?;
        Ok(gradient)
    }

    fn validate(&self) -> Result<()> {
        check_range("spread", i64::from(self.spread), 0, 3)?;
        check_range("interpolation", i64::from(self.interpolation), 0, 3)?;
        check_range(
            "gradient stops",
            self.stops.len() as i64,
            0,
            MAX_GRADIENT_STOPS as i64,
        )
    }
}

impl Element for Gradient {
    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        self.validate()?;
        let mut len = 1;
        for stop in &self.stops {
            len += 1 + stop.color.encoded_len(ctx)?;
        }
        Ok(len)
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        self.validate()?;
        writer.write_ubits(u32::from(self.spread), 2)?;
        writer.write_ubits(u32::from(self.interpolation), 2)?;
        writer.write_ubits(self.stops.len() as u32, 4)?;
        for stop in &self.stops {
            writer.write_byte(stop.ratio)?;
            stop.color.encode(writer, ctx)?;
        }
        Ok(())
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self> {
        let spread = reader.read_ubits(2)? as u8;
        let interpolation = reader.read_ubits(2)? as u8;
        let count = reader.read_ubits(4)? as usize;
        let mut stops = Vec::with_capacity(count);
        for _ in 0..count {
            let ratio = reader.read_byte()?;
            let color = Color::decode(reader, ctx)?;
            stops.push(GradientStop { ratio, color });
        }
        Ok(Self {
            spread,
            interpolation,
            stops,
        })
    }
}

/// How an area is filled.
#[derive(Debug, Clone, PartialEq)]
pub enum FillStyle {
    Solid(Color),
    Linear {
        gradient: Gradient,
        transform: CoordTransform,
    },
    Radial {
        gradient: Gradient,
        transform: CoordTransform,
    },
    Focal {
        gradient: Gradient,
        transform: CoordTransform,
        /// Signed 8.8 position of the focal point, -1.0 to 1.0
        focal_point: f32,
    },
    Bitmap {
        bitmap: u16,
        transform: CoordTransform,
        repeat: bool,
        smoothed: bool,
    },
}

impl FillStyle {
    /// The type byte this style is written with.
    pub fn code(&self) -> u16 {
        match self {
            FillStyle::Solid(_) => codes::SOLID,
            FillStyle::Linear { .. } => codes::LINEAR,
            FillStyle::Radial { .. } => codes::RADIAL,
            FillStyle::Focal { .. } => codes::FOCAL,
            FillStyle::Bitmap {
                repeat, smoothed, ..
            } => codes::BITMAP_REPEAT | u16::from(!repeat) | (u16::from(!smoothed) << 1),
        }
    }
}

impl Element for FillStyle {
    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        let body = match self {
            FillStyle::Solid(color) => color.encoded_len(ctx)?,
            FillStyle::Linear {
                gradient,
                transform,
            }
            | FillStyle::Radial {
                gradient,
                transform,
            } => transform.encoded_len(ctx)? + gradient.encoded_len(ctx)?,
            FillStyle::Focal {
                gradient,
                transform,
                ..
            } => transform.encoded_len(ctx)? + gradient.encoded_len(ctx)? + 2,
            FillStyle::Bitmap { transform, .. } => 2 + transform.encoded_len(ctx)?,
        };
        Ok(1 + body)
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        writer.write_byte(self.code() as u8)?;
        match self {
            FillStyle::Solid(color) => color.encode(writer, ctx),
            FillStyle::Linear {
                gradient,
                transform,
            }
            | FillStyle::Radial {
                gradient,
                transform,
            } => {
                transform.encode(writer, ctx)?;
                gradient.encode(writer, ctx)
            }
            FillStyle::Focal {
                gradient,
                transform,
                focal_point,
            } => {
                transform.encode(writer, ctx)?;
                gradient.encode(writer, ctx)?;
                writer.write_fixed8(*focal_point)
            }
            FillStyle::Bitmap {
                bitmap, transform, ..
            } => {
                writer.write_u16(*bitmap)?;
                transform.encode(writer, ctx)
            }
        }
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self> {
        reader.align();
        let offset = reader.position() / 8;
        let code = u16::from(reader.read_byte()?);
        let key = Discriminant::unframed(code, offset, reader.position());
        ctx.registry().decode(&key, reader, ctx)
    }
}

fn decode_gradient_parts(
    reader: &mut BitReader<'_>,
    ctx: &mut Context<'_>,
) -> Result<(Gradient, CoordTransform)> {
    let transform = CoordTransform::decode(reader, ctx)?;
    let gradient = Gradient::decode(reader, ctx)?;
    Ok((gradient, transform))
}

pub(crate) fn register_defaults(registry: &mut Registry) {
    registry.register(codes::SOLID, |reader, ctx, _key: &Discriminant| {
        Ok(FillStyle::Solid(Color::decode(reader, ctx)?))
    });
    registry.register(codes::LINEAR, |reader, ctx, _key: &Discriminant| {
        let (gradient, transform) = decode_gradient_parts(reader, ctx)?;
        Ok(FillStyle::Linear {
            gradient,
            transform,
        })
    });
    registry.register(codes::RADIAL, |reader, ctx, _key: &Discriminant| {
        let (gradient, transform) = decode_gradient_parts(reader, ctx)?;
        Ok(FillStyle::Radial {
            gradient,
            transform,
        })
    });
    registry.register(codes::FOCAL, |reader, ctx, _key: &Discriminant| {
        let (gradient, transform) = decode_gradient_parts(reader, ctx)?;
        let focal_point = reader.read_fixed8()?;
        Ok(FillStyle::Focal {
            gradient,
            transform,
            focal_point,
        })
    });
    for code in codes::BITMAP_REPEAT..=codes::BITMAP_CLIPPED_HARD {
        registry.register(code, |reader, ctx, key: &Discriminant| {
            let bitmap = reader.read_u16()?;
            let transform = CoordTransform::decode(reader, ctx)?;
            Ok(FillStyle::Bitmap {
                bitmap,
                transform,
                repeat: key.code & 1 == 0,
                smoothed: key.code & 2 == 0,
            })
        });
    }
}

/// A stroke with a width and a color, used by the earlier shape versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStyle1 {
    /// Stroke width in twips
    pub width: u16,
    pub color: Color,
}

impl LineStyle1 {
    pub fn new(width: u32, color: Color) -> Result<Self> {
        check_range("line width", i64::from(width), 0, i64::from(u16::MAX))?;
        Ok(Self {
            width: width as u16,
            color,
        })
    }
}

impl Element for LineStyle1 {
    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        Ok(2 + self.color.encoded_len(ctx)?)
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        writer.write_u16(self.width)?;
        self.color.encode(writer, ctx)
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self> {
        let width = reader.read_u16()?;
        let color = Color::decode(reader, ctx)?;
        Ok(Self { width, color })
    }
}

/// Shape of a line end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapStyle {
    #[default]
    Round,
    None,
    Square,
}

impl CapStyle {
    fn to_bits(self) -> u32 {
        match self {
            CapStyle::Round => 0,
            CapStyle::None => 1,
            CapStyle::Square => 2,
        }
    }

    fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(CapStyle::Round),
            1 => Ok(CapStyle::None),
            2 => Ok(CapStyle::Square),
            other => Err(Error::ValueOutOfRange {
                field: "cap style",
                value: i64::from(other),
                min: 0,
                max: 2,
            }),
        }
    }
}

/// Shape of a corner between two segments.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JoinStyle {
    #[default]
    Round,
    Bevel,
    /// Miter with a limit factor (unsigned 8.8)
    Miter(f32),
}

/// Miter limit as its unsigned 8.8 wire value.
fn miter_limit_raw(limit: f32) -> Result<u16> {
    let raw = (f64::from(limit) * 256.0).round() as i64;
    check_range("miter limit", raw, 0, i64::from(u16::MAX))?;
    Ok(raw as u16)
}

impl JoinStyle {
    fn to_bits(self) -> u32 {
        match self {
            JoinStyle::Round => 0,
            JoinStyle::Bevel => 1,
            JoinStyle::Miter(_) => 2,
        }
    }
}

/// What paints a stroke.
#[derive(Debug, Clone, PartialEq)]
pub enum LineFill {
    Color(Color),
    Fill(FillStyle),
}

/// A stroke with caps, joins, scaling behavior and an optional fill.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle2 {
    pub width: u16,
    pub start_cap: CapStyle,
    pub end_cap: CapStyle,
    pub join: JoinStyle,
    pub fill: LineFill,
    pub scale_horizontal: bool,
    pub scale_vertical: bool,
    pub pixel_hinting: bool,
    pub close: bool,
}

impl LineStyle2 {
    /// A solid, fully scaling stroke with round caps and joins.
    pub fn new(width: u32, color: Color) -> Result<Self> {
        check_range("line width", i64::from(width), 0, i64::from(u16::MAX))?;
        Ok(Self {
            width: width as u16,
            start_cap: CapStyle::Round,
            end_cap: CapStyle::Round,
            join: JoinStyle::Round,
            fill: LineFill::Color(color),
            scale_horizontal: true,
            scale_vertical: true,
            pixel_hinting: false,
            close: true,
        })
    }

    /// Record in the context whether this stroke scales.
    fn note_scaling(&self, ctx: &mut Context<'_>) {
        if self.scale_horizontal || self.scale_vertical {
            ctx.set_flag(Flag::ScalingStrokes, true);
        }
        if !self.scale_horizontal || !self.scale_vertical {
            ctx.set_flag(Flag::NonScalingStrokes, true);
        }
    }
}

impl Element for LineStyle2 {
    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        self.note_scaling(ctx);
        let mut len = 2 + 2;
        if let JoinStyle::Miter(limit) = self.join {
            miter_limit_raw(limit)?;
            len += 2;
        }
        len += match &self.fill {
            LineFill::Color(_) => 4,
            LineFill::Fill(fill) => ctx.with_flag(Flag::Alpha, true, |ctx| fill.encoded_len(ctx))?,
        };
        Ok(len)
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        writer.write_u16(self.width)?;
        writer.write_ubits(self.start_cap.to_bits(), 2)?;
        writer.write_ubits(self.join.to_bits(), 2)?;
        writer.write_bool(matches!(self.fill, LineFill::Fill(_)))?;
        writer.write_bool(!self.scale_horizontal)?;
        writer.write_bool(!self.scale_vertical)?;
        writer.write_bool(self.pixel_hinting)?;
        writer.write_ubits(0, 5)?;
        writer.write_bool(!self.close)?;
        writer.write_ubits(self.end_cap.to_bits(), 2)?;

        if let JoinStyle::Miter(limit) = self.join {
            writer.write_u16(miter_limit_raw(limit)?)?;
        }
        ctx.with_flag(Flag::Alpha, true, |ctx| match &self.fill {
            LineFill::Color(color) => color.encode(writer, ctx),
            LineFill::Fill(fill) => fill.encode(writer, ctx),
        })
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self> {
        let width = reader.read_u16()?;
        let start_cap = CapStyle::from_bits(reader.read_ubits(2)?)?;
        let join_bits = reader.read_ubits(2)?;
        let has_fill = reader.read_bool()?;
        let scale_horizontal = !reader.read_bool()?;
        let scale_vertical = !reader.read_bool()?;
        let pixel_hinting = reader.read_bool()?;
        reader.read_ubits(5)?;
        let close = !reader.read_bool()?;
        let end_cap = CapStyle::from_bits(reader.read_ubits(2)?)?;

        let join = match join_bits {
            0 => JoinStyle::Round,
            1 => JoinStyle::Bevel,
            2 => JoinStyle::Miter(f32::from(reader.read_u16()?) / 256.0),
            other => {
                return Err(Error::ValueOutOfRange {
                    field: "join style",
                    value: i64::from(other),
                    min: 0,
                    max: 2,
                })
            }
        };
        let fill = ctx.with_flag(Flag::Alpha, true, |ctx| {
            Ok::<_, Error>(if has_fill {
                LineFill::Fill(FillStyle::decode(reader, ctx)?)
            } else {
                LineFill::Color(Color::decode(reader, ctx)?)
            })
        })?;

        let style = Self {
            width,
            start_cap,
            end_cap,
            join,
            fill,
            scale_horizontal,
            scale_vertical,
            pixel_hinting,
            close,
        };
        style.note_scaling(ctx);
        Ok(style)
    }
}

/// Encoded size of a style list, including its count prefix.
pub(crate) fn styles_len<T: Element>(
    styles: &[T],
    extended: bool,
    ctx: &mut Context<'_>,
) -> Result<usize> {
    Ok(count_len(styles.len(), extended)? + list_len(styles, ctx)?)
}

fn count_len(count: usize, extended: bool) -> Result<usize> {
    if count < 0xFF {
        Ok(1)
    } else if extended {
        check_range("style count", count as i64, 0, i64::from(u16::MAX))?;
        Ok(3)
    } else {
        Err(Error::ValueOutOfRange {
            field: "style count",
            value: count as i64,
            min: 0,
            max: 0xFE,
        })
    }
}

/// Write a style count: one byte, or `0xFF` and a 16-bit count when extended.
pub(crate) fn write_styles<T: Element>(
    styles: &[T],
    extended: bool,
    writer: &mut BitWriter,
    ctx: &mut Context<'_>,
) -> Result<()> {
    if count_len(styles.len(), extended)? == 1 {
        writer.write_byte(styles.len() as u8)?;
    } else {
        writer.write_byte(0xFF)?;
        writer.write_u16(styles.len() as u16)?;
    }
    for style in styles {
        style.encode(writer, ctx)?;
    }
    Ok(())
}

pub(crate) fn read_styles<T: Element>(
    reader: &mut BitReader<'_>,
    extended: bool,
    ctx: &mut Context<'_>,
) -> Result<Vec<T>> {
    let mut count = usize::from(reader.read_byte()?);
    if count == 0xFF && extended {
        count = usize::from(reader.read_u16()?);
    }
    let mut styles = Vec::with_capacity(count);
    for _ in 0..count {
        styles.push(T::decode(reader, ctx)?);
    }
    Ok(styles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DecodeMode;
    use crate::registry::Registry;

    fn round_trip<T: Element + PartialEq + std::fmt::Debug>(value: &T, ctx: &mut Context<'_>) -> Vec<u8> {
        let len = value.encoded_len(ctx).unwrap();
        let mut writer = BitWriter::new();
        value.encode(&mut writer, ctx).unwrap();
        let bytes = writer.finish();
        assert_eq!(bytes.len(), len);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(&T::decode(&mut reader, ctx).unwrap(), value);
        assert!(reader.eof());
        bytes
    }

    fn gradient() -> Gradient {
        Gradient::new(vec![
            GradientStop::new(0, Color::rgb(255, 0, 0)),
            GradientStop::new(255, Color::rgb(0, 0, 255)),
        ])
        .unwrap()
    }

    #[test]
    fn test_solid_fill_layout() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let bytes = round_trip(&FillStyle::Solid(Color::rgb(1, 2, 3)), &mut ctx);
        assert_eq!(bytes, vec![0x00, 1, 2, 3]);
    }

    #[test]
    fn test_every_fill_round_trips() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let fills = [
            FillStyle::Linear {
                gradient: gradient(),
                transform: CoordTransform::identity().with_scale(0.5, 0.5),
            },
            FillStyle::Radial {
                gradient: gradient(),
                transform: CoordTransform::translation(10, 10),
            },
            FillStyle::Focal {
                gradient: gradient(),
                transform: CoordTransform::identity(),
                focal_point: -0.5,
            },
            FillStyle::Bitmap {
                bitmap: 7,
                transform: CoordTransform::identity(),
                repeat: false,
                smoothed: false,
            },
            FillStyle::Bitmap {
                bitmap: 8,
                transform: CoordTransform::identity(),
                repeat: true,
                smoothed: true,
            },
        ];
        for fill in &fills {
            round_trip(fill, &mut ctx);
        }
        ctx.with_flag(Flag::Alpha, true, |ctx| {
            for fill in &fills {
                round_trip(fill, ctx);
            }
        });
    }

    #[test]
    fn test_bitmap_codes() {
        let bitmap = |repeat, smoothed| FillStyle::Bitmap {
            bitmap: 1,
            transform: CoordTransform::identity(),
            repeat,
            smoothed,
        };
        assert_eq!(bitmap(true, true).code(), 0x40);
        assert_eq!(bitmap(false, true).code(), 0x41);
        assert_eq!(bitmap(true, false).code(), 0x42);
        assert_eq!(bitmap(false, false).code(), 0x43);
    }

    #[test]
    fn test_unknown_fill_fails_even_when_lenient() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        ctx.set_mode(DecodeMode::Lenient);
        let bytes = [0x77, 0, 0, 0];
        let mut reader = BitReader::new(&bytes);
        assert!(matches!(
            FillStyle::decode(&mut reader, &mut ctx),
            Err(Error::Registry(_))
        ));
    }

    #[test]
    fn test_gradient_stop_limit() {
        let stops = vec![GradientStop::new(0, Color::rgb(0, 0, 0)); 16];
        assert!(matches!(
            Gradient::new(stops),
            Err(Error::ValueOutOfRange {
                field: "gradient stops",
                ..
            })
        ));
    }

    #[test]
    fn test_line_style1_width_range() {
        assert!(LineStyle1::new(65535, Color::rgb(0, 0, 0)).is_ok());
        assert!(LineStyle1::new(65536, Color::rgb(0, 0, 0)).is_err());
    }

    #[test]
    fn test_line_style2_round_trip() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);

        let mut style = LineStyle2::new(40, Color::rgba(1, 2, 3, 128)).unwrap();
        style.start_cap = CapStyle::Square;
        style.end_cap = CapStyle::None;
        style.join = JoinStyle::Miter(3.0);
        style.pixel_hinting = true;
        style.close = false;
        round_trip(&style, &mut ctx);

        style.fill = LineFill::Fill(FillStyle::Linear {
            gradient: gradient(),
            transform: CoordTransform::identity(),
        });
        style.join = JoinStyle::Bevel;
        round_trip(&style, &mut ctx);
    }

    #[test]
    fn test_miter_limit_is_unsigned() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let mut style = LineStyle2::new(20, Color::rgb(0, 0, 0)).unwrap();

        style.join = JoinStyle::Miter(200.5);
        let bytes = round_trip(&style, &mut ctx);
        assert_eq!(&bytes[4..6], &[0x80, 0xC8]);

        style.join = JoinStyle::Miter(-1.0);
        assert!(matches!(
            style.encoded_len(&mut ctx),
            Err(Error::ValueOutOfRange { field: "miter limit", .. })
        ));
        style.join = JoinStyle::Miter(256.0);
        assert!(style.encoded_len(&mut ctx).is_err());
    }

    #[test]
    fn test_line_style2_end_cap_is_two_bits() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let mut style = LineStyle2::new(20, Color::rgb(0, 0, 0)).unwrap();
        style.end_cap = CapStyle::Square;

        let mut writer = BitWriter::new();
        style.encode(&mut writer, &mut ctx).unwrap();
        let bytes = writer.finish();
        // width, then caps/join/flags byte, then reserved/no-close/end-cap byte
        assert_eq!(&bytes[..4], &[20, 0, 0b0000_0000, 0b0000_0010]);
    }

    #[test]
    fn test_line_style2_sets_scaling_flags() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let mut style = LineStyle2::new(20, Color::rgb(0, 0, 0)).unwrap();

        style.encoded_len(&mut ctx).unwrap();
        assert!(ctx.flag(Flag::ScalingStrokes));
        assert!(!ctx.flag(Flag::NonScalingStrokes));

        let mut ctx = Context::new(&registry);
        style.scale_horizontal = false;
        style.scale_vertical = false;
        let mut writer = BitWriter::new();
        style.encode(&mut writer, &mut ctx).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        LineStyle2::decode(&mut reader, &mut ctx).unwrap();
        assert!(!ctx.flag(Flag::ScalingStrokes));
        assert!(ctx.flag(Flag::NonScalingStrokes));
    }

    #[test]
    fn test_extended_style_counts() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let styles = vec![LineStyle1::new(1, Color::rgb(0, 0, 0)).unwrap(); 300];

        assert!(styles_len(&styles, false, &mut ctx).is_err());
        let len = styles_len(&styles, true, &mut ctx).unwrap();
        assert_eq!(len, 3 + 300 * 5);

        let mut writer = BitWriter::new();
        write_styles(&styles, true, &mut writer, &mut ctx).unwrap();
        let bytes = writer.finish();
        assert_eq!(&bytes[..3], &[0xFF, 0x2C, 0x01]);

        let mut reader = BitReader::new(&bytes);
        let decoded: Vec<LineStyle1> = read_styles(&mut reader, true, &mut ctx).unwrap();
        assert_eq!(decoded, styles);
    }
}
