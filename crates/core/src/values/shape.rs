//! Shape definition bodies.
//!
//! Edge records are not interpreted: they are kept as raw bytes running to
//! the end of the record body.

use crate::bitio::{BitReader, BitWriter};
use crate::context::{Context, Flag};
use crate::error::Result;

use super::geometry::Bounds;
use super::style::{read_styles, styles_len, write_styles, FillStyle, LineStyle1, LineStyle2};
use super::Element;

/// The three shape definitions that share one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeVersion {
    /// 255 styles at most, RGB colors
    One,
    /// Extended style counts
    Two,
    /// Extended style counts, RGBA colors
    Three,
}

impl ShapeVersion {
    pub fn code(self) -> u16 {
        match self {
            ShapeVersion::One => super::tag::codes::DEFINE_SHAPE,
            ShapeVersion::Two => super::tag::codes::DEFINE_SHAPE2,
            ShapeVersion::Three => super::tag::codes::DEFINE_SHAPE3,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            super::tag::codes::DEFINE_SHAPE => Some(ShapeVersion::One),
            super::tag::codes::DEFINE_SHAPE2 => Some(ShapeVersion::Two),
            super::tag::codes::DEFINE_SHAPE3 => Some(ShapeVersion::Three),
            _ => None,
        }
    }

    fn extended_counts(self) -> bool {
        self != ShapeVersion::One
    }

    fn alpha(self) -> bool {
        self == ShapeVersion::Three
    }
}

/// Remaining bytes up to `end`, or none if the cursor is already past it.
fn read_to_end(reader: &mut BitReader<'_>, end: usize) -> Result<Vec<u8>> {
    reader.align();
    let remaining = end.saturating_sub(reader.position()) / 8;
    reader.read_bytes(remaining)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefineShape {
    pub version: ShapeVersion,
    pub identifier: u16,
    pub bounds: Bounds,
    pub fill_styles: Vec<FillStyle>,
    pub line_styles: Vec<LineStyle1>,
    pub edges: Vec<u8>,
}

impl DefineShape {
    pub fn body_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        let extended = self.version.extended_counts();
        ctx.with_flag(Flag::Alpha, self.version.alpha(), |ctx| -> Result<usize> {
            Ok(2 + self.bounds.encoded_len(ctx)?
                + styles_len(&self.fill_styles, extended, ctx)?
                + styles_len(&self.line_styles, extended, ctx)?
                + self.edges.len())
        })
    }

    pub fn encode_body(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        let extended = self.version.extended_counts();
        ctx.with_flag(Flag::Alpha, self.version.alpha(), |ctx| -> Result<()> {
            writer.write_u16(self.identifier)?;
            self.bounds.encode(writer, ctx)?;
            write_styles(&self.fill_styles, extended, writer, ctx)?;
            write_styles(&self.line_styles, extended, writer, ctx)?;
            writer.write_bytes(&self.edges)
        })
    }

    pub fn decode_body(
        version: ShapeVersion,
        reader: &mut BitReader<'_>,
        ctx: &mut Context<'_>,
        end: usize,
    ) -> Result<Self> {
        let extended = version.extended_counts();
        ctx.with_flag(Flag::Alpha, version.alpha(), |ctx| -> Result<Self> {
            let identifier = reader.read_u16()?;
            let bounds = Bounds::decode(reader, ctx)?;
            let fill_styles = read_styles(reader, extended, ctx)?;
            let line_styles = read_styles(reader, extended, ctx)?;
            let edges = read_to_end(reader, end)?;
            Ok(Self {
                version,
                identifier,
                bounds,
                fill_styles,
                line_styles,
                edges,
            })
        })
    }
}

/// A shape with separate edge bounds and stroke styles that can opt out of
/// scaling.
///
/// The flags byte is not stored: it is derived from the line styles when the
/// shape is prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct DefineShape4 {
    pub identifier: u16,
    pub bounds: Bounds,
    pub edge_bounds: Bounds,
    pub fill_winding: bool,
    pub fill_styles: Vec<FillStyle>,
    pub line_styles: Vec<LineStyle2>,
    pub edges: Vec<u8>,
}

/// Values computed while preparing a [`DefineShape4`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape4Plan {
    pub body_len: usize,
    /// Some line style lets its stroke scale
    pub scaling: bool,
    /// Some line style keeps its stroke width fixed
    pub non_scaling: bool,
}

impl DefineShape4 {
    /// Compute the body length and the strokes flags.
    ///
    /// The strokes flags are cleared first and left set in the context
    /// afterwards, so later records in the pass can see them.
    pub fn prepare(&self, ctx: &mut Context<'_>) -> Result<Shape4Plan> {
        ctx.set_flag(Flag::ScalingStrokes, false);
        ctx.set_flag(Flag::NonScalingStrokes, false);

        let body_len = ctx.with_flag(Flag::Alpha, true, |ctx| -> Result<usize> {
            Ok(2 + self.bounds.encoded_len(ctx)?
                + self.edge_bounds.encoded_len(ctx)?
                + 1
                + styles_len(&self.fill_styles, true, ctx)?
                + styles_len(&self.line_styles, true, ctx)?
                + self.edges.len())
        })?;

        Ok(Shape4Plan {
            body_len,
            scaling: ctx.flag(Flag::ScalingStrokes),
            non_scaling: ctx.flag(Flag::NonScalingStrokes),
        })
    }

    pub fn encode_body(
        &self,
        plan: &Shape4Plan,
        writer: &mut BitWriter,
        ctx: &mut Context<'_>,
    ) -> Result<()> {
        ctx.with_flag(Flag::Alpha, true, |ctx| -> Result<()> {
            writer.write_u16(self.identifier)?;
            self.bounds.encode(writer, ctx)?;
            self.edge_bounds.encode(writer, ctx)?;
            writer.write_ubits(0, 5)?;
            writer.write_bool(self.fill_winding)?;
            writer.write_bool(plan.non_scaling)?;
            writer.write_bool(plan.scaling)?;
            write_styles(&self.fill_styles, true, writer, ctx)?;
            write_styles(&self.line_styles, true, writer, ctx)?;
            writer.write_bytes(&self.edges)
        })
    }

    pub fn decode_body(reader: &mut BitReader<'_>, ctx: &mut Context<'_>, end: usize) -> Result<Self> {
        ctx.set_flag(Flag::ScalingStrokes, false);
        ctx.set_flag(Flag::NonScalingStrokes, false);

        ctx.with_flag(Flag::Alpha, true, |ctx| -> Result<Self> {
            let identifier = reader.read_u16()?;
            let bounds = Bounds::decode(reader, ctx)?;
            let edge_bounds = Bounds::decode(reader, ctx)?;
            reader.read_ubits(5)?;
            let fill_winding = reader.read_bool()?;
            // The strokes bits are rebuilt from the line styles below.
            reader.read_ubits(2)?;
            let fill_styles = read_styles(reader, true, ctx)?;
            let line_styles = read_styles(reader, true, ctx)?;
            let edges = read_to_end(reader, end)?;
            Ok(Self {
                identifier,
                bounds,
                edge_bounds,
                fill_winding,
                fill_styles,
                line_styles,
                edges,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::registry::Registry;
    use crate::values::color::Color;

    fn shape(version: ShapeVersion) -> DefineShape {
        DefineShape {
            version,
            identifier: 1,
            bounds: Bounds::new(0, 0, 200, 200).unwrap(),
            fill_styles: vec![FillStyle::Solid(Color::rgba(255, 0, 0, 128))],
            line_styles: vec![LineStyle1::new(20, Color::rgba(0, 0, 0, 255)).unwrap()],
            edges: vec![0x15, 0x40, 0x00],
        }
    }

    #[test]
    fn test_shape_versions_round_trip() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        for version in [ShapeVersion::One, ShapeVersion::Two, ShapeVersion::Three] {
            let mut original = shape(version);
            if version != ShapeVersion::Three {
                // Only the RGBA version keeps a translucent alpha.
                original.fill_styles = vec![FillStyle::Solid(Color::rgb(255, 0, 0))];
            }
            let len = original.body_len(&mut ctx).unwrap();
            let mut writer = BitWriter::new();
            original.encode_body(&mut writer, &mut ctx).unwrap();
            let bytes = writer.finish();
            assert_eq!(bytes.len(), len);

            let mut reader = BitReader::new(&bytes);
            let decoded =
                DefineShape::decode_body(version, &mut reader, &mut ctx, bytes.len() * 8).unwrap();
            assert_eq!(decoded, original);
            assert!(!ctx.flag(Flag::Alpha));
        }
    }

    #[test]
    fn test_version_one_rejects_extended_counts() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let mut original = shape(ShapeVersion::One);
        original.line_styles = vec![LineStyle1::new(1, Color::rgb(0, 0, 0)).unwrap(); 256];
        assert!(matches!(
            original.body_len(&mut ctx),
            Err(Error::ValueOutOfRange {
                field: "style count",
                ..
            })
        ));

        original.version = ShapeVersion::Two;
        assert!(original.body_len(&mut ctx).is_ok());
    }

    #[test]
    fn test_shape4_plan_captures_strokes_flags() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let mut fixed = LineStyle2::new(10, Color::rgb(0, 0, 0)).unwrap();
        fixed.scale_horizontal = false;
        fixed.scale_vertical = false;

        let original = DefineShape4 {
            identifier: 9,
            bounds: Bounds::new(-10, -10, 110, 110).unwrap(),
            edge_bounds: Bounds::new(0, 0, 100, 100).unwrap(),
            fill_winding: true,
            fill_styles: vec![],
            line_styles: vec![fixed],
            edges: vec![0x00],
        };

        let plan = original.prepare(&mut ctx).unwrap();
        assert!(!plan.scaling);
        assert!(plan.non_scaling);

        let mut writer = BitWriter::new();
        original.encode_body(&plan, &mut writer, &mut ctx).unwrap();
        let bytes = writer.finish();
        assert_eq!(bytes.len(), plan.body_len);

        let mut fresh = Context::new(&registry);
        let mut reader = BitReader::new(&bytes);
        let decoded = DefineShape4::decode_body(&mut reader, &mut fresh, bytes.len() * 8).unwrap();
        assert_eq!(decoded, original);
        assert!(fresh.flag(Flag::NonScalingStrokes));
        assert!(!fresh.flag(Flag::ScalingStrokes));
    }
}
