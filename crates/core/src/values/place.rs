//! Display list placement.

use crate::bitio::{BitReader, BitWriter};
use crate::context::{Context, Flag};
use crate::error::Result;

use super::color::{Color, ColorTransform};
use super::filter::{filters_len, read_filters, write_filters, Filter};
use super::geometry::CoordTransform;
use super::{string_len, Element};

/// What a placement does to the display list at its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Put a new object at an empty depth
    New,
    /// Change the object already at the depth
    Modify,
    /// Swap the object at the depth for another one
    Replace,
}

/// Adds or updates an object on the display list.
///
/// Every field but the depth is optional, and each one present sets a bit in
/// the two leading flag bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaceObject3 {
    /// Whether an object already occupies the depth
    pub moving: bool,
    pub depth: u16,
    pub identifier: Option<u16>,
    pub class_name: Option<String>,
    pub has_image: bool,
    pub transform: Option<CoordTransform>,
    pub color_transform: Option<ColorTransform>,
    pub ratio: Option<u16>,
    pub name: Option<String>,
    pub clip_depth: Option<u16>,
    pub filters: Option<Vec<Filter>>,
    pub blend_mode: Option<u8>,
    pub cache_as_bitmap: Option<u8>,
    pub visible: Option<bool>,
    pub background: Option<Color>,
    /// Clip event handlers, kept undecoded to the end of the body
    pub clip_actions: Option<Vec<u8>>,
}

impl PlaceObject3 {
    /// Place `identifier` at an empty `depth`.
    pub fn new(depth: u16, identifier: u16) -> Self {
        Self {
            depth,
            identifier: Some(identifier),
            ..Self::default()
        }
    }

    pub fn placement(&self) -> Placement {
        match (self.moving, self.identifier.is_some()) {
            (false, _) => Placement::New,
            (true, false) => Placement::Modify,
            (true, true) => Placement::Replace,
        }
    }

    fn flags(&self) -> (u8, u8) {
        let first = (u8::from(self.clip_actions.is_some()) << 7)
            | (u8::from(self.clip_depth.is_some()) << 6)
            | (u8::from(self.name.is_some()) << 5)
            | (u8::from(self.ratio.is_some()) << 4)
            | (u8::from(self.color_transform.is_some()) << 3)
            | (u8::from(self.transform.is_some()) << 2)
            | (u8::from(self.identifier.is_some()) << 1)
            | u8::from(self.moving);
        let second = (u8::from(self.background.is_some()) << 6)
            | (u8::from(self.visible.is_some()) << 5)
            | (u8::from(self.has_image) << 4)
            | (u8::from(self.class_name.is_some()) << 3)
            | (u8::from(self.cache_as_bitmap.is_some()) << 2)
            | (u8::from(self.blend_mode.is_some()) << 1)
            | u8::from(self.filters.is_some());
        (first, second)
    }

    pub fn body_len(&self, ctx: &mut Context<'_>) -> Result<usize> {
        let mut len = 2 + 2;
        if let Some(class_name) = &self.class_name {
            len += string_len(class_name, ctx)?;
        }
        if self.identifier.is_some() {
            len += 2;
        }
        if let Some(transform) = &self.transform {
            len += transform.encoded_len(ctx)?;
        }
        if let Some(color_transform) = &self.color_transform {
            len += ctx.with_flag(Flag::Alpha, true, |ctx| color_transform.encoded_len(ctx))?;
        }
        if self.ratio.is_some() {
            len += 2;
        }
        if let Some(name) = &self.name {
            len += string_len(name, ctx)?;
        }
        if self.clip_depth.is_some() {
            len += 2;
        }
        if let Some(filters) = &self.filters {
            len += filters_len(filters, ctx)?;
        }
        len += usize::from(self.blend_mode.is_some());
        len += usize::from(self.cache_as_bitmap.is_some());
        len += usize::from(self.visible.is_some());
        if self.background.is_some() {
            len += 4;
        }
        if let Some(clip_actions) = &self.clip_actions {
            len += clip_actions.len();
        }
        Ok(len)
    }

    pub fn encode_body(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        let (first, second) = self.flags();
        writer.write_byte(first)?;
        writer.write_byte(second)?;
        writer.write_u16(self.depth)?;

        if let Some(class_name) = &self.class_name {
            writer.write_string(class_name, ctx.encoding())?;
        }
        if let Some(identifier) = self.identifier {
            writer.write_u16(identifier)?;
        }
        if let Some(transform) = &self.transform {
            transform.encode(writer, ctx)?;
        }
        if let Some(color_transform) = &self.color_transform {
            ctx.with_flag(Flag::Alpha, true, |ctx| color_transform.encode(writer, ctx))?;
        }
        if let Some(ratio) = self.ratio {
            writer.write_u16(ratio)?;
        }
        if let Some(name) = &self.name {
            writer.write_string(name, ctx.encoding())?;
        }
        if let Some(clip_depth) = self.clip_depth {
            writer.write_u16(clip_depth)?;
        }
        if let Some(filters) = &self.filters {
            write_filters(filters, writer, ctx)?;
        }
        if let Some(blend_mode) = self.blend_mode {
            writer.write_byte(blend_mode)?;
        }
        if let Some(cache_as_bitmap) = self.cache_as_bitmap {
            writer.write_byte(cache_as_bitmap)?;
        }
        if let Some(visible) = self.visible {
            writer.write_byte(u8::from(visible))?;
        }
        if let Some(background) = &self.background {
            ctx.with_flag(Flag::Alpha, true, |ctx| background.encode(writer, ctx))?;
        }
        if let Some(clip_actions) = &self.clip_actions {
            writer.write_bytes(clip_actions)?;
        }
        Ok(())
    }

    pub fn decode_body(reader: &mut BitReader<'_>, ctx: &mut Context<'_>, end: usize) -> Result<Self> {
        let first = reader.read_byte()?;
        let second = reader.read_byte()?;
        let has = |byte: u8, bit: u8| byte & (1 << bit) != 0;

        let depth = reader.read_u16()?;
        let class_name = if has(second, 3) {
            Some(reader.read_string(ctx.encoding())?)
        } else {
            None
        };
        let identifier = if has(first, 1) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let transform = if has(first, 2) {
            Some(CoordTransform::decode(reader, ctx)?)
        } else {
            None
        };
        let color_transform = if has(first, 3) {
            Some(ctx.with_flag(Flag::Alpha, true, |ctx| ColorTransform::decode(reader, ctx))?)
        } else {
            None
        };
        let ratio = if has(first, 4) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let name = if has(first, 5) {
            Some(reader.read_string(ctx.encoding())?)
        } else {
            None
        };
        let clip_depth = if has(first, 6) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let filters = if has(second, 0) {
            Some(read_filters(reader, ctx)?)
        } else {
            None
        };
        let blend_mode = if has(second, 1) {
            Some(reader.read_byte()?)
        } else {
            None
        };
        let cache_as_bitmap = if has(second, 2) {
            Some(reader.read_byte()?)
        } else {
            None
        };
        let visible = if has(second, 5) {
            Some(reader.read_byte()? != 0)
        } else {
            None
        };
        let background = if has(second, 6) {
            Some(ctx.with_flag(Flag::Alpha, true, |ctx| Color::decode(reader, ctx))?)
        } else {
            None
        };
        let clip_actions = if has(first, 7) {
            let remaining = end.saturating_sub(reader.position()) / 8;
            Some(reader.read_bytes(remaining)?)
        } else {
            None
        };

        Ok(Self {
            moving: has(first, 0),
            depth,
            identifier,
            class_name,
            has_image: has(second, 4),
            transform,
            color_transform,
            ratio,
            name,
            clip_depth,
            filters,
            blend_mode,
            cache_as_bitmap,
            visible,
            background,
            clip_actions,
        })
    }
}
