//! Top-level tags.
//!
//! A movie body is a flat sequence of tags framed by [`TagFraming`]. Only a
//! representative set of tags is decoded structurally; any other code is an
//! [`Opaque`] body in lenient mode.

use crate::bitio::{BitReader, BitWriter};
use crate::context::{Context, Flag};
use crate::error::{FramingError, Result};
use crate::framing::{Encode, EncodePlan, Record, TagFraming};
use crate::registry::{Discriminant, Registry};

use super::action::{decode_actions, prepare_actions, write_actions, Action, BlockPlan};
use super::color::Color;
use super::place::PlaceObject3;
use super::shape::{DefineShape, DefineShape4, Shape4Plan, ShapeVersion};
use super::{string_len, Element};

/// Tag codes.
pub mod codes {
    pub const END: u16 = 0;
    pub const SHOW_FRAME: u16 = 1;
    pub const DEFINE_SHAPE: u16 = 2;
    pub const SET_BACKGROUND_COLOR: u16 = 9;
    pub const DO_ACTION: u16 = 12;
    pub const DEFINE_SHAPE2: u16 = 22;
    pub const DEFINE_SHAPE3: u16 = 32;
    pub const FRAME_LABEL: u16 = 43;
    pub const PLACE_OBJECT3: u16 = 70;
    pub const DEFINE_SHAPE4: u16 = 83;
}

/// Human-readable name for a tag code.
pub fn kind_name(code: u16) -> &'static str {
    match code {
        codes::END => "End",
        codes::SHOW_FRAME => "ShowFrame",
        codes::DEFINE_SHAPE => "DefineShape",
        codes::SET_BACKGROUND_COLOR => "SetBackgroundColor",
        codes::DO_ACTION => "DoAction",
        codes::DEFINE_SHAPE2 => "DefineShape2",
        codes::DEFINE_SHAPE3 => "DefineShape3",
        codes::FRAME_LABEL => "FrameLabel",
        codes::PLACE_OBJECT3 => "PlaceObject3",
        codes::DEFINE_SHAPE4 => "DefineShape4",
        _ => "UnknownTag",
    }
}

/// A tag with no registered decoder, kept as its raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opaque {
    pub code: u16,
    pub body: Vec<u8>,
}

/// Actions of a frame, decoded or left as bytecode.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionBlock {
    Decoded(Vec<Action>),
    /// The whole body verbatim, end marker included
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoAction {
    pub actions: ActionBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLabel {
    pub name: String,
    /// Named anchor; written as a trailing flag byte
    pub anchor: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    ShowFrame,
    SetBackgroundColor(Color),
    DoAction(DoAction),
    FrameLabel(FrameLabel),
    DefineShape(DefineShape),
    DefineShape4(DefineShape4),
    PlaceObject3(PlaceObject3),
    Unknown(Opaque),
}

/// The encode plan of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPlan {
    /// Bodies whose writer only needs the length
    Body(usize),
    Actions(BlockPlan),
    Shape4(Shape4Plan),
}

impl EncodePlan for TagPlan {
    fn body_len(&self) -> usize {
        match self {
            TagPlan::Body(len) => *len,
            TagPlan::Actions(plan) => plan.body_len,
            TagPlan::Shape4(plan) => plan.body_len,
        }
    }
}

impl Encode for Tag {
    type Plan = TagPlan;

    fn prepare(&self, ctx: &mut Context<'_>) -> Result<TagPlan> {
        Ok(match self {
            Tag::End | Tag::ShowFrame => TagPlan::Body(0),
            Tag::SetBackgroundColor(color) => {
                TagPlan::Body(ctx.with_flag(Flag::Alpha, false, |ctx| color.encoded_len(ctx))?)
            }
            Tag::DoAction(DoAction {
                actions: ActionBlock::Decoded(actions),
            }) => TagPlan::Actions(prepare_actions(actions, ctx)?),
            Tag::DoAction(DoAction {
                actions: ActionBlock::Raw(bytes),
            }) => TagPlan::Body(bytes.len()),
            Tag::FrameLabel(label) => {
                TagPlan::Body(string_len(&label.name, ctx)? + usize::from(label.anchor))
            }
            Tag::DefineShape(shape) => TagPlan::Body(shape.body_len(ctx)?),
            Tag::DefineShape4(shape) => TagPlan::Shape4(shape.prepare(ctx)?),
            Tag::PlaceObject3(place) => TagPlan::Body(place.body_len(ctx)?),
            Tag::Unknown(opaque) => TagPlan::Body(opaque.body.len()),
        })
    }

    fn encode(&self, plan: &TagPlan, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        match (self, plan) {
            (Tag::End | Tag::ShowFrame, TagPlan::Body(_)) => Ok(()),
            (Tag::SetBackgroundColor(color), TagPlan::Body(_)) => {
                ctx.with_flag(Flag::Alpha, false, |ctx| color.encode(writer, ctx))
            }
            (
                Tag::DoAction(DoAction {
                    actions: ActionBlock::Decoded(actions),
                }),
                TagPlan::Actions(plan),
            ) => write_actions(actions, plan, writer, ctx),
            (
                Tag::DoAction(DoAction {
                    actions: ActionBlock::Raw(bytes),
                }),
                TagPlan::Body(_),
            ) => writer.write_bytes(bytes),
            (Tag::FrameLabel(label), TagPlan::Body(_)) => {
                writer.write_string(&label.name, ctx.encoding())?;
                if label.anchor {
                    writer.write_byte(1)?;
                }
                Ok(())
            }
            (Tag::DefineShape(shape), TagPlan::Body(_)) => shape.encode_body(writer, ctx),
            (Tag::DefineShape4(shape), TagPlan::Shape4(plan)) => {
                shape.encode_body(plan, writer, ctx)
            }
            (Tag::PlaceObject3(place), TagPlan::Body(_)) => place.encode_body(writer, ctx),
            (Tag::Unknown(opaque), TagPlan::Body(_)) => writer.write_bytes(&opaque.body),
            _ => Err(FramingError::PlanMismatch {
                record: self.name(),
            }
            .into()),
        }
    }
}

impl Record for Tag {
    type Framing = TagFraming;

    fn code(&self) -> u16 {
        match self {
            Tag::End => codes::END,
            Tag::ShowFrame => codes::SHOW_FRAME,
            Tag::SetBackgroundColor(_) => codes::SET_BACKGROUND_COLOR,
            Tag::DoAction(_) => codes::DO_ACTION,
            Tag::FrameLabel(_) => codes::FRAME_LABEL,
            Tag::DefineShape(shape) => shape.version.code(),
            Tag::DefineShape4(_) => codes::DEFINE_SHAPE4,
            Tag::PlaceObject3(_) => codes::PLACE_OBJECT3,
            Tag::Unknown(opaque) => opaque.code,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Tag::Unknown(_) => "UnknownTag",
            other => kind_name(other.code()),
        }
    }
}

/// Bit position where a framed body ends.
fn body_end(key: &Discriminant, reader: &BitReader<'_>) -> usize {
    key.end().unwrap_or_else(|| reader.bit_len())
}

pub(crate) fn register_defaults(registry: &mut Registry) {
    registry.register(codes::END, |_reader, _ctx, _key: &Discriminant| Ok(Tag::End));
    registry.register(codes::SHOW_FRAME, |_reader, _ctx, _key: &Discriminant| {
        Ok(Tag::ShowFrame)
    });
    registry.register(codes::SET_BACKGROUND_COLOR, |reader, ctx, _key: &Discriminant| {
        let color = ctx.with_flag(Flag::Alpha, false, |ctx| Color::decode(reader, ctx))?;
        Ok(Tag::SetBackgroundColor(color))
    });
    registry.register(codes::DO_ACTION, |reader, ctx, key: &Discriminant| {
        let end = body_end(key, reader);
        let actions = if ctx.flag(Flag::DecodeActions) {
            ActionBlock::Decoded(decode_actions(reader, ctx, end)?)
        } else {
            ActionBlock::Raw(reader.read_bytes(end.saturating_sub(reader.position()) / 8)?)
        };
        Ok(Tag::DoAction(DoAction { actions }))
    });
    registry.register(codes::FRAME_LABEL, |reader, ctx, key: &Discriminant| {
        let end = body_end(key, reader);
        let name = reader.read_string(ctx.encoding())?;
        let anchor = if reader.position() < end {
            reader.read_byte()? != 0
        } else {
            false
        };
        Ok(Tag::FrameLabel(FrameLabel { name, anchor }))
    });
    for version in [ShapeVersion::One, ShapeVersion::Two, ShapeVersion::Three] {
        registry.register(version.code(), move |reader, ctx, key: &Discriminant| {
            let end = body_end(key, reader);
            Ok(Tag::DefineShape(DefineShape::decode_body(version, reader, ctx, end)?))
        });
    }
    registry.register(codes::DEFINE_SHAPE4, |reader, ctx, key: &Discriminant| {
        let end = body_end(key, reader);
        Ok(Tag::DefineShape4(DefineShape4::decode_body(reader, ctx, end)?))
    });
    registry.register(codes::PLACE_OBJECT3, |reader, ctx, key: &Discriminant| {
        let end = body_end(key, reader);
        Ok(Tag::PlaceObject3(PlaceObject3::decode_body(reader, ctx, end)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DecodeMode;
    use crate::error::Error;
    use crate::framing::{read_record, write_record};
    use crate::values::action::PushValue;

    fn round_trip(tag: &Tag, ctx: &mut Context<'_>) -> Vec<u8> {
        let mut writer = BitWriter::new();
        let len = write_record(tag, &mut writer, ctx).unwrap();
        let bytes = writer.finish();
        assert_eq!(bytes.len(), len);

        let mut reader = BitReader::new(&bytes);
        let decoded: Tag = read_record(&mut reader, ctx).unwrap();
        assert_eq!(&decoded, tag);
        assert!(reader.eof());
        bytes
    }

    #[test]
    fn test_simple_tags() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        assert_eq!(round_trip(&Tag::End, &mut ctx), vec![0x00, 0x00]);
        assert_eq!(round_trip(&Tag::ShowFrame, &mut ctx), vec![0x40, 0x00]);
        assert_eq!(
            round_trip(&Tag::SetBackgroundColor(Color::rgb(0xFF, 0x80, 0x00)), &mut ctx),
            vec![0x43, 0x02, 0xFF, 0x80, 0x00]
        );
    }

    #[test]
    fn test_nested_actions_are_counted_as_records() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let tag = Tag::DoAction(DoAction {
            actions: ActionBlock::Decoded(vec![Action::Basic(0x07), Action::GotoFrame(2)]),
        });
        round_trip(&tag, &mut ctx);
        assert_eq!(ctx.stats().records_encoded, 3);
        assert_eq!(ctx.stats().records_decoded, 3);
        // Each direction: the 7-byte tag body plus the 2-byte GotoFrame body.
        assert_eq!(ctx.stats().body_bytes, 2 * (7 + 2));
    }

    #[test]
    fn test_translucent_background_is_rejected() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let tag = Tag::SetBackgroundColor(Color::rgba(1, 2, 3, 128));
        assert!(matches!(
            tag.prepare(&mut ctx),
            Err(Error::ValueOutOfRange { field: "alpha", .. })
        ));
    }

    #[test]
    fn test_invalid_action_opcodes_fail_before_writing() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        for opcode in [0x00, 0x81] {
            let tag = Tag::DoAction(DoAction {
                actions: ActionBlock::Decoded(vec![Action::Basic(opcode), Action::Basic(0x07)]),
            });
            let mut writer = BitWriter::new();
            assert!(matches!(
                write_record(&tag, &mut writer, &mut ctx),
                Err(Error::ValueOutOfRange {
                    field: "action opcode",
                    ..
                })
            ));
            assert_eq!(writer.position(), 0);
        }
    }

    #[test]
    fn test_frame_label_anchor() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        for anchor in [false, true] {
            let label = Tag::FrameLabel(FrameLabel {
                name: "start".to_string(),
                anchor,
            });
            let bytes = round_trip(&label, &mut ctx);
            assert_eq!(bytes.len(), 2 + 6 + usize::from(anchor));
        }
    }

    #[test]
    fn test_do_action_decoded_and_raw() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let tag = Tag::DoAction(DoAction {
            actions: ActionBlock::Decoded(vec![
                Action::Push(vec![PushValue::String("hello".to_string())]),
                Action::Basic(0x26),
                Action::Basic(0x07),
            ]),
        });
        let bytes = round_trip(&tag, &mut ctx);

        ctx.set_flag(Flag::DecodeActions, false);
        let mut reader = BitReader::new(&bytes);
        let raw: Tag = read_record(&mut reader, &mut ctx).unwrap();
        assert_eq!(
            raw,
            Tag::DoAction(DoAction {
                actions: ActionBlock::Raw(bytes[2..].to_vec())
            })
        );
        round_trip(&raw, &mut ctx);
    }

    #[test]
    fn test_early_end_marker_is_mismatch() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        // DoAction declaring 3 bytes whose end marker comes first.
        let bytes = [0x03, 0x03, 0x00, 0x07, 0x00];
        let mut reader = BitReader::new(&bytes);
        let result: Result<Tag> = read_record(&mut reader, &mut ctx);
        assert!(matches!(
            result,
            Err(Error::Framing(FramingError::RecordLengthMismatch {
                record: "DoAction",
                delta: -2,
                ..
            }))
        ));
    }

    #[test]
    fn test_plan_mismatch() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let mut writer = BitWriter::new();
        let result = Tag::ShowFrame.encode(&TagPlan::Actions(BlockPlan {
            body_len: 1,
            action_plans: vec![],
        }), &mut writer, &mut ctx);
        assert!(matches!(
            result,
            Err(Error::Framing(FramingError::PlanMismatch {
                record: "ShowFrame"
            }))
        ));
    }

    #[test]
    fn test_unknown_tag_lenient_round_trip() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        ctx.set_mode(DecodeMode::Lenient);
        let tag = Tag::Unknown(Opaque {
            code: 777,
            body: vec![9; 100],
        });
        let bytes = round_trip(&tag, &mut ctx);
        assert_eq!(bytes.len(), 106);
        assert_eq!(ctx.stats().opaque_records, 1);
    }
}
