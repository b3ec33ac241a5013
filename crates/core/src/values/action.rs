//! Action bytecode instructions.
//!
//! Actions are framed records of their own ([`ActionFraming`]): a one-byte
//! opcode, plus a 16-bit body length for opcodes from `0x80` up. An action
//! block is a run of actions terminated by a zero byte.

use tracing::debug;

use crate::bitio::{BitReader, BitWriter};
use crate::context::Context;
use crate::error::{check_range, Error, Result};
use crate::framing::{framed_len, read_record, write_prepared, ActionFraming, Encode, Record};
use crate::registry::{Discriminant, Registry};

use super::string_len;

/// Opcodes with a body.
pub mod codes {
    pub const GOTO_FRAME: u16 = 0x81;
    pub const GET_URL: u16 = 0x83;
    pub const WAIT_FOR_FRAME: u16 = 0x8A;
    pub const SET_TARGET: u16 = 0x8B;
    pub const GOTO_LABEL: u16 = 0x8C;
    pub const PUSH: u16 = 0x96;
    pub const JUMP: u16 = 0x99;
    pub const IF: u16 = 0x9D;
}

/// Marks the end of an action block.
pub const END_OF_ACTIONS: u8 = 0x00;

/// A literal pushed onto the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum PushValue {
    String(String),
    Float(f32),
    Null,
    Undefined,
    Register(u8),
    Boolean(bool),
    Double(f64),
    Integer(i32),
    /// Index into the constant pool; written in one byte when it fits
    Constant(u16),
}

impl PushValue {
    fn type_code(&self) -> u8 {
        match self {
            PushValue::String(_) => 0,
            PushValue::Float(_) => 1,
            PushValue::Null => 2,
            PushValue::Undefined => 3,
            PushValue::Register(_) => 4,
            PushValue::Boolean(_) => 5,
            PushValue::Double(_) => 6,
            PushValue::Integer(_) => 7,
            PushValue::Constant(index) if *index <= 0xFF => 8,
            PushValue::Constant(_) => 9,
        }
    }

    fn encoded_len(&self, ctx: &Context<'_>) -> Result<usize> {
        let body = match self {
            PushValue::String(text) => string_len(text, ctx)?,
            PushValue::Null | PushValue::Undefined => 0,
            PushValue::Register(_) | PushValue::Boolean(_) => 1,
            PushValue::Float(_) | PushValue::Integer(_) => 4,
            PushValue::Double(_) => 8,
            PushValue::Constant(index) if *index <= 0xFF => 1,
            PushValue::Constant(_) => 2,
        };
        Ok(1 + body)
    }

    fn encode(&self, writer: &mut BitWriter, ctx: &Context<'_>) -> Result<()> {
        writer.write_byte(self.type_code())?;
        match self {
            PushValue::String(text) => writer.write_string(text, ctx.encoding()),
            PushValue::Float(value) => writer.write_f32(*value),
            PushValue::Null | PushValue::Undefined => Ok(()),
            PushValue::Register(index) => writer.write_byte(*index),
            PushValue::Boolean(value) => writer.write_byte(u8::from(*value)),
            PushValue::Double(value) => writer.write_f64(*value),
            PushValue::Integer(value) => writer.write_i32(*value),
            PushValue::Constant(index) => match u8::try_from(*index) {
                Ok(small) => writer.write_byte(small),
                Err(_) => writer.write_u16(*index),
            },
        }
    }

    fn decode(reader: &mut BitReader<'_>, ctx: &Context<'_>) -> Result<Self> {
        let type_code = reader.read_byte()?;
        Ok(match type_code {
            0 => PushValue::String(reader.read_string(ctx.encoding())?),
            1 => PushValue::Float(reader.read_f32()?),
            2 => PushValue::Null,
            3 => PushValue::Undefined,
            4 => PushValue::Register(reader.read_byte()?),
            5 => PushValue::Boolean(reader.read_byte()? != 0),
            6 => PushValue::Double(reader.read_f64()?),
            7 => PushValue::Integer(reader.read_i32()?),
            8 => PushValue::Constant(u16::from(reader.read_byte()?)),
            9 => PushValue::Constant(reader.read_u16()?),
            other => {
                return Err(Error::ValueOutOfRange {
                    field: "push value type",
                    value: i64::from(other),
                    min: 0,
                    max: 9,
                })
            }
        })
    }
}

/// One bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Any instruction without a body, identified by its opcode (0x01-0x7F)
    Basic(u8),
    GotoFrame(u16),
    GetUrl { url: String, target: String },
    WaitForFrame { frame: u16, skip: u8 },
    SetTarget(String),
    GotoLabel(String),
    Push(Vec<PushValue>),
    /// Signed byte offset from the end of this instruction
    Jump(i16),
    If(i16),
    /// Opcode with no registered decoder, kept verbatim in lenient mode
    Unknown { code: u8, body: Vec<u8> },
}

/// Human-readable name for an opcode.
pub fn kind_name(code: u16) -> &'static str {
    match code {
        0x01..=0x7F => "Basic",
        codes::GOTO_FRAME => "GotoFrame",
        codes::GET_URL => "GetUrl",
        codes::WAIT_FOR_FRAME => "WaitForFrame",
        codes::SET_TARGET => "SetTarget",
        codes::GOTO_LABEL => "GotoLabel",
        codes::PUSH => "Push",
        codes::JUMP => "Jump",
        codes::IF => "If",
        _ => "UnknownAction",
    }
}

impl Encode for Action {
    type Plan = usize;

    fn prepare(&self, ctx: &mut Context<'_>) -> Result<usize> {
        match self {
            Action::Basic(code) => check_range("action opcode", i64::from(*code), 0x01, 0x7F)?,
            Action::Unknown { code, .. } => check_range("action opcode", i64::from(*code), 0x01, 0xFF)?,
            _ => {}
        }
        Ok(match self {
            Action::Basic(_) => 0,
            Action::GotoFrame(_) | Action::Jump(_) | Action::If(_) => 2,
            Action::GetUrl { url, target } => string_len(url, ctx)? + string_len(target, ctx)?,
            Action::WaitForFrame { .. } => 3,
            Action::SetTarget(text) | Action::GotoLabel(text) => string_len(text, ctx)?,
            Action::Push(values) => {
                let mut len = 0;
                for value in values {
                    len += value.encoded_len(ctx)?;
                }
                len
            }
            Action::Unknown { body, .. } => body.len(),
        })
    }

    fn encode(&self, _plan: &usize, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()> {
        let encoding = ctx.encoding();
        match self {
            Action::Basic(_) => Ok(()),
            Action::GotoFrame(frame) => writer.write_u16(*frame),
            Action::GetUrl { url, target } => {
                writer.write_string(url, encoding)?;
                writer.write_string(target, encoding)
            }
            Action::WaitForFrame { frame, skip } => {
                writer.write_u16(*frame)?;
                writer.write_byte(*skip)
            }
            Action::SetTarget(text) | Action::GotoLabel(text) => writer.write_string(text, encoding),
            Action::Push(values) => {
                for value in values {
                    value.encode(writer, ctx)?;
                }
                Ok(())
            }
            Action::Jump(offset) | Action::If(offset) => writer.write_i16(*offset),
            Action::Unknown { body, .. } => writer.write_bytes(body),
        }
    }
}

impl Record for Action {
    type Framing = ActionFraming;

    fn code(&self) -> u16 {
        match self {
            Action::Basic(code) => u16::from(*code),
            Action::GotoFrame(_) => codes::GOTO_FRAME,
            Action::GetUrl { .. } => codes::GET_URL,
            Action::WaitForFrame { .. } => codes::WAIT_FOR_FRAME,
            Action::SetTarget(_) => codes::SET_TARGET,
            Action::GotoLabel(_) => codes::GOTO_LABEL,
            Action::Push(_) => codes::PUSH,
            Action::Jump(_) => codes::JUMP,
            Action::If(_) => codes::IF,
            Action::Unknown { code, .. } => u16::from(*code),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Action::Unknown { .. } => "UnknownAction",
            other => kind_name(other.code()),
        }
    }
}

pub(crate) fn register_defaults(registry: &mut Registry) {
    for code in 0x01..=0x7F {
        registry.register(code, |_reader, _ctx, key: &Discriminant| {
            Ok(Action::Basic(key.code as u8))
        });
    }
    registry.register(codes::GOTO_FRAME, |reader, _ctx, _key: &Discriminant| {
        Ok(Action::GotoFrame(reader.read_u16()?))
    });
    registry.register(codes::GET_URL, |reader, ctx, _key: &Discriminant| {
        let url = reader.read_string(ctx.encoding())?;
        let target = reader.read_string(ctx.encoding())?;
        Ok(Action::GetUrl { url, target })
    });
    registry.register(codes::WAIT_FOR_FRAME, |reader, _ctx, _key: &Discriminant| {
        let frame = reader.read_u16()?;
        let skip = reader.read_byte()?;
        Ok(Action::WaitForFrame { frame, skip })
    });
    registry.register(codes::SET_TARGET, |reader, ctx, _key: &Discriminant| {
        Ok(Action::SetTarget(reader.read_string(ctx.encoding())?))
    });
    registry.register(codes::GOTO_LABEL, |reader, ctx, _key: &Discriminant| {
        Ok(Action::GotoLabel(reader.read_string(ctx.encoding())?))
    });
    registry.register(codes::PUSH, |reader, ctx, key: &Discriminant| {
        let end = key.end().unwrap_or_else(|| reader.bit_len());
        let mut values = Vec::new();
        while reader.position() < end {
            values.push(PushValue::decode(reader, ctx)?);
        }
        Ok(Action::Push(values))
    });
    registry.register(codes::JUMP, |reader, _ctx, _key: &Discriminant| {
        Ok(Action::Jump(reader.read_i16()?))
    });
    registry.register(codes::IF, |reader, _ctx, _key: &Discriminant| {
        Ok(Action::If(reader.read_i16()?))
    });
}

/// Plans for an action block, end marker included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    pub body_len: usize,
    pub action_plans: Vec<usize>,
}

pub fn prepare_actions(actions: &[Action], ctx: &mut Context<'_>) -> Result<BlockPlan> {
    let mut body_len = 1;
    let mut action_plans = Vec::with_capacity(actions.len());
    for action in actions {
        let plan = action.prepare(ctx)?;
        body_len += framed_len(action, &plan);
        action_plans.push(plan);
    }
    Ok(BlockPlan {
        body_len,
        action_plans,
    })
}

pub fn write_actions(
    actions: &[Action],
    plan: &BlockPlan,
    writer: &mut BitWriter,
    ctx: &mut Context<'_>,
) -> Result<()> {
    for (action, action_plan) in actions.iter().zip(&plan.action_plans) {
        write_prepared(action, action_plan, writer, ctx)?;
    }
    writer.write_byte(END_OF_ACTIONS)
}

/// Decode actions up to the end marker or the bit position `end`.
///
/// A block that runs into `end` without an end marker is accepted.
pub fn decode_actions(
    reader: &mut BitReader<'_>,
    ctx: &mut Context<'_>,
    end: usize,
) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    while reader.position() < end {
        if reader.scan_byte()? == END_OF_ACTIONS {
            reader.read_byte()?;
            return Ok(actions);
        }
        actions.push(read_record::<Action>(reader, ctx)?);
    }
    debug!(count = actions.len(), "action block without end marker");
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DecodeMode;
    use crate::error::{FramingError, RegistryError};
    use crate::framing::write_record;

    fn encode_block(actions: &[Action], ctx: &mut Context<'_>) -> Vec<u8> {
        let plan = prepare_actions(actions, ctx).unwrap();
        let mut writer = BitWriter::new();
        write_actions(actions, &plan, &mut writer, ctx).unwrap();
        let bytes = writer.finish();
        assert_eq!(bytes.len(), plan.body_len);
        bytes
    }

    #[test]
    fn test_block_round_trip() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let actions = vec![
            Action::Basic(0x07),
            Action::GotoFrame(12),
            Action::GetUrl {
                url: "http://example.com".to_string(),
                target: "_blank".to_string(),
            },
            Action::WaitForFrame { frame: 3, skip: 1 },
            Action::SetTarget("/clip".to_string()),
            Action::GotoLabel("intro".to_string()),
            Action::Push(vec![
                PushValue::String("x".to_string()),
                PushValue::Float(1.5),
                PushValue::Null,
                PushValue::Undefined,
                PushValue::Register(3),
                PushValue::Boolean(true),
                PushValue::Double(-0.25),
                PushValue::Integer(-7),
                PushValue::Constant(9),
                PushValue::Constant(300),
            ]),
            Action::Jump(-12),
            Action::If(40),
        ];

        let bytes = encode_block(&actions, &mut ctx);
        let mut reader = BitReader::new(&bytes);
        let end = reader.bit_len();
        assert_eq!(decode_actions(&mut reader, &mut ctx, end).unwrap(), actions);
        assert!(reader.eof());
    }

    #[test]
    fn test_goto_frame_layout() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let bytes = encode_block(&[Action::Basic(0x06), Action::GotoFrame(0x0102)], &mut ctx);
        assert_eq!(bytes, vec![0x06, 0x81, 0x02, 0x00, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_constant_width_follows_index() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let mut writer = BitWriter::new();
        let push = Action::Push(vec![PushValue::Constant(255), PushValue::Constant(256)]);
        write_record(&push, &mut writer, &mut ctx).unwrap();
        assert_eq!(
            writer.finish(),
            vec![0x96, 0x05, 0x00, 8, 0xFF, 9, 0x00, 0x01]
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let registry = Registry::standard();
        let bytes = [0xF0, 0x02, 0x00, 0xAA, 0xBB, 0x00];

        let mut ctx = Context::new(&registry);
        let mut reader = BitReader::new(&bytes);
        assert!(matches!(
            decode_actions(&mut reader, &mut ctx, bytes.len() * 8),
            Err(Error::Registry(RegistryError::UnsupportedType { code: 0xF0, .. }))
        ));

        ctx.set_mode(DecodeMode::Lenient);
        let mut reader = BitReader::new(&bytes);
        let actions = decode_actions(&mut reader, &mut ctx, bytes.len() * 8).unwrap();
        let expected = vec![Action::Unknown {
            code: 0xF0,
            body: vec![0xAA, 0xBB],
        }];
        assert_eq!(actions, expected);
        assert_eq!(encode_block(&expected, &mut ctx), bytes.to_vec());
    }

    #[test]
    fn test_push_body_overrun_is_mismatch() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        // Push declares 2 bytes but its integer value needs 5.
        let bytes = [0x96, 0x02, 0x00, 7, 1, 0, 0, 0, 0x00];
        let mut reader = BitReader::new(&bytes);
        assert!(matches!(
            decode_actions(&mut reader, &mut ctx, bytes.len() * 8),
            Err(Error::Framing(FramingError::RecordLengthMismatch {
                record: "Push",
                delta: 3,
                ..
            }))
        ));
    }

    #[test]
    fn test_block_without_end_marker() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let bytes = [0x07, 0x06];
        let mut reader = BitReader::new(&bytes);
        let actions = decode_actions(&mut reader, &mut ctx, 16).unwrap();
        assert_eq!(actions, vec![Action::Basic(0x07), Action::Basic(0x06)]);
    }

    #[test]
    fn test_opcodes_outside_their_range_are_rejected() {
        let registry = Registry::standard();
        let mut ctx = Context::new(&registry);
        let rejected = [
            Action::Basic(END_OF_ACTIONS),
            Action::Basic(0x81),
            Action::Unknown {
                code: END_OF_ACTIONS,
                body: vec![],
            },
        ];
        for action in &rejected {
            assert!(matches!(
                prepare_actions(&[action.clone(), Action::Basic(0x07)], &mut ctx),
                Err(Error::ValueOutOfRange {
                    field: "action opcode",
                    ..
                })
            ));
        }
        assert!(prepare_actions(&[Action::Basic(0x01), Action::Basic(0x7F)], &mut ctx).is_ok());
    }
}
