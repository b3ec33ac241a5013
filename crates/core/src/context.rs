//! The per-pass encode/decode environment.
//!
//! A [`Context`] is created by the caller for exactly one pass and threaded
//! through every encode and decode call. Some records leave flags behind for
//! records processed later in the same pass (a shape's line styles tell the
//! shape whether any stroke scales), so the context is mutable. It is never
//! stored globally and never reused for a second pass.

use crate::bitio::TextEncoding;
use crate::config::CodecConfig;
use crate::metrics::PassStats;
use crate::registry::Registry;

/// How the registry treats discriminants it has no factory for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Unknown types abort the pass
    #[default]
    Strict,
    /// Unknown framed records are skipped and kept as raw bytes
    Lenient,
}

/// Named boolean flags carried by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Colors carry an alpha channel
    Alpha,
    /// Some line style in the current shape lets its stroke scale
    ScalingStrokes,
    /// Some line style in the current shape keeps its stroke width fixed
    NonScalingStrokes,
    /// Decode action bytecode into instructions instead of keeping raw bytes
    DecodeActions,
}

impl Flag {
    fn bit(self) -> u8 {
        match self {
            Flag::Alpha => 1 << 0,
            Flag::ScalingStrokes => 1 << 1,
            Flag::NonScalingStrokes => 1 << 2,
            Flag::DecodeActions => 1 << 3,
        }
    }
}

/// Mutable environment for one encode or decode pass.
#[derive(Debug)]
pub struct Context<'r> {
    registry: &'r Registry,
    version: u8,
    mode: DecodeMode,
    encoding: Option<TextEncoding>,
    flags: u8,
    stats: PassStats,
}

impl<'r> Context<'r> {
    /// Format version assumed until a movie header says otherwise.
    pub const DEFAULT_VERSION: u8 = 10;

    /// Create a strict context that decodes actions structurally.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            version: Self::DEFAULT_VERSION,
            mode: DecodeMode::Strict,
            encoding: None,
            flags: Flag::DecodeActions.bit(),
            stats: PassStats::new(),
        }
    }

    /// Create a context from a parsed configuration.
    pub fn from_config(registry: &'r Registry, config: &CodecConfig) -> Self {
        let mut ctx = Self::new(registry);
        ctx.version = config.version;
        ctx.mode = config.mode;
        ctx.encoding = config.encoding;
        ctx.set_flag(Flag::DecodeActions, config.decode_actions);
        ctx
    }

    /// The registry used for decode dispatch.
    ///
    /// The returned reference outlives the borrow of `self`, so it can be used
    /// while the context is passed on mutably.
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DecodeMode) {
        self.mode = mode;
    }

    pub fn is_lenient(&self) -> bool {
        self.mode == DecodeMode::Lenient
    }

    /// Text encoding for strings: the override if one is set, otherwise
    /// UTF-8 from version 6 on and Latin-1 before.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding.unwrap_or(if self.version >= 6 {
            TextEncoding::Utf8
        } else {
            TextEncoding::Latin1
        })
    }

    pub fn set_encoding(&mut self, encoding: Option<TextEncoding>) {
        self.encoding = encoding;
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags & flag.bit() != 0
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.flags |= flag.bit();
        } else {
            self.flags &= !flag.bit();
        }
    }

    /// Run `f` with `flag` set to `value`, then restore the previous value.
    pub fn with_flag<R>(&mut self, flag: Flag, value: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.flag(flag);
        self.set_flag(flag, value);
        let result = f(self);
        self.set_flag(flag, previous);
        result
    }

    pub fn stats(&self) -> &PassStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut PassStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let registry = Registry::empty();
        let ctx = Context::new(&registry);
        assert_eq!(ctx.version(), Context::DEFAULT_VERSION);
        assert_eq!(ctx.mode(), DecodeMode::Strict);
        assert!(ctx.flag(Flag::DecodeActions));
        assert!(!ctx.flag(Flag::Alpha));
        assert!(!ctx.flag(Flag::ScalingStrokes));
        assert!(!ctx.flag(Flag::NonScalingStrokes));
    }

    #[test]
    fn test_encoding_follows_version_unless_overridden() {
        let registry = Registry::empty();
        let mut ctx = Context::new(&registry);
        assert_eq!(ctx.encoding(), TextEncoding::Utf8);

        ctx.set_version(5);
        assert_eq!(ctx.encoding(), TextEncoding::Latin1);

        ctx.set_encoding(Some(TextEncoding::Utf8));
        assert_eq!(ctx.encoding(), TextEncoding::Utf8);
    }

    #[test]
    fn test_flags_are_independent() {
        let registry = Registry::empty();
        let mut ctx = Context::new(&registry);
        ctx.set_flag(Flag::ScalingStrokes, true);
        assert!(ctx.flag(Flag::ScalingStrokes));
        assert!(!ctx.flag(Flag::NonScalingStrokes));

        ctx.set_flag(Flag::DecodeActions, false);
        assert!(!ctx.flag(Flag::DecodeActions));
        assert!(ctx.flag(Flag::ScalingStrokes));
    }

    #[test]
    fn test_with_flag_restores_previous_value() {
        let registry = Registry::empty();
        let mut ctx = Context::new(&registry);

        let seen = ctx.with_flag(Flag::Alpha, true, |ctx| ctx.flag(Flag::Alpha));
        assert!(seen);
        assert!(!ctx.flag(Flag::Alpha));

        // Restored even when the closure fails.
        let result: Result<(), Error> =
            ctx.with_flag(Flag::Alpha, true, |_| Err(Error::Config("boom".into())));
        assert!(result.is_err());
        assert!(!ctx.flag(Flag::Alpha));
    }

    #[test]
    fn test_fresh_context_does_not_inherit_flags() {
        let registry = Registry::empty();
        let mut first = Context::new(&registry);
        first.set_flag(Flag::ScalingStrokes, true);
        drop(first);

        let second = Context::new(&registry);
        assert!(!second.flag(Flag::ScalingStrokes));
    }

    #[test]
    fn test_from_config() {
        let registry = Registry::empty();
        let config = CodecConfig {
            version: 5,
            mode: DecodeMode::Lenient,
            decode_actions: false,
            encoding: Some(TextEncoding::Utf8),
        };
        let ctx = Context::from_config(&registry, &config);
        assert_eq!(ctx.version(), 5);
        assert!(ctx.is_lenient());
        assert!(!ctx.flag(Flag::DecodeActions));
        assert_eq!(ctx.encoding(), TextEncoding::Utf8);
    }
}
