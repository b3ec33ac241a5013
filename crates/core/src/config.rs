//! Pass configuration.
//!
//! Handles parsing command-line style arguments into a [`CodecConfig`] that
//! a caller turns into a [`Context`](crate::context::Context) for each pass.
//!
//! # Philosophy
//!
//! Works with ZERO arguments: the defaults decode a current-version movie
//! strictly, with actions decoded structurally and the text encoding picked
//! from the version.

use crate::bitio::TextEncoding;
use crate::context::{Context, DecodeMode};
use crate::error::{Error, Result};

/// Settings shared by every pass built from this configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Format version assumed before a movie header is read
    pub version: u8,

    /// Strict or lenient handling of unknown types
    pub mode: DecodeMode,

    /// Decode action bytecode into instructions
    pub decode_actions: bool,

    /// Text encoding override (None = derive from version)
    pub encoding: Option<TextEncoding>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            version: Context::DEFAULT_VERSION,
            mode: DecodeMode::Strict,
            decode_actions: true,
            encoding: None,
        }
    }
}

impl CodecConfig {
    /// Parse configuration from command-line arguments.
    ///
    /// Unrecognized arguments are an error, so a typo never silently falls
    /// back to a default.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Self::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--version" => {
                    i += 1;
                    if i >= args.len() {
                        return Err(Error::Config("--version requires a number".to_string()));
                    }
                    config.version = args[i]
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid version: {}", args[i])))?;
                }
                "--lenient" => {
                    config.mode = DecodeMode::Lenient;
                }
                "--strict" => {
                    config.mode = DecodeMode::Strict;
                }
                "--raw-actions" => {
                    config.decode_actions = false;
                }
                "--encoding" => {
                    i += 1;
                    if i >= args.len() {
                        return Err(Error::Config("--encoding requires a name".to_string()));
                    }
                    config.encoding = Some(match args[i].to_ascii_lowercase().as_str() {
                        "utf8" | "utf-8" => TextEncoding::Utf8,
                        "latin1" | "iso-8859-1" => TextEncoding::Latin1,
                        other => {
                            return Err(Error::Config(format!("unknown encoding: {other}")));
                        }
                    });
                }
                other => {
                    return Err(Error::Config(format!("unknown argument: {other}")));
                }
            }
            i += 1;
        }

        Ok(config)
    }

    /// One-line human-readable description.
    pub fn summary(&self) -> String {
        let mode = match self.mode {
            DecodeMode::Strict => "strict",
            DecodeMode::Lenient => "lenient",
        };
        let encoding = match self.encoding {
            Some(encoding) => encoding.name(),
            None => "auto",
        };
        format!(
            "version={} mode={} actions={} encoding={}",
            self.version,
            mode,
            if self.decode_actions { "decoded" } else { "raw" },
            encoding,
        )
    }
}
