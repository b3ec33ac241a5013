//! flashtag-core: encoder/decoder engine for tag-structured movie files
//!
//! This library provides the core components of a codec for a flat stream of
//! typed, length-prefixed records, each holding bit-packed fields:
//! - Reads and writes bit fields, little-endian words, strings and fixed point
//! - Frames records with short/long headers and checks every record ends
//!   exactly where its header said
//! - Dispatches decoding through a per-category registry, strictly or leniently
//! - Threads an explicit per-pass context through every encode and decode
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Low-level bit reading/writing
//! - `framing`: Record headers, encode plans and the end-position check
//! - `registry`: Decode-time type dispatch
//! - `context`: Per-pass flags, version, mode and statistics
//! - `config`: Pass configuration
//! - `metrics`: Per-pass record statistics
//! - `stream`: Tag streams and the movie header
//! - `values`: The representative record catalog
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and returned to the caller
//! - **Fail fast**: Any framing violation aborts the pass
//! - **No globals**: The registry and the context are explicit values
//! - **Shareable**: One registry serves any number of concurrent passes

pub mod bitio;
pub mod config;
pub mod context;
pub mod error;
pub mod framing;
pub mod metrics;
pub mod registry;
pub mod stream;
pub mod values;

// Re-export commonly used types
pub use bitio::{BitReader, BitWriter, Checkpoint, TextEncoding};
pub use config::CodecConfig;
pub use context::{Context, DecodeMode, Flag};
pub use error::{Error, Result};
pub use framing::{Encode, EncodePlan, Framing, Record, RecordHeader};
pub use registry::{Category, Discriminant, Registry};
pub use stream::{decode_tags, encode_tags, Movie, MovieHeader};
pub use values::tag::Tag;
