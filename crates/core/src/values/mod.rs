//! The representative value catalog.
//!
//! Shared bit-packed values ([`color`], [`geometry`]), the registry-dispatched
//! categories ([`style`], [`filter`], [`action`]) and the top-level records
//! ([`tag`], with bodies in [`shape`] and [`place`]).
//!
//! Unframed values implement [`Element`]: they know their own encoded size,
//! so an enclosing record's plan can add them up without writing anything.

use crate::bitio::{BitReader, BitWriter};
use crate::context::Context;
use crate::error::Result;

pub mod action;
pub mod color;
pub mod filter;
pub mod geometry;
pub mod place;
pub mod shape;
pub mod style;
pub mod tag;

/// A value embedded in a record body without a header of its own.
pub trait Element: Sized {
    /// Encoded size in bytes, including any trailing alignment.
    ///
    /// Takes the context mutably: preparing a value may leave flags behind for
    /// the enclosing record, exactly as encoding would.
    fn encoded_len(&self, ctx: &mut Context<'_>) -> Result<usize>;

    fn encode(&self, writer: &mut BitWriter, ctx: &mut Context<'_>) -> Result<()>;

    fn decode(reader: &mut BitReader<'_>, ctx: &mut Context<'_>) -> Result<Self>;
}

/// Encoded size of a null-terminated string in the context's text encoding.
pub(crate) fn string_len(text: &str, ctx: &Context<'_>) -> Result<usize> {
    Ok(ctx.encoding().encode(text)?.len() + 1)
}

/// Smallest signed width that holds every value, or 0 when all are zero.
pub(crate) fn field_width(values: &[i32]) -> u32 {
    if values.iter().all(|&v| v == 0) {
        return 0;
    }
    values
        .iter()
        .map(|&v| crate::bitio::signed_width(v))
        .max()
        .unwrap_or(0)
}

/// Sum the encoded sizes of a list of elements.
pub(crate) fn list_len<T: Element>(items: &[T], ctx: &mut Context<'_>) -> Result<usize> {
    let mut total = 0;
    for item in items {
        total += item.encoded_len(ctx)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_field_width() {
        assert_eq!(field_width(&[0, 0]), 0);
        assert_eq!(field_width(&[1]), 2);
        assert_eq!(field_width(&[-1, 0]), 1);
        assert_eq!(field_width(&[20, -300]), 10);
    }

    #[test]
    fn test_string_len_counts_terminator() {
        let registry = Registry::empty();
        let ctx = Context::new(&registry);
        assert_eq!(string_len("", &ctx).unwrap(), 1);
        assert_eq!(string_len("caf\u{e9}", &ctx).unwrap(), 6);
    }
}
