//! Decode-time type dispatch.
//!
//! Each record category has its own discriminant space and its own
//! [`TypeTable`] of factories. A [`Registry`] bundles the tables, is built once
//! before any pass starts, and is then only read, so one registry can back any
//! number of concurrent passes on different threads.
//!
//! Encoding never consults the registry: every variant knows its own
//! discriminant.
//!
//! # Strict and lenient decoding
//!
//! A discriminant with no factory raises `UnsupportedType` in strict mode. In
//! lenient mode a *framed* record (one whose header declared a body length) is
//! skipped and returned as an opaque placeholder holding its raw body.
//! Unframed values such as fill styles have no declared length to skip, so
//! they fail in both modes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::bitio::BitReader;
use crate::context::{Context, DecodeMode};
use crate::error::{RegistryError, Result};
use crate::framing::RecordHeader;
use crate::values::action::{self, Action};
use crate::values::filter::{self, Filter};
use crate::values::style::{self, FillStyle};
use crate::values::tag::{self, Tag};

/// A discriminant space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Tag,
    Action,
    FillStyle,
    Filter,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Tag => "tag",
            Category::Action => "action",
            Category::FillStyle => "fill style",
            Category::Filter => "filter",
        };
        f.write_str(name)
    }
}

/// What a factory learns about the value it is asked to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discriminant {
    /// Type code within the category
    pub code: u16,
    /// Byte offset where the value (including its header) starts
    pub offset: usize,
    /// Bit position of the first body bit
    pub body_start: usize,
    /// Declared body length in bytes, for framed categories
    pub length: Option<usize>,
}

impl Discriminant {
    /// Key for a record whose header has already been read.
    pub fn framed(header: &RecordHeader) -> Self {
        Self {
            code: header.code,
            offset: header.offset,
            body_start: header.body_start,
            length: Some(header.length),
        }
    }

    /// Key for a value identified by a leading type byte and no length.
    pub fn unframed(code: u16, offset: usize, body_start: usize) -> Self {
        Self {
            code,
            offset,
            body_start,
            length: None,
        }
    }

    /// Bit position where the body must end, if the length is known.
    pub fn end(&self) -> Option<usize> {
        self.length.map(|len| self.body_start + len * 8)
    }
}

/// Decodes the body of one variant.
pub type Factory<T> =
    Arc<dyn Fn(&mut BitReader<'_>, &mut Context<'_>, &Discriminant) -> Result<T> + Send + Sync>;

/// Factories for one category, keyed by discriminant.
pub struct TypeTable<T> {
    category: Category,
    factories: HashMap<u16, Factory<T>>,
}

impl<T> TypeTable<T> {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            factories: HashMap::new(),
        }
    }

    /// Associate `code` with `factory`, returning the factory it replaces.
    pub fn register<F>(&mut self, code: u16, factory: F) -> Option<Factory<T>>
    where
        F: Fn(&mut BitReader<'_>, &mut Context<'_>, &Discriminant) -> Result<T>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(code, Arc::new(factory))
    }

    pub fn get(&self, code: u16) -> Option<&Factory<T>> {
        self.factories.get(&code)
    }

    pub fn contains(&self, code: u16) -> bool {
        self.factories.contains_key(&code)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered codes in ascending order.
    pub fn codes(&self) -> Vec<u16> {
        let mut codes: Vec<u16> = self.factories.keys().copied().collect();
        codes.sort_unstable();
        codes
    }
}

impl<T> fmt::Debug for TypeTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTable")
            .field("category", &self.category)
            .field("codes", &self.codes())
            .finish()
    }
}

/// A type decoded through the registry.
pub trait Dispatch: Sized + 'static {
    const CATEGORY: Category;

    fn table(registry: &Registry) -> &TypeTable<Self>;

    fn table_mut(registry: &mut Registry) -> &mut TypeTable<Self>;

    /// Placeholder for an unknown framed value, or `None` if the category
    /// cannot represent one.
    fn opaque(code: u16, body: Vec<u8>) -> Option<Self>;

    /// Human-readable kind name for a discriminant, used in errors.
    fn kind_name(code: u16) -> &'static str;
}

/// The per-category factory tables.
#[derive(Debug)]
pub struct Registry {
    tags: TypeTable<Tag>,
    actions: TypeTable<Action>,
    fill_styles: TypeTable<FillStyle>,
    filters: TypeTable<Filter>,
}

impl Registry {
    /// A registry with no factories.
    pub fn empty() -> Self {
        Self {
            tags: TypeTable::new(Category::Tag),
            actions: TypeTable::new(Category::Action),
            fill_styles: TypeTable::new(Category::FillStyle),
            filters: TypeTable::new(Category::Filter),
        }
    }

    /// A registry with every built-in record, action, style and filter.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        tag::register_defaults(&mut registry);
        action::register_defaults(&mut registry);
        style::register_defaults(&mut registry);
        filter::register_defaults(&mut registry);
        registry
    }

    /// Register a factory in the table its return type selects.
    ///
    /// Re-registering a code replaces the previous factory.
    pub fn register<T, F>(&mut self, code: u16, factory: F) -> &mut Self
    where
        T: Dispatch,
        F: Fn(&mut BitReader<'_>, &mut Context<'_>, &Discriminant) -> Result<T>
            + Send
            + Sync
            + 'static,
    {
        if T::table_mut(self).register(code, factory).is_some() {
            trace!(category = %T::CATEGORY, code, "factory replaced");
        }
        self
    }

    pub fn table<T: Dispatch>(&self) -> &TypeTable<T> {
        T::table(self)
    }

    pub fn contains<T: Dispatch>(&self, code: u16) -> bool {
        T::table(self).contains(code)
    }

    /// Decode one value of category `T`.
    ///
    /// The cursor must be at the first body bit described by `key`.
    pub fn decode<T: Dispatch>(
        &self,
        key: &Discriminant,
        reader: &mut BitReader<'_>,
        ctx: &mut Context<'_>,
    ) -> Result<T> {
        if let Some(factory) = T::table(self).get(key.code) {
            trace!(category = %T::CATEGORY, code = key.code, offset = key.offset, "dispatch");
            return factory(reader, ctx, key);
        }

        let unsupported = RegistryError::UnsupportedType {
            category: T::CATEGORY,
            code: key.code,
            offset: key.offset,
        };
        let (DecodeMode::Lenient, Some(length)) = (ctx.mode(), key.length) else {
            return Err(unsupported.into());
        };

        let body = reader.read_bytes(length)?;
        let Some(value) = T::opaque(key.code, body) else {
            return Err(unsupported.into());
        };
        warn!(
            category = %T::CATEGORY,
            code = key.code,
            offset = key.offset,
            length,
            "skipped unknown record"
        );
        ctx.stats_mut().record_opaque();
        Ok(value)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Dispatch for Tag {
    const CATEGORY: Category = Category::Tag;

    fn table(registry: &Registry) -> &TypeTable<Self> {
        &registry.tags
    }

    fn table_mut(registry: &mut Registry) -> &mut TypeTable<Self> {
        &mut registry.tags
    }

    fn opaque(code: u16, body: Vec<u8>) -> Option<Self> {
        Some(Tag::Unknown(tag::Opaque { code, body }))
    }

    fn kind_name(code: u16) -> &'static str {
        tag::kind_name(code)
    }
}

impl Dispatch for Action {
    const CATEGORY: Category = Category::Action;

    fn table(registry: &Registry) -> &TypeTable<Self> {
        &registry.actions
    }

    fn table_mut(registry: &mut Registry) -> &mut TypeTable<Self> {
        &mut registry.actions
    }

    fn opaque(code: u16, body: Vec<u8>) -> Option<Self> {
        let code = u8::try_from(code).ok()?;
        Some(Action::Unknown { code, body })
    }

    fn kind_name(code: u16) -> &'static str {
        action::kind_name(code)
    }
}

impl Dispatch for FillStyle {
    const CATEGORY: Category = Category::FillStyle;

    fn table(registry: &Registry) -> &TypeTable<Self> {
        &registry.fill_styles
    }

    fn table_mut(registry: &mut Registry) -> &mut TypeTable<Self> {
        &mut registry.fill_styles
    }

    fn opaque(_code: u16, _body: Vec<u8>) -> Option<Self> {
        None
    }

    fn kind_name(_code: u16) -> &'static str {
        "FillStyle"
    }
}

impl Dispatch for Filter {
    const CATEGORY: Category = Category::Filter;

    fn table(registry: &Registry) -> &TypeTable<Self> {
        &registry.filters
    }

    fn table_mut(registry: &mut Registry) -> &mut TypeTable<Self> {
        &mut registry.filters
    }

    fn opaque(_code: u16, _body: Vec<u8>) -> Option<Self> {
        None
    }

    fn kind_name(_code: u16) -> &'static str {
        "Filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::values::tag::Opaque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(code: u16, length: usize) -> Discriminant {
        Discriminant {
            code,
            offset: 0,
            body_start: 0,
            length: Some(length),
        }
    }

    #[test]
    fn test_registered_factory_is_invoked() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let mut registry = Registry::empty();
        registry.register(5, move |reader, _ctx, key: &Discriminant| {
            counter.fetch_add(1, Ordering::SeqCst);
            let body = reader.read_bytes(key.length.unwrap_or(0))?;
            Ok(Tag::Unknown(Opaque {
                code: key.code,
                body,
            }))
        });

        let mut ctx = Context::new(&registry);
        let data = [0x01, 0x02];
        let mut reader = BitReader::new(&data);
        let tag: Tag = registry.decode(&key(5, 2), &mut reader, &mut ctx).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            tag,
            Tag::Unknown(Opaque {
                code: 5,
                body: vec![1, 2]
            })
        );
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = Registry::empty();
        registry.register(1, |_r, _c, _k: &Discriminant| Ok(Tag::End));
        registry.register(1, |_r, _c, _k: &Discriminant| Ok(Tag::ShowFrame));
        assert_eq!(registry.table::<Tag>().len(), 1);

        let mut ctx = Context::new(&registry);
        let mut reader = BitReader::new(&[]);
        let tag: Tag = registry.decode(&key(1, 0), &mut reader, &mut ctx).unwrap();
        assert_eq!(tag, Tag::ShowFrame);
    }

    #[test]
    fn test_strict_miss_is_unsupported() {
        let registry = Registry::empty();
        let mut ctx = Context::new(&registry);
        let mut reader = BitReader::new(&[1, 2, 3]);

        let result: Result<Tag> = registry.decode(&key(77, 3), &mut reader, &mut ctx);
        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::UnsupportedType {
                category: Category::Tag,
                code: 77,
                ..
            }))
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_lenient_miss_returns_opaque_body() {
        let registry = Registry::empty();
        let mut ctx = Context::new(&registry);
        ctx.set_mode(DecodeMode::Lenient);
        let mut reader = BitReader::new(&[1, 2, 3, 4]);

        let tag: Tag = registry.decode(&key(77, 3), &mut reader, &mut ctx).unwrap();
        assert_eq!(
            tag,
            Tag::Unknown(Opaque {
                code: 77,
                body: vec![1, 2, 3]
            })
        );
        assert_eq!(reader.position(), 24);
        assert_eq!(ctx.stats().opaque_records, 1);
    }

    #[test]
    fn test_lenient_miss_without_length_still_fails() {
        let registry = Registry::empty();
        let mut ctx = Context::new(&registry);
        ctx.set_mode(DecodeMode::Lenient);
        let mut reader = BitReader::new(&[0x00, 1, 2, 3]);

        let result: Result<FillStyle> =
            registry.decode(&Discriminant::unframed(0x00, 0, 8), &mut reader, &mut ctx);
        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::UnsupportedType {
                category: Category::FillStyle,
                ..
            }))
        ));
    }

    #[test]
    fn test_standard_registry_covers_catalog() {
        let registry = Registry::standard();
        for code in [0, 1, 2, 9, 12, 22, 32, 43, 70, 83] {
            assert!(registry.contains::<Tag>(code), "tag {code}");
        }
        for code in [0x07, 0x81, 0x83, 0x8A, 0x8B, 0x8C, 0x96, 0x99, 0x9D] {
            assert!(registry.contains::<Action>(code), "action {code:#x}");
        }
        for code in [0x00, 0x10, 0x12, 0x13, 0x40, 0x41, 0x42, 0x43] {
            assert!(registry.contains::<FillStyle>(code), "fill {code:#x}");
        }
        for code in 0..=7 {
            assert!(registry.contains::<Filter>(code), "filter {code}");
        }
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
