//! Type collection: type code -> factory, plus a range table for validated
//! reconstruction through abstract families.
//!
//! A collection is assembled once by a [`TypeCollectionBuilder`] and is
//! read-only afterwards. Publish it through a `OnceLock` static to get one
//! deterministic registration pass before the first lookup.
//!
//! # Example
//!
//! ```
//! use std::sync::OnceLock;
//!
//! use fieldwire::registry::TypeCollection;
//! use fieldwire::serialize::{Record, Visitor};
//! use fieldwire::Result;
//!
//! #[derive(Default)]
//! struct Ping {
//!     seq: u32,
//! }
//!
//! impl Record for Ping {
//!     fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
//!         v.process_u32("seq", &mut self.seq)
//!     }
//! }
//!
//! static TYPES: OnceLock<TypeCollection> = OnceLock::new();
//!
//! fn types() -> &'static TypeCollection {
//!     TYPES.get_or_init(|| {
//!         let mut b = TypeCollection::builder("ctl");
//!         b.register::<Ping>(1, "Ping");
//!         b.build()
//!     })
//! }
//!
//! let ping = types().new_typed::<Ping>(1, vec![0u8, 0, 0, 5], 0).unwrap();
//! assert_eq!(ping.seq, 5);
//! ```

use std::any::{type_name, TypeId};
use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, enabled, error, trace, warn, Level};

use crate::codec::{to_text, Unmarshal};
use crate::error::{Result, SerializeError};
use crate::serialize::{options, Context, Record};

/// Type code carried on the wire.
pub type TypeCode = u32;

/// Builds a blank instance of a registered type.
pub type Factory = Box<dyn Fn() -> Result<Box<dyn Record>> + Send + Sync>;

/// Inclusive range of type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeRange {
    /// Lowest valid code.
    pub low: TypeCode,
    /// Highest valid code.
    pub high: TypeCode,
}

impl CodeRange {
    pub fn new(low: TypeCode, high: TypeCode) -> Self {
        Self { low, high }
    }

    /// Range holding exactly one code.
    pub fn single(code: TypeCode) -> Self {
        Self::new(code, code)
    }

    #[inline]
    pub fn contains(&self, code: TypeCode) -> bool {
        self.low <= code && code <= self.high
    }

    /// Number of codes in the range.
    pub fn width(&self) -> u64 {
        u64::from(self.high) - u64::from(self.low) + 1
    }
}

/// Entry for a registered concrete type.
struct TypeEntry {
    name: &'static str,
    factory: Factory,
}

/// Range table entry, keyed by the runtime type identifier.
#[derive(Debug, Clone, Copy)]
struct RangeEntry {
    family: &'static str,
    range: CodeRange,
}

/// Registered type, as reported by [`TypeCollection::schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSchema {
    pub code: TypeCode,
    pub name: &'static str,
}

/// Aggregate group, as reported by [`TypeCollection::schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSchema {
    pub family: &'static str,
    pub low: TypeCode,
    pub high: TypeCode,
}

/// Snapshot of a collection's registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSchema {
    pub collection: &'static str,
    pub types: Vec<TypeSchema>,
    pub groups: Vec<GroupSchema>,
}

/// Collects registrations before the collection is frozen.
pub struct TypeCollectionBuilder {
    name: &'static str,
    context: Context,
    dispatch: BTreeMap<TypeCode, TypeEntry>,
    ranges: HashMap<TypeId, RangeEntry>,
    /// Explicit groups in declaration order.
    groups: Vec<TypeId>,
}

impl TypeCollectionBuilder {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            context: Context::Unknown,
            dispatch: BTreeMap::new(),
            ranges: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Context used when decoding payloads.
    pub fn context(&mut self, context: Context) -> &mut Self {
        self.context = context;
        self
    }

    /// Register `T` under `code`, built blank via `T::default()`.
    ///
    /// # Panics
    ///
    /// Panics if `code` or `T` is already registered.
    pub fn register<T: Record + Default>(&mut self, code: TypeCode, name: &'static str) -> &mut Self {
        self.register_with::<T, _>(code, name, || Ok(Box::new(T::default())))
    }

    /// Register `T` under `code` with a custom (fallible) factory.
    ///
    /// # Panics
    ///
    /// Panics if `code` or `T` is already registered.
    pub fn register_with<T, F>(&mut self, code: TypeCode, name: &'static str, factory: F) -> &mut Self
    where
        T: Record,
        F: Fn() -> Result<Box<T>> + Send + Sync + 'static,
    {
        if let Some(existing) = self.dispatch.get(&code) {
            panic!(
                "{}: type code {} registered twice ({} and {})",
                self.name, code, existing.name, name
            );
        }
        if self.ranges.contains_key(&TypeId::of::<T>()) {
            panic!("{}: type {} registered twice", self.name, type_name::<T>());
        }

        debug!(collection = self.name, code, name, "register type");
        self.dispatch.insert(
            code,
            TypeEntry {
                name,
                factory: Box::new(move || factory().map(|obj| obj as Box<dyn Record>)),
            },
        );
        self.ranges.insert(
            TypeId::of::<T>(),
            RangeEntry {
                family: name,
                range: CodeRange::single(code),
            },
        );
        self
    }

    /// Declare `F` (typically `dyn SomeTrait`) as the abstract family owning
    /// codes `low..=high`.
    ///
    /// # Panics
    ///
    /// Panics if `low > high` or `F` already has a range.
    pub fn group<F: ?Sized + 'static>(&mut self, low: TypeCode, high: TypeCode) -> &mut Self {
        assert!(low <= high, "{}: empty group range [{low}, {high}]", self.name);
        let key = TypeId::of::<F>();
        if self.ranges.contains_key(&key) {
            panic!("{}: group {} declared twice", self.name, type_name::<F>());
        }

        debug!(collection = self.name, family = type_name::<F>(), low, high, "declare group");
        self.ranges.insert(
            key,
            RangeEntry {
                family: type_name::<F>(),
                range: CodeRange::new(low, high),
            },
        );
        self.groups.push(key);
        self
    }

    /// Freeze the registrations.
    ///
    /// # Panics
    ///
    /// Panics if a group range contains a code with no registered type.
    pub fn build(self) -> TypeCollection {
        for key in &self.groups {
            let entry = self.ranges[key];
            let range = entry.range;
            let covered = self.dispatch.range(range.low..=range.high).count() as u64;
            if covered != range.width() {
                panic!(
                    "{}: group {} [{}, {}] covers {} registered codes, expected {}",
                    self.name,
                    entry.family,
                    range.low,
                    range.high,
                    covered,
                    range.width()
                );
            }
        }

        TypeCollection {
            name: self.name,
            context: self.context,
            dispatch: self.dispatch,
            ranges: self.ranges,
            groups: self.groups,
        }
    }
}

/// Read-only registry reconstructing records from a type code and payload.
pub struct TypeCollection {
    name: &'static str,
    context: Context,
    dispatch: BTreeMap<TypeCode, TypeEntry>,
    ranges: HashMap<TypeId, RangeEntry>,
    groups: Vec<TypeId>,
}

impl TypeCollection {
    /// Start registering types for a collection called `name`.
    pub fn builder(name: &'static str) -> TypeCollectionBuilder {
        TypeCollectionBuilder::new(name)
    }

    /// Collection name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of registered concrete types.
    pub fn len(&self) -> usize {
        self.dispatch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatch.is_empty()
    }

    /// Check whether `code` is registered.
    pub fn contains(&self, code: TypeCode) -> bool {
        self.dispatch.contains_key(&code)
    }

    /// Registered name for `code`.
    pub fn type_name(&self, code: TypeCode) -> Option<&'static str> {
        self.dispatch.get(&code).map(|e| e.name)
    }

    /// Valid code range for a family or concrete type.
    pub fn code_range<F: ?Sized + 'static>(&self) -> Option<CodeRange> {
        self.ranges.get(&TypeId::of::<F>()).map(|e| e.range)
    }

    /// Build a blank instance for `code` through family `F` and decode
    /// `payload` into it.
    ///
    /// # Errors
    ///
    /// - [`SerializeError::TypeCode`] if `code` is outside `F`'s range
    /// - [`SerializeError::OutOfMemory`] if the factory cannot allocate
    /// - [`SerializeError::CorruptPayload`] if decoding fails
    pub fn new_object<F: ?Sized + 'static>(
        &self,
        code: TypeCode,
        payload: impl Into<Bytes>,
        options: u32,
    ) -> Result<Box<dyn Record>> {
        let family = type_name::<F>();
        let range = self.ranges.get(&TypeId::of::<F>()).map(|e| e.range);

        let in_range = range.is_some_and(|r| r.contains(code));
        let entry = match self.dispatch.get(&code) {
            Some(entry) if in_range => entry,
            _ => {
                warn!(collection = self.name, code, family, "type code out of range");
                return Err(SerializeError::TypeCode { code, family });
            }
        };

        let mut obj = (entry.factory)().map_err(|err| {
            error!(collection = self.name, code, name = entry.name, error = %err, "cannot build object");
            err
        })?;

        let mut unmarshal = Unmarshal::new(self.context, payload, options);
        if let Err(err) = unmarshal.run(&mut *obj) {
            warn!(collection = self.name, code, name = entry.name, error = %err, "corrupt payload");
            return Err(SerializeError::CorruptPayload {
                code,
                source: Box::new(err),
            });
        }

        if enabled!(Level::TRACE) {
            if let Ok(fields) = to_text(&mut *obj, options::INCLUDE_NAME) {
                trace!(collection = self.name, code, name = entry.name, %fields, "built object");
            }
        }
        Ok(obj)
    }

    /// [`new_object`](Self::new_object) for a concrete type, returning it
    /// downcast.
    pub fn new_typed<T: Record>(
        &self,
        code: TypeCode,
        payload: impl Into<Bytes>,
        options: u32,
    ) -> Result<Box<T>> {
        self.new_object::<T>(code, payload, options)?
            .into_any()
            .downcast::<T>()
            .map_err(|_| SerializeError::TypeCode {
                code,
                family: type_name::<T>(),
            })
    }

    /// Registered types and declared groups.
    pub fn schema(&self) -> CollectionSchema {
        let types = self
            .dispatch
            .iter()
            .map(|(&code, e)| TypeSchema { code, name: e.name })
            .collect();

        let groups = self
            .groups
            .iter()
            .map(|key| {
                let e = self.ranges[key];
                GroupSchema {
                    family: e.family,
                    low: e.range.low,
                    high: e.range.high,
                }
            })
            .collect();

        CollectionSchema {
            collection: self.name,
            types,
            groups,
        }
    }

    /// [`schema`](Self::schema) rendered as JSON.
    pub fn describe(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Visitor;

    trait Shape: Record {}

    #[derive(Debug, Default)]
    struct Square {
        side: u32,
    }

    impl Record for Square {
        fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
            v.process_u32("side", &mut self.side)
        }
    }

    impl Shape for Square {}

    #[derive(Debug, Default)]
    struct Circle {
        radius: u16,
    }

    impl Record for Circle {
        fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
            v.process_u16("radius", &mut self.radius)
        }
    }

    impl Shape for Circle {}

    fn shapes() -> TypeCollection {
        let mut b = TypeCollection::builder("shapes");
        b.register::<Square>(10, "Square")
            .register::<Circle>(11, "Circle")
            .group::<dyn Shape>(10, 11);
        b.build()
    }

    #[test]
    fn test_lookup_metadata() {
        let c = shapes();
        assert_eq!(c.len(), 2);
        assert!(c.contains(10));
        assert!(!c.contains(12));
        assert_eq!(c.type_name(11), Some("Circle"));
        assert_eq!(c.type_name(99), None);
        assert_eq!(c.code_range::<dyn Shape>(), Some(CodeRange::new(10, 11)));
        assert_eq!(c.code_range::<Circle>(), Some(CodeRange::single(11)));
        assert_eq!(c.code_range::<u32>(), None);
    }

    #[test]
    fn test_new_object_through_group() {
        let c = shapes();
        let obj = c
            .new_object::<dyn Shape>(11, vec![0u8, 7], 0)
            .unwrap();
        assert!(obj.is::<Circle>());
        assert_eq!(obj.downcast_ref::<Circle>().unwrap().radius, 7);
    }

    #[test]
    fn test_concrete_range_rejects_sibling_code() {
        let c = shapes();
        let Err(err) = c.new_object::<Square>(11, vec![0u8, 7], 0) else {
            panic!("sibling code accepted");
        };
        assert!(matches!(err, SerializeError::TypeCode { code: 11, .. }));
    }

    #[test]
    fn test_undeclared_family_rejected() {
        let c = shapes();
        let Err(err) = c.new_object::<String>(10, vec![0u8; 4], 0) else {
            panic!("undeclared family accepted");
        };
        assert!(matches!(err, SerializeError::TypeCode { code: 10, .. }));
    }

    #[test]
    fn test_factory_failure_is_memory_error() {
        let mut b = TypeCollection::builder("oom");
        b.register_with::<Square, _>(1, "Square", || {
            Err(SerializeError::OutOfMemory { requested: 4 })
        });
        let c = b.build();

        let err = c.new_typed::<Square>(1, vec![0u8; 4], 0).unwrap_err();
        assert_eq!(err, SerializeError::OutOfMemory { requested: 4 });
    }

    #[test]
    fn test_schema_lists_types_and_groups() {
        let schema = shapes().schema();
        assert_eq!(schema.collection, "shapes");
        assert_eq!(
            schema.types,
            vec![
                TypeSchema {
                    code: 10,
                    name: "Square"
                },
                TypeSchema {
                    code: 11,
                    name: "Circle"
                },
            ]
        );
        assert_eq!(schema.groups.len(), 1);
        assert_eq!((schema.groups[0].low, schema.groups[0].high), (10, 11));
    }

    #[test]
    fn test_describe_is_json() {
        let json: serde_json::Value = serde_json::from_str(&shapes().describe().unwrap()).unwrap();
        assert_eq!(json["collection"], "shapes");
        assert_eq!(json["types"][0]["code"], 10);
        assert_eq!(json["types"][1]["name"], "Circle");
        assert_eq!(json["groups"][0]["high"], 11);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_code_panics() {
        let mut b = TypeCollection::builder("dup");
        b.register::<Square>(1, "Square").register::<Circle>(1, "Circle");
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_type_panics() {
        let mut b = TypeCollection::builder("dup");
        b.register::<Square>(1, "Square").register::<Square>(2, "Square2");
    }

    #[test]
    #[should_panic(expected = "covers 1 registered codes, expected 3")]
    fn test_group_with_gap_panics() {
        let mut b = TypeCollection::builder("gap");
        b.register::<Square>(1, "Square").group::<dyn Shape>(1, 3);
        let _ = b.build();
    }
}
