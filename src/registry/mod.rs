//! Registry module - polymorphic reconstruction from a type code.
//!
//! Provides:
//! - [`TypeCollection`] - read-only map from type code to factory, plus the
//!   range table used to validate a code against a family
//! - [`TypeCollectionBuilder`] - one-time registration pass
//!
//! Each concrete type registered under code `n` owns the range `[n, n]`.
//! An abstract family (usually a trait object type such as `dyn Message`)
//! is declared with [`TypeCollectionBuilder::group`] and owns a contiguous
//! range that must be exactly covered by registered codes.

mod collection;

pub use collection::{
    CodeRange, CollectionSchema, Factory, GroupSchema, TypeCode, TypeCollection,
    TypeCollectionBuilder, TypeSchema,
};
