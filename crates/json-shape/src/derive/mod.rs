//! Schema derivation from type descriptions.
//!
//! Extracting a description from real Rust types is left to the caller (a
//! build script, a registry filled at startup, ...). The [`Deriver`] turns
//! those descriptions into immutable [`Schema`](crate::Schema) graphs,
//! memoized by type identity.

pub mod deriver;
mod inhabited;
pub mod type_desc;

pub use deriver::Deriver;
pub use type_desc::{ConstructorDesc, FieldDesc, TypeCatalog, TypeDesc};
