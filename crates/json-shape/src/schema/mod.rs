//! Schema model: the immutable description of a JSON shape.

pub mod builder;
#[allow(clippy::module_inception)]
pub mod schema;

pub use builder::SchemaBuilder;
pub use schema::*;
