//! Mapping record model.
//!
//! References, the mapping record with its identity key, and mapping sets.

mod mapping;
mod mapping_set;
mod reference;

pub use mapping::{Confidence, IdentityKey, PredicateModifier, SemanticMapping};
pub(crate) use mapping_set::TextLayout;
pub use mapping_set::{MappingSet, MappingSetMetadata, MetadataHeader};
pub use reference::{NamedReference, Reference};
