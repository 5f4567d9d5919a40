//! Attribute model, merging and presentation

pub mod merge;
pub mod presentation;
pub mod types;

pub use merge::{combine_sources, merge, MergingStrategy};
pub use presentation::{ResolvedAttribute, ResolvedAttributes};
pub use types::{
    attribute_map, from_json, string_values, AttributeMap, AttributeValue,
    Principal, ServiceContext,
};
