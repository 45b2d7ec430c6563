//! Declarative field mapping: turns heterogeneous raw samples into a
//! flat canonical report record.

pub mod engine;
pub mod spec;

pub use engine::{transform, FlatRecord};
pub use spec::{GroupKind, MappingGroup, MappingRule, MappingSpec, RuleKind};
