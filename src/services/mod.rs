//! Services module - the compile and selection core.
//!
//! Everything here is pure: no file I/O, no locking, no host calls. The
//! [`state`](crate::state) layer owns the data and calls into these.
//!
//! # Components
//!
//! - [`ConditionCompiler`]: turns a (rule, category, stance) slice into a
//!   [`ConditionNode`] tree with one AND-block per selected variant
//! - [`ExclusionPolicy`]: keyword exclusions between categories that share an
//!   equipped-type code
//! - [`RuleResolver`]: picks the rule driving an NPC (Unique NPC > Keyword >
//!   Faction > Race > General NPC, first match wins)
//! - [`selector`]: stat-gated candidate ranking and the sequential /
//!   directional / weighted no-repeat cycling contracts
//! - [`DocumentBuilder`]: groups compiled blocks into one
//!   [`ConditionDocument`] per source animation
//!
//! # Failure Semantics
//!
//! None of these return errors. Misses degrade to sentinels: the kill-switch
//! tree, a zero-count General NPC resolution, ordinal `0`, or
//! [`NOT_FOUND_NAME`].

pub mod compiler;
pub mod condition;
pub mod exclusion;
pub mod export;
pub mod resolver;
pub mod selector;

pub use compiler::{CompiledBlock, ConditionCompiler};
pub use condition::{CONDITION_MARKER, ConditionNode, GraphVariable, Predicate, PredicateKind};
pub use exclusion::ExclusionPolicy;
pub use export::{ConditionDocument, DocumentBuilder};
pub use resolver::{Resolution, RuleResolver};
pub use selector::{
    NOT_FOUND_NAME, RecentPicks, StanceCycler, VariantCycler, available_indices, next_sequential,
    next_weighted_no_repeat, prev_sequential, variant_name,
};
