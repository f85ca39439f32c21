//! Data models for Stancecraft.
//!
//! This module contains the stance configuration the rest of the crate works on:
//! - [`Category`]: a weapon/handedness configuration with four [`Stance`] slots
//! - [`ConfigurationEntry`] / [`VariantInstance`]: movesets and their parent/child variants
//! - [`Rule`]: an actor-matching rule owning its own copy of every category
//! - [`MovesetModel`]: the top-level container (templates, Player, General NPC, declared rules)
//! - [`AnimationLibrary`]: source animation definitions addressed by [`SourceRef`]
//! - [`ActorSnapshot`]: host-supplied actor identity and live stats
//! - [`UserConfig`]: user settings loaded from `Stancecraft Settings.yaml`

pub mod actor;
pub mod category;
pub mod config;
pub mod form;
pub mod library;
pub mod model;
pub mod rule;

pub use actor::{ActorSnapshot, ActorStats};
pub use category::{
    ANY_EQUIP_TYPE, Category, ChildGate, ConfigurationEntry, Directions, Hand, OrderedVariant,
    SINGLE_HAND_WEAPON_TYPES, STANCE_COUNT, Stance, Thresholds, VariantInstance, VariantRole,
    order_variants,
};
pub use config::{CycleMode, Settings, UserConfig};
pub use form::{FormRef, ModelError};
pub use library::{AnimationLibrary, Capabilities, SourceAnimation, SourceRef};
pub use model::{MovesetModel, SHIELD_EQUIP_TYPE, default_categories};
pub use rule::{Rule, RuleMatch, RuleRef, RuleType};
