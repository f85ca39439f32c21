use crate::models::actor::ActorStats;
use crate::models::library::SourceRef;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Equipped-type sentinel meaning "any type on this hand"
pub const ANY_EQUIP_TYPE: i32 = -1;

/// Number of stance slots per category (player uses all, NPC rules only slot 0)
pub const STANCE_COUNT: usize = 4;

/// Concrete single-hand weapon codes: sword, dagger, war axe, mace
pub const SINGLE_HAND_WEAPON_TYPES: [i32; 4] = [1, 2, 3, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Right,
    Left,
}

bitflags! {
    /// Directional gates of a child variant.
    ///
    /// Bit `k - 1` corresponds to direction code `k`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Directions: u8 {
        const FRONT = 1 << 0;
        const FRONT_RIGHT = 1 << 1;
        const RIGHT = 1 << 2;
        const BACK_RIGHT = 1 << 3;
        const BACK = 1 << 4;
        const BACK_LEFT = 1 << 5;
        const LEFT = 1 << 6;
        const FRONT_LEFT = 1 << 7;
    }
}

impl Directions {
    /// Flag for a 1-based direction code, `None` outside 1..=8
    pub fn from_code(code: u8) -> Option<Self> {
        if (1..=8).contains(&code) {
            Self::from_bits(1 << (code - 1))
        } else {
            None
        }
    }

    /// Direction codes of the set flags in ascending order
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=8u8).filter(move |code| self.bits() & (1 << (code - 1)) != 0)
    }
}

/// Gating flags that make a variant a child of the preceding parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildGate {
    pub directions: Directions,
    pub random: bool,
    pub movement: bool,
}

impl ChildGate {
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty() && !self.random && !self.movement
    }
}

/// Whether a variant opens a new playlist slot or gates an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "VariantFlags", into = "VariantFlags")]
pub enum VariantRole {
    #[default]
    Parent,
    Child(ChildGate),
}

impl VariantRole {
    /// Parent when no gate flag is set, child otherwise
    pub fn from_gate(gate: ChildGate) -> Self {
        if gate.is_empty() {
            Self::Parent
        } else {
            Self::Child(gate)
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Self::Parent)
    }

    pub fn gate(&self) -> Option<&ChildGate> {
        match self {
            Self::Parent => None,
            Self::Child(gate) => Some(gate),
        }
    }
}

/// Persisted flat-flag form of [`VariantRole`]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct VariantFlags {
    #[serde(default)]
    directions: Directions,
    #[serde(default)]
    random: bool,
    #[serde(default)]
    movement: bool,
}

impl From<VariantFlags> for VariantRole {
    fn from(flags: VariantFlags) -> Self {
        VariantRole::from_gate(ChildGate {
            directions: flags.directions,
            random: flags.random,
            movement: flags.movement,
        })
    }
}

impl From<VariantRole> for VariantFlags {
    fn from(role: VariantRole) -> Self {
        let gate = role.gate().copied().unwrap_or_default();
        Self {
            directions: gate.directions,
            random: gate.random,
            movement: gate.movement,
        }
    }
}

fn default_true() -> bool {
    true
}

/// One animation-set reference inside a configuration entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantInstance {
    pub source: SourceRef,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_true")]
    pub selected: bool,
    #[serde(default)]
    pub role: VariantRole,
}

impl VariantInstance {
    pub fn parent(source: SourceRef) -> Self {
        Self {
            source,
            display_name: String::new(),
            selected: true,
            role: VariantRole::Parent,
        }
    }

    pub fn child(source: SourceRef, gate: ChildGate) -> Self {
        Self {
            role: VariantRole::from_gate(gate),
            ..Self::parent(source)
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn deselected(mut self) -> Self {
        self.selected = false;
        self
    }
}

fn default_ceiling() -> f32 {
    100.0
}

/// Stat gates of a configuration entry (NPC rules only)
///
/// All four must hold at once for the entry to be a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_ceiling")]
    pub health_ceiling: f32,
    #[serde(default = "default_ceiling")]
    pub stamina_ceiling: f32,
    #[serde(default = "default_ceiling")]
    pub magicka_ceiling: f32,
    #[serde(default)]
    pub min_level: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            health_ceiling: 100.0,
            stamina_ceiling: 100.0,
            magicka_ceiling: 100.0,
            min_level: 0,
        }
    }
}

impl Thresholds {
    pub fn admits(&self, stats: &ActorStats) -> bool {
        stats.health_pct <= self.health_ceiling
            && stats.level >= self.min_level
            && stats.stamina_pct <= self.stamina_ceiling
            && stats.magicka_pct <= self.magicka_ceiling
    }

    /// Total headroom between the actor's stats and the gates; smaller is a tighter match
    pub fn slack(&self, stats: &ActorStats) -> f32 {
        (self.health_ceiling - stats.health_pct)
            + (f32::from(stats.level) - f32::from(self.min_level))
            + (self.stamina_ceiling - stats.stamina_pct)
            + (self.magicka_ceiling - stats.magicka_pct)
    }
}

/// A named moveset with its ordered variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
    pub name: String,
    #[serde(default = "default_true")]
    pub selected: bool,
    #[serde(default)]
    pub variants: Vec<VariantInstance>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl ConfigurationEntry {
    pub fn new(name: impl Into<String>, variants: Vec<VariantInstance>) -> Self {
        Self {
            name: name.into(),
            selected: true,
            variants,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn deselected(mut self) -> Self {
        self.selected = false;
        self
    }
}

/// A selected variant with its playlist position resolved
#[derive(Debug, Clone, Copy)]
pub struct OrderedVariant<'a> {
    pub entry_index: usize,
    pub variant_index: usize,
    pub entry: &'a ConfigurationEntry,
    pub variant: &'a VariantInstance,
    /// 1-based parent ordinal; children carry their parent's
    pub ordinal: u32,
}

impl OrderedVariant<'_> {
    pub fn is_parent(&self) -> bool {
        self.variant.role.is_parent()
    }
}

/// Selected variants of selected entries in playlist order.
///
/// Parents are numbered from 1 in first-seen order. Children take the
/// ordinal of the nearest preceding parent; children seen before any
/// parent are dropped.
pub fn order_variants(entries: &[ConfigurationEntry]) -> Vec<OrderedVariant<'_>> {
    let mut ordered = Vec::new();
    let mut current_ordinal = 0u32;

    for (entry_index, entry) in entries.iter().enumerate() {
        if !entry.selected {
            continue;
        }
        for (variant_index, variant) in entry.variants.iter().enumerate() {
            if !variant.selected {
                continue;
            }
            if variant.role.is_parent() {
                current_ordinal += 1;
            } else if current_ordinal == 0 {
                tracing::debug!(
                    "Dropping parentless child variant {} in entry {}",
                    variant.source,
                    entry.name
                );
                continue;
            }
            ordered.push(OrderedVariant {
                entry_index,
                variant_index,
                entry,
                variant,
                ordinal: current_ordinal,
            });
        }
    }

    ordered
}

/// One loadout slot of a category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stance {
    pub entries: Vec<ConfigurationEntry>,
}

impl Stance {
    pub fn new(entries: Vec<ConfigurationEntry>) -> Self {
        Self { entries }
    }

    pub fn selected_entries(&self) -> impl Iterator<Item = &ConfigurationEntry> {
        self.entries.iter().filter(|e| e.selected)
    }

    pub fn selected_entry_count(&self) -> usize {
        self.selected_entries().count()
    }

    /// Selected variants of selected entries in playlist order
    pub fn ordered_variants(&self) -> Vec<OrderedVariant<'_>> {
        order_variants(&self.entries)
    }

    /// Number of parent variants, i.e. the highest ordinal
    pub fn parent_count(&self) -> u32 {
        self.ordered_variants()
            .iter()
            .filter(|v| v.is_parent())
            .count() as u32
    }
}

fn default_any() -> i32 {
    ANY_EQUIP_TYPE
}

/// A weapon/handedness configuration with its stance slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default = "default_any")]
    pub right_type: i32,
    #[serde(default = "default_any")]
    pub left_type: i32,
    /// Persisted for editors only; compilation keys on the two equipped types
    #[serde(default)]
    pub dual_wield: bool,
    #[serde(default)]
    pub shield: bool,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub right_keywords: Vec<String>,
    #[serde(default)]
    pub left_keywords: Vec<String>,
    #[serde(default)]
    pub stances: Vec<Stance>,
}

impl Category {
    pub fn new(name: impl Into<String>, right_type: i32) -> Self {
        Self {
            name: name.into(),
            right_type,
            left_type: ANY_EQUIP_TYPE,
            dual_wield: false,
            shield: false,
            custom: false,
            right_keywords: Vec::new(),
            left_keywords: Vec::new(),
            stances: vec![Stance::default(); STANCE_COUNT],
        }
    }

    pub fn with_left_type(mut self, left_type: i32) -> Self {
        self.left_type = left_type;
        self
    }

    pub fn with_keywords(mut self, hand: Hand, keywords: &[&str]) -> Self {
        let list = keywords.iter().map(|k| k.to_string()).collect();
        match hand {
            Hand::Right => self.right_keywords = list,
            Hand::Left => self.left_keywords = list,
        }
        self
    }

    pub fn dual_wield(mut self) -> Self {
        self.dual_wield = true;
        self
    }

    pub fn shield(mut self) -> Self {
        self.shield = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn equip_type(&self, hand: Hand) -> i32 {
        match hand {
            Hand::Right => self.right_type,
            Hand::Left => self.left_type,
        }
    }

    pub fn keywords(&self, hand: Hand) -> &[String] {
        match hand {
            Hand::Right => &self.right_keywords,
            Hand::Left => &self.left_keywords,
        }
    }

    pub fn stance(&self, index: usize) -> Option<&Stance> {
        self.stances.get(index)
    }

    pub fn stance_mut(&mut self, index: usize) -> Option<&mut Stance> {
        self.stances.get_mut(index)
    }

    /// Pad or truncate the stance list to [`STANCE_COUNT`]
    pub fn normalize_stances(&mut self) {
        self.stances.resize_with(STANCE_COUNT, Stance::default);
    }

    /// Same configuration shape with every stance emptied
    pub fn cleared(&self) -> Self {
        Self {
            stances: vec![Stance::default(); STANCE_COUNT],
            ..self.clone()
        }
    }
}
