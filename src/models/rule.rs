use crate::models::actor::ActorSnapshot;
use crate::models::category::Category;
use crate::models::form::FormRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of actor-matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    Player,
    GeneralNpc,
    UniqueNpc,
    Faction,
    Keyword,
    Race,
}

impl RuleType {
    /// Tiers consulted by the resolver, highest priority first
    pub const TIERED: [RuleType; 4] = [
        RuleType::UniqueNpc,
        RuleType::Keyword,
        RuleType::Faction,
        RuleType::Race,
    ];

    /// Value written to the runtime priority tag
    pub fn priority(self) -> i32 {
        match self {
            RuleType::UniqueNpc => 4,
            RuleType::Keyword => 3,
            RuleType::Faction => 2,
            RuleType::Race => 1,
            RuleType::GeneralNpc | RuleType::Player => 0,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleType::Player => "Player",
            RuleType::GeneralNpc => "General NPC",
            RuleType::UniqueNpc => "Unique NPC",
            RuleType::Faction => "Faction",
            RuleType::Keyword => "Keyword",
            RuleType::Race => "Race",
        };
        f.write_str(name)
    }
}

/// Identity a rule matches actors against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "target")]
pub enum RuleMatch {
    Player,
    General,
    UniqueNpc(FormRef),
    Faction(FormRef),
    /// Keyword editor ID
    Keyword(String),
    Race(FormRef),
}

impl RuleMatch {
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleMatch::Player => RuleType::Player,
            RuleMatch::General => RuleType::GeneralNpc,
            RuleMatch::UniqueNpc(_) => RuleType::UniqueNpc,
            RuleMatch::Faction(_) => RuleType::Faction,
            RuleMatch::Keyword(_) => RuleType::Keyword,
            RuleMatch::Race(_) => RuleType::Race,
        }
    }

    pub fn matches(&self, actor: &ActorSnapshot) -> bool {
        match self {
            RuleMatch::Player => actor.is_player(),
            RuleMatch::General => !actor.is_player(),
            RuleMatch::UniqueNpc(base) => actor.base == *base,
            RuleMatch::Faction(faction) => actor.in_faction(faction),
            RuleMatch::Keyword(keyword) => actor.has_keyword(keyword),
            RuleMatch::Race(race) => actor.race == *race,
        }
    }
}

/// An actor-matching rule with its own category configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub matcher: RuleMatch,
    #[serde(default)]
    pub categories: IndexMap<String, Category>,
}

impl Rule {
    pub fn new(name: impl Into<String>, matcher: RuleMatch) -> Self {
        Self {
            name: name.into(),
            matcher,
            categories: IndexMap::new(),
        }
    }

    pub fn rule_type(&self) -> RuleType {
        self.matcher.rule_type()
    }

    pub fn is_player(&self) -> bool {
        self.rule_type() == RuleType::Player
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.get_mut(name)
    }
}

/// Handle to a rule owned by [`crate::models::MovesetModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleRef {
    Player,
    General,
    /// Index into the declared rule list
    Declared(usize),
}
