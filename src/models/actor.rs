use crate::models::form::FormRef;
use serde::{Deserialize, Serialize};

/// Live stats of an actor, percentages in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorStats {
    pub health_pct: f32,
    pub stamina_pct: f32,
    pub magicka_pct: f32,
    pub level: u16,
}

impl ActorStats {
    pub fn new(health_pct: f32, stamina_pct: f32, magicka_pct: f32, level: u16) -> Self {
        Self {
            health_pct,
            stamina_pct,
            magicka_pct,
            level,
        }
    }
}

impl Default for ActorStats {
    fn default() -> Self {
        Self::new(100.0, 100.0, 100.0, 1)
    }
}

/// Host-supplied view of an actor at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub base: FormRef,
    pub race: FormRef,
    #[serde(default)]
    pub factions: Vec<FormRef>,
    /// Keyword editor IDs
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub stats: ActorStats,
}

impl ActorSnapshot {
    pub fn new(base: FormRef, race: FormRef) -> Self {
        Self {
            base,
            race,
            factions: Vec::new(),
            keywords: Vec::new(),
            stats: ActorStats::default(),
        }
    }

    pub fn with_faction(mut self, faction: FormRef) -> Self {
        self.factions.push(faction);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn with_stats(mut self, stats: ActorStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn is_player(&self) -> bool {
        self.base.is_player_base()
    }

    pub fn in_faction(&self, faction: &FormRef) -> bool {
        self.factions.contains(faction)
    }

    /// Editor IDs compare case-insensitively
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }
}
