use crate::models::{MovesetModel, RuleRef, STANCE_COUNT};
use std::collections::HashMap;

/// Parent-variant counts per (rule, category, stance).
///
/// Owned by [`MovesetManager`](crate::state::MovesetManager). Any model edit
/// invalidates it; it is rebuilt on compile or on the first lookup after an
/// edit.
#[derive(Debug, Default)]
pub struct MaxVariantCache {
    counts: HashMap<(RuleRef, String, usize), u32>,
    valid: bool,
}

impl MaxVariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn rebuild(&mut self, model: &MovesetModel) {
        self.counts.clear();

        for (rule_ref, rule) in model.all_rules() {
            for (name, category) in &rule.categories {
                for (stance_index, stance) in category.stances.iter().enumerate().take(STANCE_COUNT) {
                    let count = stance.parent_count();
                    if count > 0 {
                        self.counts.insert((rule_ref, name.clone(), stance_index), count);
                    }
                }
            }
        }

        self.valid = true;
        tracing::debug!("Rebuilt max variant cache with {} populated stances", self.counts.len());
    }

    /// `None` while invalid, otherwise the count (0 for unknown or empty stances)
    pub fn get(&self, rule: RuleRef, category: &str, stance: usize) -> Option<u32> {
        if !self.valid {
            return None;
        }
        Some(
            self.counts
                .get(&(rule, category.to_string(), stance))
                .copied()
                .unwrap_or(0),
        )
    }
}
