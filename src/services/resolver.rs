use crate::models::{ActorSnapshot, MovesetModel, Rule, RuleRef, RuleType};

/// Outcome of rule resolution for one actor and category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub rule: RuleRef,
    /// Selected configuration entries at stance 0
    pub available: usize,
    /// Priority tag of the matched rule type
    pub tier: i32,
}

impl Resolution {
    fn general(available: usize) -> Self {
        Self {
            rule: RuleRef::General,
            available,
            tier: RuleType::GeneralNpc.priority(),
        }
    }
}

/// Picks the rule that drives an NPC's category.
///
/// Tiers are scanned Unique NPC, Keyword, Faction, Race; within a tier rules
/// are scanned in declaration order. The first matching rule whose category
/// has a selected entry at stance 0 wins. Everything else falls back to
/// General NPC.
pub struct RuleResolver<'a> {
    model: &'a MovesetModel,
}

impl<'a> RuleResolver<'a> {
    pub fn new(model: &'a MovesetModel) -> Self {
        Self { model }
    }

    pub fn resolve(&self, actor: Option<&ActorSnapshot>, category: &str) -> Resolution {
        let Some(actor) = actor else {
            return Resolution::general(0);
        };

        for tier in RuleType::TIERED {
            let candidates = self
                .model
                .rules
                .iter()
                .enumerate()
                .filter(|(_, rule)| rule.rule_type() == tier);

            for (index, rule) in candidates {
                if !rule.matcher.matches(actor) {
                    continue;
                }
                let available = available_entries(rule, category);
                if available > 0 {
                    tracing::trace!(
                        "Actor {} matched {} rule {} for {}",
                        actor.base,
                        tier,
                        rule.name,
                        category
                    );
                    return Resolution {
                        rule: RuleRef::Declared(index),
                        available,
                        tier: tier.priority(),
                    };
                }
            }
        }

        Resolution::general(available_entries(&self.model.general, category))
    }
}

fn available_entries(rule: &Rule, category: &str) -> usize {
    rule.category(category)
        .and_then(|c| c.stance(0))
        .map(|s| s.selected_entry_count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigurationEntry, FormRef, RuleMatch, SourceRef, VariantInstance};

    fn nord() -> FormRef {
        FormRef::new("Skyrim.esm", 0x13746)
    }

    fn actor() -> ActorSnapshot {
        ActorSnapshot::new(FormRef::new("Skyrim.esm", 0x1A694), nord()).with_keyword("ActorTypeNPC")
    }

    fn populate(model: &mut MovesetModel, rule: RuleRef, category: &str, entries: usize) {
        let stance = model
            .rule_mut(rule)
            .and_then(|r| r.category_mut(category))
            .and_then(|c| c.stance_mut(0))
            .unwrap();
        for i in 0..entries {
            stance.entries.push(ConfigurationEntry::new(
                format!("Moveset {}", i),
                vec![VariantInstance::parent(SourceRef::new(0, i as u32))],
            ));
        }
    }

    #[test]
    fn test_no_actor_is_general_zero() {
        let model = MovesetModel::default();
        let resolution = RuleResolver::new(&model).resolve(None, "Sword");
        assert_eq!(resolution, Resolution::general(0));
    }

    #[test]
    fn test_tier_beats_declaration_order() {
        let mut model = MovesetModel::default();
        let race = model.add_rule("Nords", RuleMatch::Race(nord())).unwrap();
        let keyword = model.add_rule("NPCs", RuleMatch::Keyword("ActorTypeNPC".into())).unwrap();
        populate(&mut model, race, "Sword", 1);
        populate(&mut model, keyword, "Sword", 2);

        let resolution = RuleResolver::new(&model).resolve(Some(&actor()), "Sword");
        assert_eq!(resolution.rule, keyword);
        assert_eq!(resolution.available, 2);
        assert_eq!(resolution.tier, 3);
    }

    #[test]
    fn test_empty_match_falls_through() {
        let mut model = MovesetModel::default();
        let keyword = model.add_rule("NPCs", RuleMatch::Keyword("ActorTypeNPC".into())).unwrap();
        let race = model.add_rule("Nords", RuleMatch::Race(nord())).unwrap();
        populate(&mut model, keyword, "Dagger", 1);
        populate(&mut model, race, "Sword", 1);

        let resolution = RuleResolver::new(&model).resolve(Some(&actor()), "Sword");
        assert_eq!(resolution.rule, race);
        assert_eq!(resolution.tier, 1);
    }

    #[test]
    fn test_first_declared_wins_within_tier() {
        let mut model = MovesetModel::default();
        let first = model.add_rule("NPCs", RuleMatch::Keyword("ActorTypeNPC".into())).unwrap();
        let second = model.add_rule("Nords kw", RuleMatch::Keyword("actortypenpc_alt".into())).unwrap();
        populate(&mut model, first, "Sword", 1);
        populate(&mut model, second, "Sword", 3);

        let actor = actor().with_keyword("ActorTypeNPC_Alt");
        let resolution = RuleResolver::new(&model).resolve(Some(&actor), "Sword");
        assert_eq!(resolution.rule, first);
        assert_eq!(resolution.available, 1);
    }

    #[test]
    fn test_general_fallback_counts() {
        let mut model = MovesetModel::default();
        populate(&mut model, RuleRef::General, "Sword", 2);
        model.general.categories["Sword"].stances[0].entries[1].selected = false;

        let resolver = RuleResolver::new(&model);
        assert_eq!(resolver.resolve(Some(&actor()), "Sword"), Resolution::general(1));
        assert_eq!(resolver.resolve(Some(&actor()), "Nonexistent"), Resolution::general(0));
    }
}
