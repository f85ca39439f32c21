use crate::models::category::{ANY_EQUIP_TYPE, Category, Hand};
use crate::models::form::ModelError;
use crate::models::rule::{Rule, RuleMatch, RuleRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Equipped-type code of a shield in the left hand
pub const SHIELD_EQUIP_TYPE: i32 = 10;

/// The full stance configuration: category templates plus every rule.
///
/// Every rule owns its own copy of each category, so editing one rule never
/// touches another. `templates` supplies the defaults that [`reconcile`]
/// copies into rules missing a category.
///
/// [`reconcile`]: MovesetModel::reconcile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovesetModel {
    pub templates: IndexMap<String, Category>,
    pub player: Rule,
    pub general: Rule,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Default for MovesetModel {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

impl MovesetModel {
    pub fn new(templates: IndexMap<String, Category>) -> Self {
        let mut model = Self {
            templates,
            player: Rule::new("Player", RuleMatch::Player),
            general: Rule::new("General NPC", RuleMatch::General),
            rules: Vec::new(),
        };
        model.reconcile();
        model
    }

    /// Bring every rule in line with the templates.
    ///
    /// Missing categories are cloned from the template with empty stances and
    /// every category is padded to the full stance count. Returns how many
    /// categories were reconstructed.
    pub fn reconcile(&mut self) -> usize {
        let templates = &self.templates;
        let mut rebuilt = 0;

        for rule in std::iter::once(&mut self.player)
            .chain(std::iter::once(&mut self.general))
            .chain(self.rules.iter_mut())
        {
            for (name, template) in templates {
                if !rule.categories.contains_key(name) {
                    tracing::debug!("Rule {} missing category {}, using defaults", rule.name, name);
                    rule.categories.insert(name.clone(), template.cleared());
                    rebuilt += 1;
                }
            }
            for category in rule.categories.values_mut() {
                category.normalize_stances();
            }
        }

        rebuilt
    }

    pub fn rule(&self, rule: RuleRef) -> Option<&Rule> {
        match rule {
            RuleRef::Player => Some(&self.player),
            RuleRef::General => Some(&self.general),
            RuleRef::Declared(index) => self.rules.get(index),
        }
    }

    pub fn rule_mut(&mut self, rule: RuleRef) -> Option<&mut Rule> {
        match rule {
            RuleRef::Player => Some(&mut self.player),
            RuleRef::General => Some(&mut self.general),
            RuleRef::Declared(index) => self.rules.get_mut(index),
        }
    }

    /// Player, General NPC, then declared rules in declaration order
    pub fn all_rules(&self) -> impl Iterator<Item = (RuleRef, &Rule)> {
        [(RuleRef::Player, &self.player), (RuleRef::General, &self.general)]
            .into_iter()
            .chain(
                self.rules
                    .iter()
                    .enumerate()
                    .map(|(index, rule)| (RuleRef::Declared(index), rule)),
            )
    }

    /// Declare a new rule with fresh copies of every template category
    pub fn add_rule(&mut self, name: impl Into<String>, matcher: RuleMatch) -> Result<RuleRef, ModelError> {
        let name = name.into();

        if matches!(matcher, RuleMatch::Player | RuleMatch::General) {
            return Err(ModelError::DuplicateRule(name));
        }
        if self.rules.iter().any(|r| r.matcher == matcher) {
            return Err(ModelError::DuplicateRule(name));
        }

        let mut rule = Rule::new(name, matcher);
        for (category_name, template) in &self.templates {
            rule.categories.insert(category_name.clone(), template.cleared());
        }

        tracing::info!("Declared {} rule {}", rule.rule_type(), rule.name);
        self.rules.push(rule);
        Ok(RuleRef::Declared(self.rules.len() - 1))
    }

    pub fn remove_rule(&mut self, index: usize) -> Result<Rule, ModelError> {
        if index >= self.rules.len() {
            return Err(ModelError::UnknownRule(index));
        }
        let rule = self.rules.remove(index);
        tracing::info!("Removed {} rule {}", rule.rule_type(), rule.name);
        Ok(rule)
    }

    /// Add a category template and give every rule its own copy
    pub fn add_category(&mut self, category: Category) {
        let name = category.name.clone();
        self.templates.insert(name.clone(), category.cleared());
        for rule in std::iter::once(&mut self.player)
            .chain(std::iter::once(&mut self.general))
            .chain(self.rules.iter_mut())
        {
            rule.categories
                .entry(name.clone())
                .or_insert_with(|| category.cleared());
        }
    }
}

/// Built-in category templates
pub fn default_categories() -> IndexMap<String, Category> {
    let categories = [
        Category::new("Unarmed", 0).with_left_type(0),
        Category::new("Sword", 1),
        Category::new("Dagger", 2),
        Category::new("War Axe", 3),
        Category::new("Mace", 4),
        Category::new("Greatsword", 5),
        Category::new("Battleaxe", 6).with_keywords(Hand::Right, &["WeapTypeBattleaxe"]),
        Category::new("Warhammer", 6).with_keywords(Hand::Right, &["WeapTypeWarhammer"]),
        Category::new("Bow", 7),
        Category::new("Dual Sword", 1).with_left_type(1).dual_wield(),
        Category::new("Dual Dagger", 2).with_left_type(2).dual_wield(),
        Category::new("One-Handed and Shield", ANY_EQUIP_TYPE)
            .with_left_type(SHIELD_EQUIP_TYPE)
            .shield(),
    ];

    categories
        .into_iter()
        .map(|category| (category.name.clone(), category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::{ConfigurationEntry, STANCE_COUNT, Stance, VariantInstance};
    use crate::models::form::FormRef;
    use crate::models::library::SourceRef;

    #[test]
    fn test_default_model_has_all_categories() {
        let model = MovesetModel::default();
        for (_, rule) in model.all_rules() {
            assert_eq!(rule.categories.len(), model.templates.len());
        }
        assert!(model.player.category("Sword").is_some());
    }

    #[test]
    fn test_add_rule_copies_are_independent() {
        let mut model = MovesetModel::default();
        let bandits = model
            .add_rule("Bandits", RuleMatch::Faction(FormRef::new("Skyrim.esm", 0x1BCC0)))
            .unwrap();

        let stance = model
            .rule_mut(bandits)
            .and_then(|r| r.category_mut("Sword"))
            .and_then(|c| c.stance_mut(0))
            .unwrap();
        stance.entries.push(ConfigurationEntry::new(
            "Heavy",
            vec![VariantInstance::parent(SourceRef::new(0, 0))],
        ));

        assert_eq!(model.general.category("Sword").unwrap().stances[0], Stance::default());
        assert!(model.templates["Sword"].stances[0].entries.is_empty());
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut model = MovesetModel::default();
        let matcher = RuleMatch::Keyword("ActorTypeNPC".into());
        model.add_rule("NPCs", matcher.clone()).unwrap();
        assert_eq!(
            model.add_rule("NPCs again", matcher),
            Err(ModelError::DuplicateRule("NPCs again".into()))
        );
        assert!(model.add_rule("Player", RuleMatch::Player).is_err());
    }

    #[test]
    fn test_remove_rule() {
        let mut model = MovesetModel::default();
        model.add_rule("Nords", RuleMatch::Race(FormRef::new("Skyrim.esm", 0x13746))).unwrap();
        assert!(model.remove_rule(3).is_err());
        assert_eq!(model.remove_rule(0).unwrap().name, "Nords");
        assert!(model.rules.is_empty());
    }

    #[test]
    fn test_reconcile_rebuilds_missing_categories() {
        let mut model = MovesetModel::default();
        model.general.categories.shift_remove("Dagger");
        model.general.categories["Sword"].stances.clear();

        let rebuilt = model.reconcile();
        assert_eq!(rebuilt, 1);
        assert!(model.general.category("Dagger").is_some());
        assert_eq!(model.general.categories["Sword"].stances.len(), STANCE_COUNT);
    }

    #[test]
    fn test_add_category_reaches_every_rule() {
        let mut model = MovesetModel::default();
        model.add_rule("Nords", RuleMatch::Race(FormRef::new("Skyrim.esm", 0x13746))).unwrap();
        model.add_category(Category::new("Katana", 1).with_keywords(Hand::Right, &["WeapTypeKatana"]).custom());

        for (_, rule) in model.all_rules() {
            assert!(rule.category("Katana").unwrap().custom);
        }
    }
}
