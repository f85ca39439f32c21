//! Cross-category exclusions.
//!
//! Two categories can share an equipped-type code and differ only by weapon
//! keyword (Battleaxe and Warhammer both use type 6). Without exclusions the
//! plain category would also claim the keyworded weapons, so every compiled
//! block rules out the keywords owned by its competitors.

use crate::models::{Category, Hand};
use crate::services::condition::{Predicate, PredicateKind};
use indexmap::IndexMap;

pub struct ExclusionPolicy<'a> {
    categories: &'a IndexMap<String, Category>,
}

impl<'a> ExclusionPolicy<'a> {
    pub fn new(categories: &'a IndexMap<String, Category>) -> Self {
        Self { categories }
    }

    /// Categories sorted by name
    fn sorted(&self) -> Vec<&'a Category> {
        let mut sorted: Vec<_> = self.categories.values().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted
    }

    /// Negated has-keyword predicates for every keyword declared on `hand` by
    /// another category with the same equipped type on that hand.
    ///
    /// Keywords `category` declares itself are never excluded.
    pub fn competing_keyword_exclusions(&self, category: &Category, hand: Hand) -> Vec<Predicate> {
        let own_type = category.equip_type(hand);
        let own_keywords = category.keywords(hand);
        let mut seen: Vec<&str> = Vec::new();
        let mut exclusions = Vec::new();

        for other in self.sorted() {
            if other.name == category.name
                || other.equip_type(hand) != own_type
                || other.keywords(hand).is_empty()
            {
                continue;
            }

            for keyword in other.keywords(hand) {
                let claimed_by_self = own_keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword));
                let already_listed = seen.iter().any(|k| k.eq_ignore_ascii_case(keyword));
                if claimed_by_self || already_listed {
                    continue;
                }
                seen.push(keyword);
                exclusions.push(Predicate::negated(PredicateKind::EquippedKeyword {
                    hand,
                    keyword: keyword.clone(),
                }));
            }
        }

        exclusions
    }

    /// Negated right-hand has-keyword predicates for every custom shield
    /// category that declares right-hand keywords, other than `category`.
    pub fn shield_category_exclusions(&self, category: &Category) -> Vec<Predicate> {
        let mut exclusions: Vec<Predicate> = Vec::new();

        for other in self.sorted() {
            if other.name == category.name
                || !other.custom
                || !other.shield
                || other.right_keywords.is_empty()
            {
                continue;
            }

            for keyword in &other.right_keywords {
                let predicate = Predicate::negated(PredicateKind::EquippedKeyword {
                    hand: Hand::Right,
                    keyword: keyword.clone(),
                });
                if !exclusions.contains(&predicate) {
                    exclusions.push(predicate);
                }
            }
        }

        exclusions
    }
}
