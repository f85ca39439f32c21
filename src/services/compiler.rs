//! Condition-tree compiler.
//!
//! Turns one (rule, category, stance) slice of the data model into a boolean
//! tree with exactly one AND-block per selected variant. The blocks are built
//! so that for any runtime state at most one of them holds:
//!
//! - rule identity and the priority tag separate competing rules
//! - equipped type, keywords and exclusions separate competing categories
//! - the stance selector separates stances
//! - the playlist ordinal separates parents
//! - direction codes separate a parent from its directional children
//!
//! Compilation is pure and deterministic: the same input always yields an
//! identical tree.

use crate::models::{
    ANY_EQUIP_TYPE, Category, ConfigurationEntry, FormRef, Hand, OrderedVariant, Rule, RuleMatch,
    RuleType, SINGLE_HAND_WEAPON_TYPES, SourceRef, order_variants,
};
use crate::services::condition::{ConditionNode, GraphVariable, Predicate, PredicateKind};
use crate::services::exclusion::ExclusionPolicy;
use indexmap::IndexMap;

/// One compiled AND-block and the variant it activates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBlock {
    pub entry_index: usize,
    pub variant_index: usize,
    pub source: SourceRef,
    pub ordinal: u32,
    pub is_parent: bool,
    pub node: ConditionNode,
}

pub struct ConditionCompiler<'a> {
    exclusions: ExclusionPolicy<'a>,
}

impl<'a> ConditionCompiler<'a> {
    /// `categories` is the category set competing for equipped state,
    /// normally the compiled rule's own category map.
    pub fn new(categories: &'a IndexMap<String, Category>) -> Self {
        Self {
            exclusions: ExclusionPolicy::new(categories),
        }
    }

    /// Compile a stance into an OR over its variant blocks.
    ///
    /// A stance with nothing selected compiles to the kill switch.
    pub fn compile(
        &self,
        rule: Option<&Rule>,
        category: &Category,
        stance_index: usize,
        entries: &[ConfigurationEntry],
    ) -> ConditionNode {
        let blocks = self.compile_blocks(rule, category, stance_index, entries);
        if blocks.is_empty() {
            return ConditionNode::kill_switch();
        }
        ConditionNode::Or(blocks.into_iter().map(|block| block.node).collect())
    }

    /// Compile every selected variant into its own AND-block, in playlist order
    pub fn compile_blocks(
        &self,
        rule: Option<&Rule>,
        category: &Category,
        stance_index: usize,
        entries: &[ConfigurationEntry],
    ) -> Vec<CompiledBlock> {
        let ordered = order_variants(entries);
        let shared = self.shared_prefix(rule, category, stance_index);

        ordered
            .iter()
            .enumerate()
            .map(|(position, variant)| {
                let mut conditions = shared.clone();
                conditions.push(ConditionNode::Leaf(Predicate::graph_int(
                    GraphVariable::PlaylistOrder,
                    variant.ordinal as i32,
                )));
                if let Some(gate) = gate_block(&ordered, position) {
                    conditions.extend(gate);
                }

                CompiledBlock {
                    entry_index: variant.entry_index,
                    variant_index: variant.variant_index,
                    source: variant.variant.source,
                    ordinal: variant.ordinal,
                    is_parent: variant.is_parent(),
                    node: ConditionNode::And(conditions),
                }
            })
            .collect()
    }

    /// Conditions shared by every block of the stance, steps (a) through (g)
    fn shared_prefix(&self, rule: Option<&Rule>, category: &Category, stance_index: usize) -> Vec<ConditionNode> {
        let mut conditions = Vec::new();

        if let Some(identity) = rule.map(|r| identity_predicate(&r.matcher)) {
            conditions.push(identity);
        }

        let rule_type = rule.map(Rule::rule_type).unwrap_or(RuleType::Player);
        conditions.push(ConditionNode::Leaf(Predicate::graph_int(
            GraphVariable::PriorityTier,
            rule_type.priority(),
        )));

        if category.right_type == ANY_EQUIP_TYPE {
            conditions.push(ConditionNode::Or(
                SINGLE_HAND_WEAPON_TYPES
                    .iter()
                    .map(|&code| ConditionNode::leaf(PredicateKind::EquippedType { hand: Hand::Right, code }))
                    .collect(),
            ));
            if let Some(block) = exclusion_block(self.exclusions.shield_category_exclusions(category)) {
                conditions.push(block);
            }
        } else {
            conditions.push(ConditionNode::leaf(PredicateKind::EquippedType {
                hand: Hand::Right,
                code: category.right_type,
            }));
        }

        conditions.extend(keyword_block(category, Hand::Right));
        if let Some(block) = exclusion_block(self.exclusions.competing_keyword_exclusions(category, Hand::Right)) {
            conditions.push(block);
        }

        if !category.left_keywords.is_empty() {
            conditions.extend(keyword_block(category, Hand::Left));
            if let Some(block) = exclusion_block(self.exclusions.competing_keyword_exclusions(category, Hand::Left)) {
                conditions.push(block);
            }
        }

        if category.left_type != ANY_EQUIP_TYPE {
            conditions.push(ConditionNode::leaf(PredicateKind::EquippedType {
                hand: Hand::Left,
                code: category.left_type,
            }));
        }

        let player_stances = rule.is_none_or(Rule::is_player);
        let stance_value = if player_stances { stance_index as i32 + 1 } else { 0 };
        conditions.push(ConditionNode::Leaf(Predicate::graph_int(
            GraphVariable::StanceSelector,
            stance_value,
        )));

        conditions
    }
}

fn identity_predicate(matcher: &RuleMatch) -> ConditionNode {
    match matcher {
        RuleMatch::Player => ConditionNode::leaf(PredicateKind::ActorBase(FormRef::player_base())),
        RuleMatch::General => ConditionNode::not(PredicateKind::ActorBase(FormRef::player_base())),
        RuleMatch::UniqueNpc(base) => ConditionNode::leaf(PredicateKind::ActorBase(base.clone())),
        RuleMatch::Faction(faction) => ConditionNode::leaf(PredicateKind::FactionMember(faction.clone())),
        RuleMatch::Keyword(keyword) => ConditionNode::leaf(PredicateKind::ActorKeyword(keyword.clone())),
        RuleMatch::Race(race) => ConditionNode::leaf(PredicateKind::Race(race.clone())),
    }
}

/// Has-keyword block for one hand: nothing, a bare leaf, or an OR
fn keyword_block(category: &Category, hand: Hand) -> Option<ConditionNode> {
    let mut leaves: Vec<_> = category
        .keywords(hand)
        .iter()
        .map(|keyword| {
            ConditionNode::leaf(PredicateKind::EquippedKeyword {
                hand,
                keyword: keyword.clone(),
            })
        })
        .collect();

    match leaves.len() {
        0 => None,
        1 => leaves.pop(),
        _ => Some(ConditionNode::Or(leaves)),
    }
}

fn exclusion_block(exclusions: Vec<Predicate>) -> Option<ConditionNode> {
    if exclusions.is_empty() {
        None
    } else {
        Some(ConditionNode::And(
            exclusions.into_iter().map(ConditionNode::Leaf).collect(),
        ))
    }
}

/// Step (i): what separates a parent from its children
fn gate_block(ordered: &[OrderedVariant<'_>], position: usize) -> Option<Vec<ConditionNode>> {
    let variant = &ordered[position];

    match variant.variant.role.gate() {
        None => {
            let children = ordered[position + 1..]
                .iter()
                .take_while(|v| !v.is_parent())
                .filter_map(|v| v.variant.role.gate());

            let mut codes: Vec<u8> = Vec::new();
            let mut any_movement = false;
            let mut any_random = false;
            for gate in children {
                codes.extend(gate.directions.codes());
                any_movement |= gate.movement;
                any_random |= gate.random;
            }
            codes.sort_unstable();
            codes.dedup();

            let mut negations: Vec<_> = codes
                .into_iter()
                .map(|code| {
                    ConditionNode::not(PredicateKind::GraphInt {
                        variable: GraphVariable::Direction,
                        value: i32::from(code),
                    })
                })
                .collect();
            if any_movement {
                negations.push(ConditionNode::not(PredicateKind::Moving));
            }
            if any_random {
                negations.push(ConditionNode::not(PredicateKind::GraphInt {
                    variable: GraphVariable::RandomSelector,
                    value: variant.ordinal as i32,
                }));
            }

            if negations.is_empty() {
                None
            } else {
                Some(vec![ConditionNode::And(negations)])
            }
        }
        Some(gate) => {
            let mut conditions = Vec::new();

            let directions: Vec<_> = gate
                .directions
                .codes()
                .map(|code| ConditionNode::Leaf(Predicate::graph_int(GraphVariable::Direction, i32::from(code))))
                .collect();
            if !directions.is_empty() {
                conditions.push(ConditionNode::Or(directions));
            }
            if gate.movement {
                conditions.push(ConditionNode::leaf(PredicateKind::Moving));
            }
            if gate.random {
                conditions.push(ConditionNode::Leaf(Predicate::graph_int(
                    GraphVariable::RandomSelector,
                    variant.ordinal as i32,
                )));
            }

            Some(conditions)
        }
    }
}
