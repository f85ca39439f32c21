//! Boolean condition trees exported to the animation-selection engine.

use crate::models::{FormRef, Hand};
use serde_json::{Value, json};

/// Comment marking the block this crate owns inside an exported document
pub const CONDITION_MARKER: &str = "STANCECRAFT_CONDITIONS";

/// Integer graph variables written by the runtime and tested by the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphVariable {
    /// Priority tier of the rule that matched the actor
    PriorityTier,
    /// 1-based player stance, 0 for NPCs
    StanceSelector,
    /// Ordinal of the active parent variant
    PlaylistOrder,
    /// Movement direction code, 0 when idle
    Direction,
    /// NPC random pick
    RandomSelector,
}

impl GraphVariable {
    pub fn name(self) -> &'static str {
        match self {
            GraphVariable::PriorityTier => "StancecraftPriority",
            GraphVariable::StanceSelector => "StancecraftStance",
            GraphVariable::PlaylistOrder => "StancecraftPlaylistOrder",
            GraphVariable::Direction => "StancecraftDirection",
            GraphVariable::RandomSelector => "NPCrandomNumber",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    ActorBase(FormRef),
    FactionMember(FormRef),
    /// Keyword editor ID on the actor
    ActorKeyword(String),
    Race(FormRef),
    EquippedType { hand: Hand, code: i32 },
    EquippedKeyword { hand: Hand, keyword: String },
    GraphInt { variable: GraphVariable, value: i32 },
    Moving,
    /// Never true; deactivates a document
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    pub kind: PredicateKind,
    pub negated: bool,
}

impl Predicate {
    pub fn new(kind: PredicateKind) -> Self {
        Self {
            kind,
            negated: false,
        }
    }

    pub fn negated(kind: PredicateKind) -> Self {
        Self {
            kind,
            negated: true,
        }
    }

    pub fn graph_int(variable: GraphVariable, value: i32) -> Self {
        Self::new(PredicateKind::GraphInt { variable, value })
    }

    fn to_json(&self) -> Value {
        let mut object = match &self.kind {
            PredicateKind::ActorBase(form) => json!({
                "condition": "IsActorBase",
                "Actor base": form_json(form),
            }),
            PredicateKind::FactionMember(form) => json!({
                "condition": "IsInFaction",
                "Faction": form_json(form),
            }),
            PredicateKind::ActorKeyword(keyword) => json!({
                "condition": "HasKeyword",
                "Keyword": { "editorID": keyword },
            }),
            PredicateKind::Race(form) => json!({
                "condition": "IsRace",
                "Race": form_json(form),
            }),
            PredicateKind::EquippedType { hand, code } => json!({
                "condition": "IsEquippedType",
                "Type": { "value": code },
                "Left hand": *hand == Hand::Left,
            }),
            PredicateKind::EquippedKeyword { hand, keyword } => json!({
                "condition": "IsEquippedHasKeyword",
                "Keyword": { "editorID": keyword },
                "Left hand": *hand == Hand::Left,
            }),
            PredicateKind::GraphInt { variable, value } => json!({
                "condition": "CompareValues",
                "Value A": { "graphVariable": variable.name(), "graphVariableType": "Int" },
                "Comparison": "==",
                "Value B": { "value": value },
            }),
            PredicateKind::Moving => json!({ "condition": "IsMoving" }),
            PredicateKind::Disabled => json!({
                "condition": "CompareValues",
                "comment": "Disabled by Stancecraft",
                "Value A": { "value": 0 },
                "Comparison": "==",
                "Value B": { "value": 1 },
            }),
        };

        if let Value::Object(map) = &mut object {
            map.insert("negated".to_string(), Value::Bool(self.negated));
        }
        object
    }
}

fn form_json(form: &FormRef) -> Value {
    json!({
        "pluginName": form.plugin,
        "formID": format!("{:X}", form.local_id),
    })
}

/// Nested AND/OR expression over [`Predicate`] leaves
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionNode {
    And(Vec<ConditionNode>),
    Or(Vec<ConditionNode>),
    Leaf(Predicate),
}

impl ConditionNode {
    pub fn leaf(kind: PredicateKind) -> Self {
        Self::Leaf(Predicate::new(kind))
    }

    pub fn not(kind: PredicateKind) -> Self {
        Self::Leaf(Predicate::negated(kind))
    }

    /// Tree that is never true
    pub fn kill_switch() -> Self {
        Self::leaf(PredicateKind::Disabled)
    }

    pub fn is_kill_switch(&self) -> bool {
        matches!(self, Self::Leaf(p) if p.kind == PredicateKind::Disabled)
    }

    pub fn children(&self) -> &[ConditionNode] {
        match self {
            Self::And(children) | Self::Or(children) => children,
            Self::Leaf(_) => &[],
        }
    }

    /// All leaves in depth-first order
    pub fn leaves(&self) -> Vec<&Predicate> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Self::Leaf(predicate) => out.push(predicate),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::And(children) => json!({
                "condition": "AND",
                "negated": false,
                "Conditions": children.iter().map(Self::to_json).collect::<Vec<_>>(),
            }),
            Self::Or(children) => json!({
                "condition": "OR",
                "negated": false,
                "Conditions": children.iter().map(Self::to_json).collect::<Vec<_>>(),
            }),
            Self::Leaf(predicate) => predicate.to_json(),
        }
    }

    /// Top-level OR tagged with [`CONDITION_MARKER`] so it can be found and replaced later
    pub fn to_marked_json(&self) -> Value {
        let inner = match self {
            Self::Or(children) => children.iter().map(Self::to_json).collect::<Vec<_>>(),
            other => vec![other.to_json()],
        };
        json!({
            "condition": "OR",
            "comment": CONDITION_MARKER,
            "negated": false,
            "Conditions": inner,
        })
    }
}

/// Whether an exported condition object is the block this crate owns
pub fn is_marked_block(value: &Value) -> bool {
    value.get("comment").and_then(Value::as_str) == Some(CONDITION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_json_shape() {
        let node = ConditionNode::not(PredicateKind::ActorBase(FormRef::player_base()));
        let value = node.to_json();
        assert_eq!(value["condition"], "IsActorBase");
        assert_eq!(value["negated"], true);
        assert_eq!(value["Actor base"]["pluginName"], "Skyrim.esm");
        assert_eq!(value["Actor base"]["formID"], "7");
    }

    #[test]
    fn test_graph_int_json() {
        let node = ConditionNode::Leaf(Predicate::graph_int(GraphVariable::PlaylistOrder, 3));
        let value = node.to_json();
        assert_eq!(value["Value A"]["graphVariable"], "StancecraftPlaylistOrder");
        assert_eq!(value["Value B"]["value"], 3);
    }

    #[test]
    fn test_marked_json_unwraps_top_or() {
        let tree = ConditionNode::Or(vec![
            ConditionNode::And(vec![ConditionNode::leaf(PredicateKind::Moving)]),
            ConditionNode::And(vec![]),
        ]);
        let value = tree.to_marked_json();
        assert!(is_marked_block(&value));
        assert_eq!(value["Conditions"].as_array().unwrap().len(), 2);

        let killed = ConditionNode::kill_switch().to_marked_json();
        assert_eq!(killed["Conditions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_leaves_depth_first() {
        let tree = ConditionNode::And(vec![
            ConditionNode::leaf(PredicateKind::Moving),
            ConditionNode::Or(vec![ConditionNode::kill_switch()]),
        ]);
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].kind, PredicateKind::Disabled);
        assert!(tree.children()[1].children()[0].is_kill_switch());
    }
}
