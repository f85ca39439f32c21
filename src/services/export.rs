//! Output documents for the animation-selection engine.
//!
//! One document per source animation definition in the library. A document
//! holds every compiled block whose variant points at that source, across all
//! rules, categories and stances. Sources nothing points at get the kill
//! switch, so the engine never keeps a stale configuration active.

use crate::metrics::Metrics;
use crate::models::{AnimationLibrary, Capabilities, MovesetModel, STANCE_COUNT, SourceRef};
use crate::services::compiler::ConditionCompiler;
use crate::services::condition::{ConditionNode, is_marked_block};
use serde_json::{Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDocument {
    pub source: SourceRef,
    pub name: String,
    pub priority: i32,
    pub capabilities: Capabilities,
    pub tree: ConditionNode,
}

impl ConditionDocument {
    pub fn is_disabled(&self) -> bool {
        self.tree.is_kill_switch()
    }

    /// Render the document, optionally keeping conditions from an existing one.
    ///
    /// With `preserve` set, every top-level condition of `existing` other than
    /// a previous marked block is kept after the new marked block. An
    /// `existing` document without a `conditions` array is ignored.
    pub fn render(&self, existing: Option<&Value>, preserve: bool) -> Value {
        let mut conditions = vec![self.tree.to_marked_json()];

        if let Some(existing) = existing.filter(|_| preserve) {
            match existing.get("conditions").and_then(Value::as_array) {
                Some(items) => {
                    conditions.extend(items.iter().filter(|c| !is_marked_block(c)).cloned());
                }
                None => {
                    tracing::warn!(
                        "Existing document for {} has no conditions array, not preserving",
                        self.source
                    );
                }
            }
        }

        json!({
            "name": self.name,
            "priority": self.priority,
            "capabilities": {
                "hasIdle": self.capabilities.contains(Capabilities::IDLE),
                "hasPowerAttackA": self.capabilities.contains(Capabilities::POWER_A),
                "hasPowerAttackB": self.capabilities.contains(Capabilities::POWER_B),
                "hasPowerAttackL": self.capabilities.contains(Capabilities::POWER_L),
                "hasPowerAttackR": self.capabilities.contains(Capabilities::POWER_R),
                "hasComboPowerAttack": self.capabilities.contains(Capabilities::COMBO_POWER),
            },
            "conditions": conditions,
        })
    }
}

pub struct DocumentBuilder<'a> {
    model: &'a MovesetModel,
    library: &'a AnimationLibrary,
    metrics: Option<&'a Metrics>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(model: &'a MovesetModel, library: &'a AnimationLibrary) -> Self {
        Self {
            model,
            library,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Compile the whole model into one document per library source, ordered by source
    pub fn build(&self) -> Vec<ConditionDocument> {
        let mut blocks: BTreeMap<SourceRef, Vec<ConditionNode>> = BTreeMap::new();

        for (_, rule) in self.model.all_rules() {
            let compiler = ConditionCompiler::new(&rule.categories);
            let stance_count = if rule.is_player() { STANCE_COUNT } else { 1 };

            for category in rule.categories.values() {
                for stance_index in 0..stance_count {
                    let Some(stance) = category.stance(stance_index) else {
                        continue;
                    };

                    for block in compiler.compile_blocks(Some(rule), category, stance_index, &stance.entries) {
                        if !self.library.contains(block.source) {
                            tracing::warn!(
                                "Rule {} category {} stance {}: variant references missing source {}, skipping",
                                rule.name,
                                category.name,
                                stance_index,
                                block.source
                            );
                            if let Some(metrics) = self.metrics {
                                metrics.record_dangling_variant();
                            }
                            continue;
                        }
                        if let Some(metrics) = self.metrics {
                            metrics.record_block_emitted();
                        }
                        blocks.entry(block.source).or_default().push(block.node);
                    }
                }
            }
        }

        let documents: Vec<_> = self
            .library
            .iter()
            .map(|animation| {
                let tree = match blocks.remove(&animation.source) {
                    Some(nodes) => ConditionNode::Or(nodes),
                    None => ConditionNode::kill_switch(),
                };
                if let Some(metrics) = self.metrics {
                    metrics.record_document_compiled();
                }
                ConditionDocument {
                    source: animation.source,
                    name: animation.name.clone(),
                    priority: animation.priority,
                    capabilities: animation.capabilities,
                    tree,
                }
            })
            .collect();

        tracing::info!(
            "Compiled {} documents ({} disabled)",
            documents.len(),
            documents.iter().filter(|d| d.is_disabled()).count()
        );

        documents
    }
}
