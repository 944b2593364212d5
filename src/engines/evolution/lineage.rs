//! Persisted history of one evolution run.
//!
//! ```text
//! EVOLUTION { id, currentGroupId, nextVariantId }
//! GROUP { id, seedName, referenceName
//!     VARIANT { id, name
//!         MUTATION { partId, moduleId, paramName, referenceValue, value } } }
//! RESULT { groupId, outcome, maxScore, referenceScore, nextSeed, completedAt, anomaly
//!     SCORE { name, value } }
//! ```
//!
//! The whole record is rewritten atomically on every change, so a reader
//! never observes a partially written `GROUP`.

use crate::document::{format_float, ConfigTree, NodeId};
use crate::error::{EvolutionError, Result};
use crate::types::{GenerationOutcome, MutatedPart, Variant, VariantGroup};
use serde::Serialize;
use std::path::Path;

const EVOLUTION: &str = "EVOLUTION";
const GROUP: &str = "GROUP";
const VARIANT: &str = "VARIANT";
const MUTATION: &str = "MUTATION";
const RESULT: &str = "RESULT";
const SCORE: &str = "SCORE";

/// What one generation produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub group_id: u32,
    pub outcome: GenerationOutcome,
    pub max_score: Option<f64>,
    pub reference_score: Option<f64>,
    pub next_seed: String,
    pub completed_at: String,
    pub anomaly: Option<String>,
    pub scores: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageRecord {
    pub evolution_id: String,
    pub current_group_id: u32,
    pub next_variant_id: u32,
    pub groups: Vec<VariantGroup>,
    pub results: Vec<GenerationResult>,
}

impl LineageRecord {
    pub fn new(evolution_id: impl Into<String>) -> Self {
        Self {
            evolution_id: evolution_id.into(),
            current_group_id: 1,
            next_variant_id: 1,
            groups: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_tree(&ConfigTree::load(path)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_tree().save(path)
    }

    pub fn to_tree(&self) -> ConfigTree {
        to_tree(
            &self.evolution_id,
            self.current_group_id,
            self.next_variant_id,
            &self.groups,
            &self.results,
        )
    }

    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        let root = tree.root();
        let evolution = tree
            .children_of_kind(root, EVOLUTION)
            .next()
            .ok_or_else(|| EvolutionError::Lineage("missing EVOLUTION section".to_string()))?;

        let mut record = LineageRecord {
            evolution_id: required(tree, evolution, "id")?.to_string(),
            current_group_id: parse_field(tree, evolution, "currentGroupId")?,
            next_variant_id: parse_field(tree, evolution, "nextVariantId")?,
            groups: Vec::new(),
            results: Vec::new(),
        };

        for group in tree.children_of_kind(root, GROUP) {
            record.groups.push(read_group(tree, group)?);
        }
        for result in tree.children_of_kind(root, RESULT) {
            record.results.push(read_result(tree, result)?);
        }

        Ok(record)
    }

    /// The variant group with id `group_id`, if recorded
    pub fn group(&self, group_id: u32) -> Option<&VariantGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }
}

/// Serialize borrowed run state without cloning it into a record first
pub fn to_tree(
    evolution_id: &str,
    current_group_id: u32,
    next_variant_id: u32,
    groups: &[VariantGroup],
    results: &[GenerationResult],
) -> ConfigTree {
    let mut tree = ConfigTree::new();
    let root = tree.root();

    let evolution = tree.add_node(root, EVOLUTION);
    tree.add_value(evolution, "id", evolution_id);
    tree.add_value(evolution, "currentGroupId", current_group_id.to_string());
    tree.add_value(evolution, "nextVariantId", next_variant_id.to_string());

    for group in groups {
        let group_node = tree.add_node(root, GROUP);
        tree.add_value(group_node, "id", group.id.to_string());
        tree.add_value(group_node, "seedName", group.seed_name.as_str());
        tree.add_value(group_node, "referenceName", group.reference_name.as_str());

        for variant in &group.variants {
            let variant_node = tree.add_node(group_node, VARIANT);
            tree.add_value(variant_node, "id", variant.id.to_string());
            tree.add_value(variant_node, "name", variant.name.as_str());

            for part in &variant.mutated_parts {
                let mutation = tree.add_node(variant_node, MUTATION);
                tree.add_value(mutation, "partId", part.part_id.as_str());
                tree.add_value(mutation, "moduleId", part.module_id.as_str());
                tree.add_value(mutation, "paramName", part.param_name.as_str());
                tree.add_value(mutation, "referenceValue", format_float(part.reference_value));
                tree.add_value(mutation, "value", format_float(part.value));
            }
        }
    }

    for result in results {
        let node = tree.add_node(root, RESULT);
        tree.add_value(node, "groupId", result.group_id.to_string());
        tree.add_value(node, "outcome", result.outcome.as_str());
        if let Some(score) = result.max_score {
            tree.add_value(node, "maxScore", format_float(score));
        }
        if let Some(score) = result.reference_score {
            tree.add_value(node, "referenceScore", format_float(score));
        }
        tree.add_value(node, "nextSeed", result.next_seed.as_str());
        tree.add_value(node, "completedAt", result.completed_at.as_str());
        if let Some(anomaly) = &result.anomaly {
            tree.add_value(node, "anomaly", anomaly.replace('\n', " "));
        }
        for (name, value) in &result.scores {
            let score = tree.add_node(node, SCORE);
            tree.add_value(score, "name", name.as_str());
            tree.add_value(score, "value", format_float(*value));
        }
    }

    tree
}

fn read_group(tree: &ConfigTree, node: NodeId) -> Result<VariantGroup> {
    let mut variants = Vec::new();
    for variant_node in tree.children_of_kind(node, VARIANT) {
        let mut mutated_parts = Vec::new();
        for mutation in tree.children_of_kind(variant_node, MUTATION) {
            mutated_parts.push(MutatedPart {
                part_id: required(tree, mutation, "partId")?.to_string(),
                module_id: required(tree, mutation, "moduleId")?.to_string(),
                param_name: required(tree, mutation, "paramName")?.to_string(),
                reference_value: parse_field(tree, mutation, "referenceValue")?,
                value: parse_field(tree, mutation, "value")?,
            });
        }
        variants.push(Variant {
            id: parse_field(tree, variant_node, "id")?,
            name: required(tree, variant_node, "name")?.to_string(),
            mutated_parts,
        });
    }

    Ok(VariantGroup {
        id: parse_field(tree, node, "id")?,
        seed_name: required(tree, node, "seedName")?.to_string(),
        reference_name: required(tree, node, "referenceName")?.to_string(),
        variants,
    })
}

fn read_result(tree: &ConfigTree, node: NodeId) -> Result<GenerationResult> {
    let outcome_text = required(tree, node, "outcome")?;
    let outcome = GenerationOutcome::parse(outcome_text)
        .ok_or_else(|| EvolutionError::Lineage(format!("unknown outcome '{}'", outcome_text)))?;

    let mut scores = Vec::new();
    for score in tree.children_of_kind(node, SCORE) {
        scores.push((
            required(tree, score, "name")?.to_string(),
            parse_field(tree, score, "value")?,
        ));
    }

    Ok(GenerationResult {
        group_id: parse_field(tree, node, "groupId")?,
        outcome,
        max_score: tree.get_f64(node, "maxScore"),
        reference_score: tree.get_f64(node, "referenceScore"),
        next_seed: required(tree, node, "nextSeed")?.to_string(),
        completed_at: tree.get_value(node, "completedAt").unwrap_or_default().to_string(),
        anomaly: tree.get_value(node, "anomaly").map(str::to_string),
        scores,
    })
}

fn required<'a>(tree: &'a ConfigTree, node: NodeId, key: &str) -> Result<&'a str> {
    tree.get_value(node, key).ok_or_else(|| {
        EvolutionError::Lineage(format!("{} section missing '{}'", tree.kind(node), key))
    })
}

fn parse_field<T: std::str::FromStr>(tree: &ConfigTree, node: NodeId, key: &str) -> Result<T> {
    let raw = required(tree, node, key)?;
    raw.trim().parse::<T>().map_err(|_| {
        EvolutionError::Lineage(format!("{}.{} is not valid: '{}'", tree.kind(node), key, raw))
    })
}
