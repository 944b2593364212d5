use crate::document::{ConfigTree, MODULE_IDENTITY, MODULE_NODE, PART_IDENTITY, PART_NODE};
use crate::error::{EvolutionError, Result};
use crate::types::VariantGroup;
use std::collections::{BTreeMap, HashMap};

/// A `(partId, moduleId, paramName)` target
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TargetKey {
    pub part_id: String,
    pub module_id: String,
    pub param_name: String,
}

#[derive(Debug, Clone)]
pub enum AggregateOutcome {
    /// Next-generation document
    Improved {
        tree: ConfigTree,
        unresolved: Vec<TargetKey>,
    },
    /// No variant beat the reference; the seed carries over as-is
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub outcome: AggregateOutcome,
    pub max_score: f64,
    pub reference_score: f64,
}

impl Aggregate {
    pub fn is_improved(&self) -> bool {
        matches!(self.outcome, AggregateOutcome::Improved { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Accumulated {
    reference_value: f64,
    contribution: f64,
}

type ContributionMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, Accumulated>>>;

/// Score-weighted centroid of a generation's deltas.
///
/// Every variant's weight is its score divided by the best variant score, and
/// each mutated field moves by the weighted sum of `(value - referenceValue)`
/// over all variants that touched it. The reference only gates the step.
#[derive(Debug, Default, Clone, Copy)]
pub struct CentroidAggregator;

impl CentroidAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(
        &self,
        group: &VariantGroup,
        scores: &HashMap<String, f64>,
        seed: &ConfigTree,
    ) -> Result<Aggregate> {
        if group.variants.is_empty() {
            return Err(EvolutionError::NoEffectiveVariants);
        }
        let score_of = |name: &str| {
            scores
                .get(name)
                .copied()
                .ok_or_else(|| EvolutionError::MissingStats(name.to_string()))
        };

        let mut max_score = f64::NEG_INFINITY;
        for variant in &group.variants {
            max_score = max_score.max(score_of(&variant.name)?);
        }
        let reference_score = score_of(&group.reference_name)?;

        if max_score <= 0.0 || max_score <= reference_score {
            log::info!(
                "Group {}: no improvement (best {:.4}, reference {:.4})",
                group.id,
                max_score,
                reference_score
            );
            return Ok(Aggregate {
                outcome: AggregateOutcome::Unchanged,
                max_score,
                reference_score,
            });
        }

        let mut contributions: ContributionMap = BTreeMap::new();
        for variant in &group.variants {
            let weight = score_of(&variant.name)? / max_score;

            for part in &variant.mutated_parts {
                let contribution = (part.value - part.reference_value) * weight;
                let slot = contributions
                    .entry(part.part_id.clone())
                    .or_default()
                    .entry(part.module_id.clone())
                    .or_default()
                    .entry(part.param_name.clone())
                    .or_insert(Accumulated {
                        reference_value: part.reference_value,
                        contribution: 0.0,
                    });

                if slot.reference_value != part.reference_value {
                    return Err(EvolutionError::InconsistentReference {
                        part_id: part.part_id.clone(),
                        module_id: part.module_id.clone(),
                        param_name: part.param_name.clone(),
                        first: slot.reference_value,
                        second: part.reference_value,
                    });
                }
                slot.contribution += contribution;
            }
        }

        let mut tree = seed.clone();
        let mut unresolved = Vec::new();
        for (part_id, modules) in &contributions {
            for (module_id, params) in modules {
                for (param_name, accumulated) in params {
                    let key = TargetKey {
                        part_id: part_id.clone(),
                        module_id: module_id.clone(),
                        param_name: param_name.clone(),
                    };
                    if !apply_target(&mut tree, &key, accumulated) {
                        log::warn!(
                            "Group {}: target {}/{}/{} not found in seed, skipped",
                            group.id,
                            part_id,
                            module_id,
                            param_name
                        );
                        unresolved.push(key);
                    }
                }
            }
        }

        log::info!(
            "Group {}: centroid step over {} target(s) (best {:.4}, reference {:.4})",
            group.id,
            contributions.values().flat_map(|m| m.values()).map(|p| p.len()).sum::<usize>(),
            max_score,
            reference_score
        );

        Ok(Aggregate {
            outcome: AggregateOutcome::Improved { tree, unresolved },
            max_score,
            reference_score,
        })
    }
}

/// Resolve first matching part, then first matching module under it
fn apply_target(tree: &mut ConfigTree, key: &TargetKey, accumulated: &Accumulated) -> bool {
    let Some(part) = tree.find_first(tree.root(), PART_NODE, PART_IDENTITY, &key.part_id) else {
        return false;
    };
    let Some(module) = tree.find_first(part, MODULE_NODE, MODULE_IDENTITY, &key.module_id) else {
        return false;
    };
    if !tree.has_value(module, &key.param_name) {
        return false;
    }
    // A zero step leaves the field's original text untouched
    if accumulated.contribution == 0.0 {
        return true;
    }
    tree.set_f64(
        module,
        &key.param_name,
        accumulated.reference_value + accumulated.contribution,
    )
}
