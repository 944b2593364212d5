use crate::document::{ConfigTree, NodeId, MODULE_IDENTITY, MODULE_NODE, PART_IDENTITY, PART_NODE};
use crate::engines::generation::catalog::{
    Axis, CatalogTarget, MutationCategory, CONTROL_SURFACE_PARAM, ENGINE_GIMBAL_PARAM,
};
use crate::types::MutatedPart;
use std::collections::HashSet;

/// A field located in a concrete document
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub part: NodeId,
    pub module: NodeId,
    pub part_id: String,
    pub module_id: String,
    pub param_name: String,
}

/// Capabilities shared by every mutation kind
pub trait MutationOperator {
    /// Locate the fields this mutation touches. Resolution happens against the
    /// document being mutated, so a missing target is simply an empty result.
    fn resolve_targets(&self, tree: &ConfigTree) -> Vec<ResolvedTarget>;

    /// Nudge every resolved numeric field by `(1 + modifier)` and report the
    /// values actually written.
    fn apply(&self, tree: &mut ConfigTree) -> Vec<MutatedPart>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// `authorityLimiter` of every control surface responding to `axis`
    ControlSurface { axis: Axis, modifier: f64 },
    /// `gimbalLimiter` of every gimbal enabled on `axis`
    EngineGimbal { axis: Axis, modifier: f64 },
    WeaponManager { param: String, modifier: f64 },
    PilotAi { param: String, modifier: f64 },
}

impl Mutation {
    pub fn category(&self) -> MutationCategory {
        match self {
            Mutation::ControlSurface { .. } => MutationCategory::ControlSurface,
            Mutation::EngineGimbal { .. } => MutationCategory::EngineGimbal,
            Mutation::WeaponManager { .. } => MutationCategory::WeaponManager,
            Mutation::PilotAi { .. } => MutationCategory::PilotAi,
        }
    }

    pub fn modifier(&self) -> f64 {
        match self {
            Mutation::ControlSurface { modifier, .. }
            | Mutation::EngineGimbal { modifier, .. }
            | Mutation::WeaponManager { modifier, .. }
            | Mutation::PilotAi { modifier, .. } => *modifier,
        }
    }

    /// Same target with a different modifier
    pub fn with_modifier(&self, modifier: f64) -> Self {
        match self {
            Mutation::ControlSurface { axis, .. } => Mutation::ControlSurface { axis: *axis, modifier },
            Mutation::EngineGimbal { axis, .. } => Mutation::EngineGimbal { axis: *axis, modifier },
            Mutation::WeaponManager { param, .. } => Mutation::WeaponManager {
                param: param.clone(),
                modifier,
            },
            Mutation::PilotAi { param, .. } => Mutation::PilotAi {
                param: param.clone(),
                modifier,
            },
        }
    }

    /// Catalog target this mutation was drawn from
    pub fn target(&self) -> CatalogTarget {
        match self {
            Mutation::ControlSurface { axis, .. } | Mutation::EngineGimbal { axis, .. } => {
                CatalogTarget::Axis(*axis)
            }
            Mutation::WeaponManager { param, .. } | Mutation::PilotAi { param, .. } => {
                CatalogTarget::Param(param.clone())
            }
        }
    }

    fn param_name(&self) -> &str {
        match self {
            Mutation::ControlSurface { .. } => CONTROL_SURFACE_PARAM,
            Mutation::EngineGimbal { .. } => ENGINE_GIMBAL_PARAM,
            Mutation::WeaponManager { param, .. } | Mutation::PilotAi { param, .. } => param,
        }
    }

    fn module_matches_axis(&self, tree: &ConfigTree, module: NodeId) -> bool {
        match self {
            Mutation::ControlSurface { axis, .. } => !tree
                .get_value(module, axis.ignore_field())
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            Mutation::EngineGimbal { axis, .. } => !tree
                .get_value(module, axis.enable_field())
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("false")),
            _ => true,
        }
    }
}

impl MutationOperator for Mutation {
    fn resolve_targets(&self, tree: &ConfigTree) -> Vec<ResolvedTarget> {
        let module_name = self.category().module_name();
        let modules = match self {
            Mutation::ControlSurface { .. } | Mutation::EngineGimbal { .. } => {
                tree.find_nodes(tree.root(), MODULE_NODE, MODULE_IDENTITY, module_name)
            }
            Mutation::WeaponManager { .. } | Mutation::PilotAi { .. } => tree
                .find_first(tree.root(), MODULE_NODE, MODULE_IDENTITY, module_name)
                .into_iter()
                .collect(),
        };

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for module in modules {
            if !self.module_matches_axis(tree, module) {
                continue;
            }
            let Some(part) = tree.enclosing(module, PART_NODE) else {
                log::debug!("{}: module outside any part, skipped", self.describe());
                continue;
            };
            let Some(part_id) = tree.get_value(part, PART_IDENTITY) else {
                log::debug!("{}: part without identity, skipped", self.describe());
                continue;
            };
            let module_id = tree.get_value(module, MODULE_IDENTITY).unwrap_or(module_name);

            // Aggregation resolves the first match per (part, module), so only
            // that one may be recorded.
            if !seen.insert((part_id.to_string(), module_id.to_string())) {
                continue;
            }

            targets.push(ResolvedTarget {
                part,
                module,
                part_id: part_id.to_string(),
                module_id: module_id.to_string(),
                param_name: self.param_name().to_string(),
            });
        }

        targets
    }

    fn apply(&self, tree: &mut ConfigTree) -> Vec<MutatedPart> {
        let modifier = self.modifier();
        let mut records = Vec::new();

        for target in self.resolve_targets(tree) {
            let Some(old) = tree.get_f64(target.module, &target.param_name) else {
                log::debug!(
                    "{}: {}/{} has no numeric '{}'",
                    self.describe(),
                    target.part_id,
                    target.module_id,
                    target.param_name
                );
                continue;
            };
            let new = old * (1.0 + modifier);
            tree.set_f64(target.module, &target.param_name, new);

            records.push(MutatedPart {
                part_id: target.part_id,
                module_id: target.module_id,
                param_name: target.param_name,
                reference_value: old,
                value: new,
            });
        }

        records
    }

    fn describe(&self) -> String {
        match self {
            Mutation::ControlSurface { axis, modifier } | Mutation::EngineGimbal { axis, modifier } => {
                format!("{}[{:?}] {:+}", self.category(), axis, modifier)
            }
            Mutation::WeaponManager { param, modifier } | Mutation::PilotAi { param, modifier } => {
                format!("{}[{}] {:+}", self.category(), param, modifier)
            }
        }
    }
}
