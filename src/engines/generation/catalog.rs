use crate::document::{ConfigTree, MODULE_IDENTITY, MODULE_NODE};
use crate::engines::generation::mutation::Mutation;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CONTROL_SURFACE_MODULE: &str = "ModuleControlSurface";
pub const CONTROL_SURFACE_PARAM: &str = "authorityLimiter";
pub const ENGINE_GIMBAL_MODULE: &str = "ModuleGimbal";
pub const ENGINE_GIMBAL_PARAM: &str = "gimbalLimiter";
pub const WEAPON_MANAGER_MODULE: &str = "MissileFire";
pub const PILOT_AI_MODULE: &str = "BDModulePilotAI";

/// Weapon manager targeting parameters open to mutation
pub const WEAPON_MANAGER_PARAMS: &[&str] = &[
    "gunRange",
    "targetBias",
    "targetWeightRange",
    "targetWeightATA",
    "targetWeightAoD",
    "targetWeightAccel",
    "targetWeightClosureTime",
    "targetWeightWeaponNumber",
    "targetWeightMass",
    "targetWeightFriendliesEngaging",
    "targetWeightThreat",
];

/// Pilot AI flight parameters open to mutation
pub const PILOT_AI_PARAMS: &[&str] = &[
    "steerMult",
    "steerKiAdjust",
    "steerDamping",
    "defaultAltitude",
    "minAltitude",
    "maxSpeed",
    "takeOffSpeed",
    "minSpeed",
    "idleSpeed",
    "maxSteer",
    "maxBank",
    "maxAllowedGForce",
    "maxAllowedAoA",
    "minEvasionTime",
    "evasionThreshold",
    "evasionTimeThreshold",
    "extendMult",
    "turnRadiusTwiddleFactorMin",
    "turnRadiusTwiddleFactorMax",
    "controlSurfaceLag",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationCategory {
    ControlSurface,
    EngineGimbal,
    WeaponManager,
    PilotAi,
}

impl MutationCategory {
    pub const ALL: [MutationCategory; 4] = [
        MutationCategory::ControlSurface,
        MutationCategory::EngineGimbal,
        MutationCategory::WeaponManager,
        MutationCategory::PilotAi,
    ];

    /// Map a selector in [0, 100) onto four ranges of width 25
    pub fn from_draw(draw: u32) -> Self {
        match draw {
            0..=24 => MutationCategory::ControlSurface,
            25..=49 => MutationCategory::EngineGimbal,
            50..=74 => MutationCategory::WeaponManager,
            _ => MutationCategory::PilotAi,
        }
    }

    pub fn module_name(&self) -> &'static str {
        match self {
            MutationCategory::ControlSurface => CONTROL_SURFACE_MODULE,
            MutationCategory::EngineGimbal => ENGINE_GIMBAL_MODULE,
            MutationCategory::WeaponManager => WEAPON_MANAGER_MODULE,
            MutationCategory::PilotAi => PILOT_AI_MODULE,
        }
    }
}

impl fmt::Display for MutationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MutationCategory::ControlSurface => "ControlSurface",
            MutationCategory::EngineGimbal => "EngineGimbal",
            MutationCategory::WeaponManager => "WeaponManager",
            MutationCategory::PilotAi => "PilotAI",
        };
        f.write_str(label)
    }
}

/// Control axis selected by surface and gimbal mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Roll,
    Pitch,
    Yaw,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Roll, Axis::Pitch, Axis::Yaw];

    /// Control surface flag that, when `True`, excludes the surface from this axis
    pub fn ignore_field(&self) -> &'static str {
        match self {
            Axis::Roll => "ignoreRoll",
            Axis::Pitch => "ignorePitch",
            Axis::Yaw => "ignoreYaw",
        }
    }

    /// Gimbal flag that, when `False`, excludes the gimbal from this axis
    pub fn enable_field(&self) -> &'static str {
        match self {
            Axis::Roll => "enableRoll",
            Axis::Pitch => "enablePitch",
            Axis::Yaw => "enableYaw",
        }
    }
}

/// One sampled target, before it is resolved against a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogTarget {
    Axis(Axis),
    Param(String),
}

/// Mutation categories and the targets each may perturb
#[derive(Debug, Clone)]
pub struct MutationCatalog {
    weapon_manager_params: Vec<String>,
    pilot_ai_params: Vec<String>,
}

impl Default for MutationCatalog {
    fn default() -> Self {
        Self::new(WEAPON_MANAGER_PARAMS, PILOT_AI_PARAMS)
    }
}

impl MutationCatalog {
    pub fn new(weapon_manager_params: &[&str], pilot_ai_params: &[&str]) -> Self {
        Self {
            weapon_manager_params: weapon_manager_params.iter().map(|p| p.to_string()).collect(),
            pilot_ai_params: pilot_ai_params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Fresh per-generation pool holding every target of every category
    pub fn candidate_pool(&self) -> CandidatePool {
        CandidatePool {
            control_surface_axes: Axis::ALL.to_vec(),
            engine_gimbal_axes: Axis::ALL.to_vec(),
            weapon_manager_params: self.weapon_manager_params.clone(),
            pilot_ai_params: self.pilot_ai_params.clone(),
        }
    }

    /// Structural precondition for drawing from `category`: its module must
    /// be present somewhere in the document
    pub fn is_applicable(&self, category: MutationCategory, tree: &ConfigTree) -> bool {
        tree.find_first(tree.root(), MODULE_NODE, MODULE_IDENTITY, category.module_name())
            .is_some()
    }

    /// Perturbation operator of `category` bound to `target`
    pub fn mutation(&self, category: MutationCategory, target: CatalogTarget, modifier: f64) -> Option<Mutation> {
        match (category, target) {
            (MutationCategory::ControlSurface, CatalogTarget::Axis(axis)) => {
                Some(Mutation::ControlSurface { axis, modifier })
            }
            (MutationCategory::EngineGimbal, CatalogTarget::Axis(axis)) => {
                Some(Mutation::EngineGimbal { axis, modifier })
            }
            (MutationCategory::WeaponManager, CatalogTarget::Param(param)) => {
                Some(Mutation::WeaponManager { param, modifier })
            }
            (MutationCategory::PilotAi, CatalogTarget::Param(param)) => {
                Some(Mutation::PilotAi { param, modifier })
            }
            _ => None,
        }
    }
}

/// Remaining targets within one generation; drawing removes the target
#[derive(Debug, Clone)]
pub struct CandidatePool {
    control_surface_axes: Vec<Axis>,
    engine_gimbal_axes: Vec<Axis>,
    weapon_manager_params: Vec<String>,
    pilot_ai_params: Vec<String>,
}

impl CandidatePool {
    pub fn remaining(&self, category: MutationCategory) -> usize {
        match category {
            MutationCategory::ControlSurface => self.control_surface_axes.len(),
            MutationCategory::EngineGimbal => self.engine_gimbal_axes.len(),
            MutationCategory::WeaponManager => self.weapon_manager_params.len(),
            MutationCategory::PilotAi => self.pilot_ai_params.len(),
        }
    }

    /// Remove and return a uniformly chosen target, or None when exhausted
    pub fn take<R: Rng>(&mut self, category: MutationCategory, rng: &mut R) -> Option<CatalogTarget> {
        match category {
            MutationCategory::ControlSurface => {
                take_random(&mut self.control_surface_axes, rng).map(CatalogTarget::Axis)
            }
            MutationCategory::EngineGimbal => {
                take_random(&mut self.engine_gimbal_axes, rng).map(CatalogTarget::Axis)
            }
            MutationCategory::WeaponManager => {
                take_random(&mut self.weapon_manager_params, rng).map(CatalogTarget::Param)
            }
            MutationCategory::PilotAi => {
                take_random(&mut self.pilot_ai_params, rng).map(CatalogTarget::Param)
            }
        }
    }
}

fn take_random<T, R: Rng>(items: &mut Vec<T>, rng: &mut R) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..items.len());
    Some(items.remove(index))
}
