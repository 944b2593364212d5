use crate::document::ConfigTree;
use crate::engines::generation::mutation::{Mutation, MutationOperator};
use crate::types::MutatedPart;
use rayon::prelude::*;

/// A mutated clone of the seed and the fields that changed
#[derive(Debug, Clone)]
pub struct MaterializedVariant {
    pub mutation: Mutation,
    pub tree: ConfigTree,
    pub mutated_parts: Vec<MutatedPart>,
}

impl MaterializedVariant {
    /// True when the mutation touched at least one field
    pub fn is_effective(&self) -> bool {
        !self.mutated_parts.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VariantMaterializer;

impl VariantMaterializer {
    pub fn new() -> Self {
        Self
    }

    /// Apply `mutation` to a clone of `seed`; the seed is never modified
    pub fn materialize(&self, seed: &ConfigTree, mutation: &Mutation) -> (ConfigTree, Vec<MutatedPart>) {
        let mut variant = seed.clone();
        let mutated_parts = mutation.apply(&mut variant);
        if mutated_parts.is_empty() {
            log::debug!("{} resolved no numeric targets", mutation.describe());
        }
        (variant, mutated_parts)
    }

    /// Materialize a batch in parallel; output order matches `mutations`
    pub fn materialize_batch(&self, seed: &ConfigTree, mutations: &[Mutation]) -> Vec<MaterializedVariant> {
        mutations
            .par_iter()
            .map(|mutation| {
                let (tree, mutated_parts) = self.materialize(seed, mutation);
                MaterializedVariant {
                    mutation: mutation.clone(),
                    tree,
                    mutated_parts,
                }
            })
            .collect()
    }
}
