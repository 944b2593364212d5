use crate::config::EvolutionConfig;
use crate::document::ConfigTree;
use crate::engines::generation::catalog::{MutationCatalog, MutationCategory};
use crate::engines::generation::mutation::Mutation;
use crate::error::{EvolutionError, Result};
use rand::Rng;
use std::collections::HashSet;

/// Draws a generation's batch of opposed mutation pairs
pub struct MutationSampler {
    catalog: MutationCatalog,
    batch_size: usize,
    radius: f64,
    max_attempts: usize,
}

impl MutationSampler {
    pub fn new(catalog: MutationCatalog, config: &EvolutionConfig) -> Self {
        Self {
            catalog,
            batch_size: config.batch_size,
            radius: config.perturbation_radius,
            max_attempts: config.max_sample_attempts,
        }
    }

    pub fn catalog(&self) -> &MutationCatalog {
        &self.catalog
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sample `batch_size` mutations as `(+r, -r)` pairs.
    ///
    /// Each draw picks a category uniformly; a category whose module is
    /// missing from `tree` or whose pool is spent contributes nothing and the
    /// loop draws again. Targets are never repeated within one batch. Fails
    /// with [`EvolutionError::SamplingExhausted`] after `max_attempts` draws,
    /// or without drawing when no category's module is present.
    pub fn sample<R: Rng>(&self, tree: &ConfigTree, rng: &mut R) -> Result<Vec<Mutation>> {
        let applicable: HashSet<MutationCategory> = MutationCategory::ALL
            .into_iter()
            .filter(|category| self.catalog.is_applicable(*category, tree))
            .collect();
        if applicable.is_empty() && self.batch_size > 0 {
            return Err(EvolutionError::SamplingExhausted {
                attempts: 0,
                sampled: 0,
                target: self.batch_size,
            });
        }

        let mut pool = self.catalog.candidate_pool();
        let mut mutations = Vec::with_capacity(self.batch_size);
        let mut attempts = 0;

        while mutations.len() < self.batch_size {
            if attempts >= self.max_attempts {
                return Err(EvolutionError::SamplingExhausted {
                    attempts,
                    sampled: mutations.len(),
                    target: self.batch_size,
                });
            }
            attempts += 1;

            let category = MutationCategory::from_draw(rng.gen_range(0..100));
            if !applicable.contains(&category) {
                continue;
            }

            let Some(target) = pool.take(category, rng) else {
                continue;
            };
            if let Some(positive) = self.catalog.mutation(category, target, self.radius) {
                let negative = positive.with_modifier(-self.radius);
                mutations.push(positive);
                mutations.push(negative);
            }
        }

        log::debug!(
            "Sampled {} mutations in {} draws",
            mutations.len(),
            attempts
        );
        Ok(mutations)
    }
}
