pub mod catalog;
pub mod materializer;
pub mod mutation;
pub mod sampler;

pub use catalog::{Axis, CandidatePool, CatalogTarget, MutationCatalog, MutationCategory};
pub use materializer::{MaterializedVariant, VariantMaterializer};
pub use mutation::{Mutation, MutationOperator, ResolvedTarget};
pub use sampler::MutationSampler;
