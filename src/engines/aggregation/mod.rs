pub mod centroid;

pub use centroid::{Aggregate, AggregateOutcome, CentroidAggregator, TargetKey};
