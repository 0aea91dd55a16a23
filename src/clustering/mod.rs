//! Incremental agglomerative clustering.
//!
//! The engine in [`agglomerative`] drives a greedy bottom-up merge loop over
//! three pluggable strategies, injected by composition:
//!
//! | Strategy | Decides | Trait |
//! |----------|---------|-------|
//! | similarity model | how similar two clusters are | [`SimilarityModel`] |
//! | constraint policy | whether a merge is legal | [`ConstraintPolicy`] |
//! | stopping criterion | when to stop merging | [`StoppingCriterion`] |
//!
//! Each strategy is a small interface with a fixed method set, so each can
//! be unit-tested on its own and swapped without touching the loop.

pub mod agglomerative;
pub mod constraint;
pub mod model;
pub mod stop;

pub use agglomerative::{AgglomerativeClustering, EngineState, Merge};
pub use constraint::{ConstraintPolicy, ContiguityConstraint, ModularityConstraint, NoConstraint};
pub use model::{CentroidModel, SimilarityModel};
pub use stop::{FuncStop, NegativeStop, StoppingCriterion, ThresholdStop};
