//! # idem
//!
//! Identity clustering primitives: label-indexed similarity matrices, an
//! agglomerative engine with pluggable similarity models, constraints and
//! stopping criteria, and an exact correlation-clustering formulation over
//! a pluggable ILP backend.
//!
//! **Agglomerative path**: fit one model per leaf, repeatedly merge the
//! best allowed pair, stop when the criterion fires. Greedy, scales to
//! thousands of items.
//!
//! **Exact path**: encode co-cluster decisions as binary variables under
//! equivalence (or track/identity) constraints and maximize one of four
//! objectives. Globally optimal, bounded to small instances.

/// Error types used across `idem`.
pub mod error;
pub mod clustering;
pub mod ilp;
pub mod matrix;
pub mod span;

pub use error::{Error, Result};
pub use matrix::{LabelMatrix, Ties};
pub use span::{Coverage, Span};

pub use clustering::{
    AgglomerativeClustering, CentroidModel, ConstraintPolicy, ContiguityConstraint, EngineState,
    FuncStop, Merge, ModularityConstraint, NegativeStop, NoConstraint, SimilarityModel,
    StoppingCriterion, ThresholdStop,
};

pub use ilp::{
    Cluster, ClusterId, CorrelationClustering, ExhaustiveBackend, IdentityNode, IlpBackend,
    IlpModel, Item, Method, Objective, Partition, Solution, SolveConfig, SolveStatus, TrackNode,
};
