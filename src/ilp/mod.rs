//! Exact correlation clustering as a binary integer program.
//!
//! Co-cluster membership is encoded as one binary variable `x[i, j]` per
//! ordered item pair, constrained to behave like an equivalence relation
//! (reflexive, symmetric, transitive), and the resulting 0/1 program is
//! handed to a pluggable [`IlpBackend`]. The decoded components of the
//! `x = 1` graph are the clusters.
//!
//! The formulation is O(n²) in variables and O(n³) in constraints, which in
//! practice bounds n to the low hundreds even with a commercial MILP solver.
//!
//! Modules:
//!
//! - [`node`]: heterogeneous item kinds (tracks vs. identities) and the
//!   decoded [`Partition`](node::Partition)
//! - [`backend`]: solver-agnostic model, configuration and the bundled
//!   [`ExhaustiveBackend`](backend::ExhaustiveBackend)
//! - [`clustering`]: the correlation-clustering formulation itself

pub mod backend;
pub mod clustering;
pub mod node;

pub use backend::{
    Direction, ExhaustiveBackend, IlpBackend, IlpModel, LinExpr, Method, Sense, SolveConfig,
    Solution, SolveStatus, VarId,
};
pub use clustering::{CorrelationClustering, Objective};
pub use node::{Cluster, ClusterId, IdentityNode, Item, Partition, TrackNode};
