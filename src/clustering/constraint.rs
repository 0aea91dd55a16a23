//! Merge-legality constraints.
//!
//! A [`ConstraintPolicy`] decides whether a prospective merge of two live
//! clusters is legal, and maintains incremental state as merges happen. The
//! engine consults [`allows`](ConstraintPolicy::allows) before every merge
//! and notifies the policy through [`on_merge`](ConstraintPolicy::on_merge)
//! afterwards, so policies only ever recompute the new cluster's row.
//!
//! Two concrete policies are provided:
//!
//! - [`ContiguityConstraint`]: clusters are mergeable only when their
//!   tolerance-padded time coverages intersect.
//! - [`ModularityConstraint`]: a merge is legal only when it strictly
//!   increases the modularity of the partition induced on the similarity
//!   graph.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};
use crate::matrix::LabelMatrix;
use crate::span::Coverage;

/// Pluggable merge-legality strategy.
///
/// Labels are the engine's cluster ids: leaves are `0..n`, merged clusters
/// get fresh ids minted by the engine.
pub trait ConstraintPolicy {
    /// Build incremental state for the initial singleton clusters.
    ///
    /// Called once, before any merge attempt. Missing per-label data is a
    /// fatal configuration error raised here, never later.
    fn init(&mut self, labels: &[usize], similarity: &LabelMatrix<usize, f64>) -> Result<()>;

    /// Is merging clusters `a` and `b` legal right now?
    fn allows(&self, a: usize, b: usize) -> bool;

    /// Update incremental state after a merge.
    ///
    /// `live` is the surviving cluster set, `new_label` included.
    fn on_merge(
        &mut self,
        new_label: usize,
        merged: &[usize],
        live: &[usize],
        similarity: &LabelMatrix<usize, f64>,
    ) -> Result<()>;
}

/// Constraint that allows every merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConstraint;

impl ConstraintPolicy for NoConstraint {
    fn init(&mut self, _labels: &[usize], _similarity: &LabelMatrix<usize, f64>) -> Result<()> {
        Ok(())
    }

    fn allows(&self, _a: usize, _b: usize) -> bool {
        true
    }

    fn on_merge(
        &mut self,
        _new_label: usize,
        _merged: &[usize],
        _live: &[usize],
        _similarity: &LabelMatrix<usize, f64>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Temporal contiguity: two clusters are mergeable only when their extended
/// coverages intersect.
///
/// Every span is padded by half the tolerance on both ends, so two clusters
/// separated by a gap smaller than the tolerance still count as contiguous.
/// The pairwise answer is cached in a boolean [`LabelMatrix`] (default
/// `false`) and only the merged cluster's row is recomputed on merge.
#[derive(Debug, Clone)]
pub struct ContiguityConstraint {
    tolerance: f64,
    leaf_coverages: Vec<Coverage>,
    coverages: HashMap<usize, Coverage>,
    contiguous: LabelMatrix<usize, bool>,
}

impl ContiguityConstraint {
    /// Create the constraint from a tolerance (seconds) and one coverage per
    /// leaf label, in leaf order.
    pub fn new(tolerance: f64, leaf_coverages: Vec<Coverage>) -> Self {
        Self {
            tolerance,
            leaf_coverages,
            coverages: HashMap::new(),
            contiguous: LabelMatrix::new(false),
        }
    }

    fn extended(&self, label: usize) -> Result<Coverage> {
        let cov = self.coverages.get(&label).ok_or_else(|| Error::MissingData {
            what: format!("coverage for label {label}"),
        })?;
        Ok(cov.pad(0.5 * self.tolerance))
    }
}

impl ConstraintPolicy for ContiguityConstraint {
    fn init(&mut self, labels: &[usize], _similarity: &LabelMatrix<usize, f64>) -> Result<()> {
        if self.leaf_coverages.len() != labels.len() {
            return Err(Error::MissingData {
                what: format!(
                    "one coverage per label ({} labels, {} coverages)",
                    labels.len(),
                    self.leaf_coverages.len()
                ),
            });
        }
        self.coverages = labels
            .iter()
            .zip(&self.leaf_coverages)
            .map(|(&l, c)| (l, c.clone()))
            .collect();
        self.contiguous = LabelMatrix::new(false);
        for (i, &a) in labels.iter().enumerate() {
            let xcov = self.extended(a)?;
            for &b in &labels[i + 1..] {
                let other = self.extended(b)?;
                if xcov.intersects(&other) {
                    self.contiguous.set(a, b, true);
                    self.contiguous.set(b, a, true);
                }
            }
        }
        Ok(())
    }

    fn allows(&self, a: usize, b: usize) -> bool {
        self.contiguous.get(&a, &b)
    }

    fn on_merge(
        &mut self,
        new_label: usize,
        merged: &[usize],
        live: &[usize],
        _similarity: &LabelMatrix<usize, f64>,
    ) -> Result<()> {
        let parts: Vec<&Coverage> = merged
            .iter()
            .filter_map(|l| self.coverages.get(l))
            .collect();
        if parts.len() != merged.len() {
            return Err(Error::MissingData {
                what: format!("coverage for merged labels {merged:?}"),
            });
        }
        let union = Coverage::union(&parts);
        for label in merged {
            self.coverages.remove(label);
            self.contiguous.remove_row(label);
            self.contiguous.remove_col(label);
        }
        self.coverages.insert(new_label, union);

        let xcov = self.extended(new_label)?;
        for &other in live {
            if other == new_label {
                continue;
            }
            let contiguous = xcov.intersects(&self.extended(other)?);
            self.contiguous.set(new_label, other, contiguous);
            self.contiguous.set(other, new_label, contiguous);
        }
        Ok(())
    }
}

/// Modularity improvement: a merge is legal only when co-assigning the two
/// clusters strictly increases the modularity of the tracked partition.
///
/// At setup, a weighted directed graph is built from every finite similarity
/// pair; a label-less setup fails fast, while a single label (no pairs) is a
/// valid trivial run. The tracked partition maps the original leaves to
/// their current cluster, and every merge appends the resulting modularity
/// to the policy's own history.
#[derive(Debug, Clone, Default)]
pub struct ModularityConstraint {
    graph: DiGraph<usize, f64>,
    node_of: HashMap<usize, NodeIndex>,
    members: HashMap<usize, Vec<usize>>,
    partition: HashMap<usize, usize>,
    history: Vec<f64>,
}

impl ModularityConstraint {
    /// Create an empty policy; state is built by `init`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Modularity values recorded so far (one entry at init, one per merge).
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Directed modularity of a partition of the graph's leaves.
    ///
    /// Q = Σ_intra w/m − Σ_c (out_c · in_c)/m², the directed form of the
    /// usual null-model comparison.
    fn modularity(&self, partition: &HashMap<usize, usize>) -> f64 {
        let m: f64 = self.graph.edge_references().map(|e| *e.weight()).sum();
        if m == 0.0 {
            return 0.0;
        }
        let mut intra = 0.0;
        let mut out_strength: HashMap<usize, f64> = HashMap::new();
        let mut in_strength: HashMap<usize, f64> = HashMap::new();
        for edge in self.graph.edge_references() {
            let u = self.graph[edge.source()];
            let v = self.graph[edge.target()];
            let w = *edge.weight();
            let (cu, cv) = match (partition.get(&u), partition.get(&v)) {
                (Some(&cu), Some(&cv)) => (cu, cv),
                _ => continue,
            };
            if cu == cv {
                intra += w;
            }
            *out_strength.entry(cu).or_insert(0.0) += w;
            *in_strength.entry(cv).or_insert(0.0) += w;
        }
        let mut q = intra / m;
        for (community, out) in &out_strength {
            if let Some(inw) = in_strength.get(community) {
                q -= out * inw / (m * m);
            }
        }
        q
    }
}

impl ConstraintPolicy for ModularityConstraint {
    fn init(&mut self, labels: &[usize], similarity: &LabelMatrix<usize, f64>) -> Result<()> {
        // A single label yields an empty similarity matrix; that is a valid
        // trivial run. Only a label-less setup is a configuration error.
        if labels.is_empty() {
            return Err(Error::EmptyInput);
        }
        self.graph = DiGraph::new();
        let mut node_of = HashMap::new();
        for &label in labels {
            node_of.insert(label, self.graph.add_node(label));
        }
        self.node_of = node_of;
        for (&i, &j, &s) in similarity.iter_pairs() {
            if !s.is_finite() {
                continue;
            }
            if let (Some(&u), Some(&v)) = (self.node_of.get(&i), self.node_of.get(&j)) {
                self.graph.add_edge(u, v, s);
            }
        }
        self.members = labels.iter().map(|&l| (l, vec![l])).collect();
        self.partition = labels.iter().map(|&l| (l, l)).collect();
        self.history = vec![self.modularity(&self.partition)];
        Ok(())
    }

    fn allows(&self, a: usize, b: usize) -> bool {
        let (Some(ma), Some(mb)) = (self.members.get(&a), self.members.get(&b)) else {
            return false;
        };
        let mut candidate = self.partition.clone();
        for leaf in ma.iter().chain(mb) {
            candidate.insert(*leaf, a);
        }
        let last = self.history.last().copied().unwrap_or(f64::NEG_INFINITY);
        self.modularity(&candidate) > last
    }

    fn on_merge(
        &mut self,
        new_label: usize,
        merged: &[usize],
        _live: &[usize],
        _similarity: &LabelMatrix<usize, f64>,
    ) -> Result<()> {
        let mut leaves = Vec::new();
        for label in merged {
            let members = self.members.remove(label).ok_or_else(|| Error::MissingData {
                what: format!("members of merged label {label}"),
            })?;
            leaves.extend(members);
        }
        for &leaf in &leaves {
            self.partition.insert(leaf, new_label);
        }
        self.members.insert(new_label, leaves);
        self.history.push(self.modularity(&self.partition));
        Ok(())
    }
}
