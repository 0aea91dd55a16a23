//! Correlation-clustering formulation.
//!
//! One binary variable `x[i, j]` per ordered item pair encodes "i and j end
//! up in the same cluster". Constraints force `x` to be an equivalence
//! relation; the objective trades intra-cluster agreement against
//! inter-cluster disagreement. Pairs with unknown similarity are excluded
//! from every objective sum.
//!
//! # Homogeneous vs. heterogeneous builds
//!
//! [`CorrelationClustering::new`] treats every item alike and adds the full
//! transitivity closure. [`CorrelationClustering::heterogeneous`] splits
//! items into tracks and identities and replaces the triples involving an
//! identity with the asymmetric form: a track following another track onto
//! an identity is forced, but two tracks sharing an identity are *not*
//! forced into the same pair variable, and each track may match at most one
//! identity.
//!
//! # Cost
//!
//! O(n²) variables and O(n³) constraints. Practically this bounds n to the
//! low hundreds; beyond that the agglomerative engine is the realistic
//! option.

use std::io::{self, Write};

use petgraph::unionfind::UnionFind;

use crate::error::{Error, Result};
use crate::ilp::backend::{
    Direction, IlpBackend, IlpModel, LinExpr, Sense, SolveConfig, SolveStatus, VarId,
};
use crate::ilp::node::{Cluster, ClusterId, Item, Partition};

/// Objective function selector.
///
/// All four maximize over the pairs with known similarity; `alpha` trades
/// recall against precision of merges and must fall strictly inside (0, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// `Σ α·x·p + (1-α)·(1-x)·(1-p)` — intra-cluster agreement plus
    /// inter-cluster disagreement.
    IntraInter {
        /// Recall/precision trade-off.
        alpha: f64,
    },
    /// The same sum with a per-pair weight applied to both terms.
    WeightedIntraInter {
        /// Recall/precision trade-off.
        alpha: f64,
    },
    /// Modularity of the co-cluster indicator against the similarity graph.
    Modularity,
    /// `Σ α·x·log(p) + (1-α)·(1-x)·log(1-p)`; probabilities are clamped
    /// away from 0 and 1.
    LogIntraInter {
        /// Recall/precision trade-off.
        alpha: f64,
    },
}

/// Exact correlation clustering over a set of items.
pub struct CorrelationClustering {
    items: Vec<Item>,
    tracks: Vec<usize>,
    identities: Vec<usize>,
    similarity: Vec<Option<f64>>,
    weights: Vec<f64>,
    model: IlpModel,
}

impl CorrelationClustering {
    /// Homogeneous build: reflexivity, symmetry, full transitivity and hard
    /// constraints over all items.
    pub fn new<F>(items: Vec<Item>, get_similarity: F) -> Result<Self>
    where
        F: Fn(&Item, &Item) -> Option<f64>,
    {
        Self::build(items, get_similarity, false)
    }

    /// Heterogeneous build: transitivity over track triples only, plus the
    /// asymmetric track/identity constraints and at most one identity per
    /// track.
    pub fn heterogeneous<F>(items: Vec<Item>, get_similarity: F) -> Result<Self>
    where
        F: Fn(&Item, &Item) -> Option<f64>,
    {
        Self::build(items, get_similarity, true)
    }

    fn build<F>(items: Vec<Item>, get_similarity: F, heterogeneous: bool) -> Result<Self>
    where
        F: Fn(&Item, &Item) -> Option<f64>,
    {
        if items.is_empty() {
            return Err(Error::EmptyInput);
        }
        let n = items.len();
        let mut tracks = Vec::new();
        let mut identities = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if item.is_identity() {
                identities.push(i);
            } else {
                tracks.push(i);
            }
        }

        let mut similarity = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                similarity.push(get_similarity(&items[i], &items[j]));
            }
        }

        let mut model = IlpModel::new();
        // one variable per ordered pair, in row-major order
        for _ in 0..n * n {
            model.add_binary();
        }
        let var = |i: usize, j: usize| -> VarId { i * n + j };

        // reflexivity: x[i, i] = 1
        for i in 0..n {
            model.fix(var(i, i), 1.0);
        }

        // symmetry: x[i, j] = x[j, i]
        for i in 0..n {
            for j in (i + 1)..n {
                model.add_constraint(
                    LinExpr::new().term(1.0, var(i, j)).term(-1.0, var(j, i)),
                    Sense::Eq,
                    0.0,
                );
            }
        }

        // hard constraints: similarity exactly 0 or 1 decides the pair
        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(s) = similarity[i * n + j] {
                    if s == 0.0 || s == 1.0 {
                        model.fix(var(i, j), s);
                    }
                }
            }
        }

        let transitivity_triple = |model: &mut IlpModel, i: usize, j: usize, k: usize| {
            model.add_constraint(
                LinExpr::new()
                    .term(1.0, var(j, k))
                    .term(1.0, var(i, k))
                    .term(-1.0, var(i, j)),
                Sense::Le,
                1.0,
            );
            model.add_constraint(
                LinExpr::new()
                    .term(1.0, var(i, j))
                    .term(1.0, var(i, k))
                    .term(-1.0, var(j, k)),
                Sense::Le,
                1.0,
            );
            model.add_constraint(
                LinExpr::new()
                    .term(1.0, var(i, j))
                    .term(1.0, var(j, k))
                    .term(-1.0, var(i, k)),
                Sense::Le,
                1.0,
            );
        };

        if heterogeneous {
            // transitivity among tracks only
            for a in 0..tracks.len() {
                for b in (a + 1)..tracks.len() {
                    for c in (b + 1)..tracks.len() {
                        transitivity_triple(&mut model, tracks[a], tracks[b], tracks[c]);
                    }
                }
            }
            // asymmetric transitivity: T~I and T~S force S~I, but T~I and
            // S~I do not force T~S
            for &identity in &identities {
                for a in 0..tracks.len() {
                    for b in (a + 1)..tracks.len() {
                        let (t, s) = (tracks[a], tracks[b]);
                        model.add_constraint(
                            LinExpr::new()
                                .term(1.0, var(t, identity))
                                .term(1.0, var(t, s))
                                .term(-1.0, var(s, identity)),
                            Sense::Le,
                            1.0,
                        );
                        model.add_constraint(
                            LinExpr::new()
                                .term(1.0, var(s, identity))
                                .term(1.0, var(t, s))
                                .term(-1.0, var(t, identity)),
                            Sense::Le,
                            1.0,
                        );
                    }
                }
            }
            // unique identity: every track matches at most one identity
            if !identities.is_empty() {
                for &t in &tracks {
                    let mut expr = LinExpr::new();
                    for &identity in &identities {
                        expr.add_term(1.0, var(t, identity));
                    }
                    model.add_constraint(expr, Sense::Le, 1.0);
                }
            }
        } else {
            for i in 0..n {
                for j in (i + 1)..n {
                    for k in (j + 1)..n {
                        transitivity_triple(&mut model, i, j, k);
                    }
                }
            }
        }

        log::debug!(
            "built correlation clustering model: {} items, {} variables, {} constraints",
            n,
            model.n_vars(),
            model.constraints().len()
        );

        Ok(Self {
            items,
            tracks,
            identities,
            similarity,
            weights: vec![1.0; n * n],
            model,
        })
    }

    /// Number of items.
    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// The items, in index order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Track item indices.
    pub fn tracks(&self) -> &[usize] {
        &self.tracks
    }

    /// Identity item indices.
    pub fn identities(&self) -> &[usize] {
        &self.identities
    }

    /// The underlying model (for inspection or a warm start).
    pub fn model(&self) -> &IlpModel {
        &self.model
    }

    fn var(&self, i: usize, j: usize) -> VarId {
        i * self.items.len() + j
    }

    /// Provide per-pair weights for [`Objective::WeightedIntraInter`].
    pub fn with_weights<F>(mut self, get_weight: F) -> Self
    where
        F: Fn(&Item, &Item) -> f64,
    {
        let n = self.items.len();
        for i in 0..n {
            for j in 0..n {
                self.weights[i * n + j] = get_weight(&self.items[i], &self.items[j]);
            }
        }
        self
    }

    /// Provide a warm-start assignment: pairs known to be co-clustered.
    pub fn set_warm_start(&mut self, pairs: &[(usize, usize, bool)]) {
        let assignment = pairs
            .iter()
            .map(|&(i, j, same)| (self.var(i, j), if same { 1.0 } else { 0.0 }))
            .collect();
        self.model.set_warm_start(assignment);
    }

    /// Install the selected objective on the model.
    pub fn set_objective(&mut self, objective: Objective) -> Result<()> {
        let expr = match objective {
            Objective::IntraInter { alpha } => self.intra_inter(alpha, false)?,
            Objective::WeightedIntraInter { alpha } => self.intra_inter(alpha, true)?,
            Objective::Modularity => self.modularity()?,
            Objective::LogIntraInter { alpha } => self.log_intra_inter(alpha)?,
        };
        self.model.set_objective(expr, Direction::Maximize);
        Ok(())
    }

    fn check_alpha(alpha: f64) -> Result<()> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: "must fall strictly inside (0, 1)",
            });
        }
        Ok(())
    }

    /// `Σ α·w·x·p + (1-α)·w·(1-x)·(1-p)` over known pairs, as a linear
    /// expression in x.
    fn intra_inter(&self, alpha: f64, weighted: bool) -> Result<LinExpr> {
        Self::check_alpha(alpha)?;
        let n = self.items.len();
        let mut expr = LinExpr::new();
        for i in 0..n {
            for j in 0..n {
                let Some(p) = self.similarity[i * n + j] else {
                    continue;
                };
                let w = if weighted { self.weights[i * n + j] } else { 1.0 };
                expr.constant += w * (1.0 - alpha) * (1.0 - p);
                expr.add_term(
                    w * (alpha * p - (1.0 - alpha) * (1.0 - p)),
                    self.var(i, j),
                );
            }
        }
        Ok(expr)
    }

    /// Modularity of the co-cluster indicator against the similarity graph:
    /// `Σ (p/m - kout·kin/m²)·x` over known pairs.
    fn modularity(&self) -> Result<LinExpr> {
        let n = self.items.len();
        let mut m = 0.0;
        let mut out_strength = vec![0.0; n];
        let mut in_strength = vec![0.0; n];
        for i in 0..n {
            for j in 0..n {
                if let Some(p) = self.similarity[i * n + j] {
                    m += p;
                    out_strength[i] += p;
                    in_strength[j] += p;
                }
            }
        }
        if m <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "similarity",
                message: "modularity objective needs positive total similarity",
            });
        }
        let mut expr = LinExpr::new();
        for i in 0..n {
            for j in 0..n {
                let Some(p) = self.similarity[i * n + j] else {
                    continue;
                };
                expr.add_term(
                    p / m - out_strength[i] * in_strength[j] / (m * m),
                    self.var(i, j),
                );
            }
        }
        Ok(expr)
    }

    fn log_intra_inter(&self, alpha: f64) -> Result<LinExpr> {
        Self::check_alpha(alpha)?;
        const EPS: f64 = 1e-9;
        let n = self.items.len();
        let mut expr = LinExpr::new();
        for i in 0..n {
            for j in 0..n {
                let Some(p) = self.similarity[i * n + j] else {
                    continue;
                };
                let p = p.clamp(EPS, 1.0 - EPS);
                expr.constant += (1.0 - alpha) * (1.0 - p).ln();
                expr.add_term(
                    alpha * p.ln() - (1.0 - alpha) * (1.0 - p).ln(),
                    self.var(i, j),
                );
            }
        }
        Ok(expr)
    }

    /// Serialize the model as LP-format text, for offline inspection.
    pub fn dump_model<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.model.write_lp(w)
    }

    /// Solve with the given backend and decode the assignment.
    ///
    /// A time-limited solve that returns a feasible but unproven assignment
    /// still decodes; the status reports it as such.
    pub fn solve(
        &self,
        backend: &dyn IlpBackend,
        config: &SolveConfig,
    ) -> Result<(Partition, SolveStatus)> {
        let solution = backend.solve(&self.model, config)?;
        log::debug!(
            "solved: objective {}, status {:?}",
            solution.objective,
            solution.status
        );
        let partition = self.decode(&solution.values)?;
        Ok((partition, solution.status))
    }

    /// Decode a variable assignment into a partition.
    ///
    /// Items joined by `x = 1` form connected components; each component is
    /// one cluster. A component with several identity items is a fatal
    /// decode error; one with none gets a freshly minted unknown identity.
    pub fn decode(&self, values: &[f64]) -> Result<Partition> {
        let n = self.items.len();
        if values.len() != n * n {
            return Err(Error::ShapeMismatch {
                expected: format!("{} variables", n * n),
                actual: format!("{}", values.len()),
            });
        }
        let mut components: UnionFind<usize> = UnionFind::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                if values[self.var(i, j)] > 0.5 {
                    components.union(i, j);
                }
            }
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of_root: Vec<Option<usize>> = vec![None; n];
        for i in 0..n {
            let root = components.find(i);
            match group_of_root[root] {
                Some(g) => groups[g].push(i),
                None => {
                    group_of_root[root] = Some(groups.len());
                    groups.push(vec![i]);
                }
            }
        }

        let mut clusters = Vec::with_capacity(groups.len());
        let mut unknown = 0;
        for members in groups {
            let identities: Vec<&str> = members
                .iter()
                .filter_map(|&i| self.items[i].identifier())
                .collect();
            let id = match identities[..] {
                [] => {
                    let id = ClusterId::Unknown(unknown);
                    unknown += 1;
                    id
                }
                [name] => ClusterId::Identity(name.to_owned()),
                _ => {
                    return Err(Error::AmbiguousCluster {
                        identities: identities.len(),
                    })
                }
            };
            clusters.push(Cluster { id, items: members });
        }
        Ok(Partition::new(clusters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ilp::backend::ExhaustiveBackend;
    use crate::ilp::node::{IdentityNode, TrackNode};
    use crate::span::Span;

    fn track(name: &str, start: f64, end: f64) -> Item {
        Item::Track(TrackNode {
            resource: "rec1".into(),
            modality: "speaker".into(),
            segment: Span::new(start, end),
            track: name.into(),
        })
    }

    fn identity(name: &str) -> Item {
        Item::Identity(IdentityNode {
            identifier: name.into(),
        })
    }

    /// Objective 1 evaluated directly on a partition (clusters of indices).
    fn intra_inter_value(
        sim: &dyn Fn(usize, usize) -> Option<f64>,
        n: usize,
        clusters: &[&[usize]],
        alpha: f64,
    ) -> f64 {
        let same = |i: usize, j: usize| {
            clusters
                .iter()
                .any(|c| c.contains(&i) && c.contains(&j))
        };
        let mut total = 0.0;
        for i in 0..n {
            for j in 0..n {
                if let Some(p) = sim(i, j) {
                    let x = if same(i, j) { 1.0 } else { 0.0 };
                    total += alpha * x * p + (1.0 - alpha) * (1.0 - x) * (1.0 - p);
                }
            }
        }
        total
    }

    fn three_item_similarity(i: usize, j: usize) -> Option<f64> {
        // A-B: 0.9, B-C: 0.85, A-C: 0.1
        let (a, b) = (i.min(j), i.max(j));
        match (a, b) {
            _ if i == j => Some(1.0),
            (0, 1) => Some(0.9),
            (1, 2) => Some(0.85),
            (0, 2) => Some(0.1),
            _ => None,
        }
    }

    #[test]
    fn test_three_item_scenario_matches_exhaustive_partition_search() {
        let items = vec![track("a", 0.0, 1.0), track("b", 1.0, 2.0), track("c", 2.0, 3.0)];
        let mut cc = CorrelationClustering::new(items, |x, y| {
            let i = [("a", 0usize), ("b", 1), ("c", 2)]
                .iter()
                .find(|(name, _)| matches!(x, Item::Track(t) if t.track == *name))
                .map(|(_, i)| *i)
                .unwrap();
            let j = [("a", 0usize), ("b", 1), ("c", 2)]
                .iter()
                .find(|(name, _)| matches!(y, Item::Track(t) if t.track == *name))
                .map(|(_, i)| *i)
                .unwrap();
            three_item_similarity(i, j)
        })
        .unwrap();
        cc.set_objective(Objective::IntraInter { alpha: 0.5 }).unwrap();

        let (partition, status) = cc
            .solve(&ExhaustiveBackend::new(), &SolveConfig::default())
            .unwrap();
        assert_eq!(status, SolveStatus::Optimal);

        // all 5 partitions of 3 items, evaluated directly
        let candidates: [&[&[usize]]; 5] = [
            &[&[0, 1, 2]],
            &[&[0, 1], &[2]],
            &[&[0, 2], &[1]],
            &[&[1, 2], &[0]],
            &[&[0], &[1], &[2]],
        ];
        let sim = |i, j| three_item_similarity(i, j);
        let best = candidates
            .iter()
            .map(|c| intra_inter_value(&sim, 3, c, 0.5))
            .fold(f64::NEG_INFINITY, f64::max);
        let expected = intra_inter_value(&sim, 3, &[&[0, 1], &[2]], 0.5);
        assert_eq!(expected, best);

        // and the ILP finds exactly that partition: {A, B} vs {C}
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.cluster_of(0), partition.cluster_of(1));
        assert_ne!(partition.cluster_of(0), partition.cluster_of(2));
    }

    #[test]
    fn test_decoded_assignment_is_an_equivalence_relation() {
        let items = vec![track("a", 0.0, 1.0), track("b", 1.0, 2.0), track("c", 2.0, 3.0)];
        let mut cc = CorrelationClustering::new(items, |x, y| {
            if std::ptr::eq(x, y) {
                return Some(1.0);
            }
            Some(0.7)
        })
        .unwrap();
        cc.set_objective(Objective::IntraInter { alpha: 0.5 }).unwrap();
        let solution = ExhaustiveBackend::new()
            .solve(cc.model(), &SolveConfig::default())
            .unwrap();

        let n = 3;
        let x = |i: usize, j: usize| solution.values[i * n + j];
        for i in 0..n {
            assert_eq!(x(i, i), 1.0);
            for j in 0..n {
                assert_eq!(x(i, j), x(j, i));
                for k in 0..n {
                    assert!(x(i, j) + x(j, k) - x(i, k) <= 1.0 + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_hard_constraints_drive_track_identity_assignment() {
        // T1 is certainly Alice, T2 is certainly not; T1/T2 unknown.
        let items = vec![
            track("t1", 0.0, 1.0),
            track("t2", 1.0, 2.0),
            identity("alice"),
        ];
        let mut cc = CorrelationClustering::heterogeneous(items, |x, y| {
            let key = |item: &Item| match item {
                Item::Track(t) => t.track.clone(),
                Item::Identity(i) => i.identifier.clone(),
            };
            match (key(x).as_str(), key(y).as_str()) {
                (a, b) if a == b => Some(1.0),
                ("t1", "alice") | ("alice", "t1") => Some(1.0),
                ("t2", "alice") | ("alice", "t2") => Some(0.0),
                _ => None,
            }
        })
        .unwrap();
        cc.set_objective(Objective::IntraInter { alpha: 0.5 }).unwrap();

        let (partition, _) = cc
            .solve(&ExhaustiveBackend::new(), &SolveConfig::default())
            .unwrap();
        assert_eq!(partition.len(), 2);
        assert_eq!(
            partition.cluster_of(0),
            Some(&ClusterId::Identity("alice".into()))
        );
        assert_eq!(partition.cluster_of(1), Some(&ClusterId::Unknown(0)));
    }

    #[test]
    fn test_ambiguous_decode_is_fatal() {
        let items = vec![identity("alice"), identity("bob")];
        let cc = CorrelationClustering::new(items, |_, _| Some(1.0)).unwrap();
        // x = 1 everywhere: one cluster holding both identities
        let err = cc.decode(&[1.0, 1.0, 1.0, 1.0]).unwrap_err();
        assert_eq!(err, Error::AmbiguousCluster { identities: 2 });
    }

    #[test]
    fn test_unknown_pairs_are_excluded_from_objective() {
        let items = vec![track("a", 0.0, 1.0), track("b", 1.0, 2.0)];
        let cc = CorrelationClustering::new(items, |_, _| None).unwrap();
        let expr = cc.intra_inter(0.5, false).unwrap();
        assert!(expr.terms.is_empty());
        assert_eq!(expr.constant, 0.0);
    }

    #[test]
    fn test_weighted_objective_scales_with_weights() {
        let items = vec![track("a", 0.0, 1.0), track("b", 1.0, 2.0)];
        let cc = CorrelationClustering::new(items, |_, _| Some(0.8))
            .unwrap()
            .with_weights(|_, _| 2.0);
        let plain = cc.intra_inter(0.5, false).unwrap();
        let weighted = cc.intra_inter(0.5, true).unwrap();
        assert!((weighted.constant - 2.0 * plain.constant).abs() < 1e-12);
        for (p, w) in plain.terms.iter().zip(&weighted.terms) {
            assert_eq!(p.1, w.1);
            assert!((w.0 - 2.0 * p.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_log_objective_clamps_extreme_probabilities() {
        let items = vec![track("a", 0.0, 1.0), track("b", 1.0, 2.0)];
        // similarity 1.0 fixes the pair, but log(1 - p) must still be finite
        let cc = CorrelationClustering::new(items, |_, _| Some(1.0)).unwrap();
        let expr = cc.log_intra_inter(0.5).unwrap();
        assert!(expr.constant.is_finite());
        for &(coef, _) in &expr.terms {
            assert!(coef.is_finite());
        }
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let items = vec![track("a", 0.0, 1.0)];
        let mut cc = CorrelationClustering::new(items, |_, _| Some(0.5)).unwrap();
        assert!(matches!(
            cc.set_objective(Objective::IntraInter { alpha: 1.0 }),
            Err(Error::InvalidParameter { name: "alpha", .. })
        ));
    }

    #[test]
    fn test_modularity_objective_prefers_dense_block() {
        let items = vec![track("a", 0.0, 1.0), track("b", 1.0, 2.0), track("c", 2.0, 3.0)];
        let names = ["a", "b", "c"];
        let index = move |item: &Item| -> usize {
            match item {
                Item::Track(t) => names.iter().position(|n| *n == t.track).unwrap_or(0),
                Item::Identity(_) => 0,
            }
        };
        let mut cc = CorrelationClustering::new(items, |x, y| {
            let (i, j) = (index(x), index(y));
            if i == j {
                return None;
            }
            three_item_similarity(i, j)
        })
        .unwrap();
        cc.set_objective(Objective::Modularity).unwrap();
        let (partition, _) = cc
            .solve(&ExhaustiveBackend::new(), &SolveConfig::default())
            .unwrap();
        // the dense A-B / B-C block splits away from the weak A-C link
        assert!(partition.len() <= 2);
        assert_eq!(partition.cluster_of(0), partition.cluster_of(1));
    }

    #[test]
    fn test_dump_model_renders() {
        let items = vec![track("a", 0.0, 1.0), track("b", 1.0, 2.0)];
        let mut cc = CorrelationClustering::new(items, |_, _| Some(0.5)).unwrap();
        cc.set_objective(Objective::IntraInter { alpha: 0.5 }).unwrap();
        let mut buffer = Vec::new();
        cc.dump_model(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Maximize"));
        assert!(text.contains("Subject To"));
    }
}
