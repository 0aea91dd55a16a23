//! Agglomerative clustering engine.
//!
//! Greedy bottom-up merging over a label-indexed similarity matrix, driven
//! by three injected strategies: a [`SimilarityModel`], a
//! [`ConstraintPolicy`] and a [`StoppingCriterion`].
//!
//! # State machine
//!
//! ```text
//! Idle --init--> Ready --merge--> Merging --(no candidate /
//!                                            criterion fires)--> Stopped
//! ```
//!
//! Each iteration picks, among the legal pairs of live clusters, the pair
//! with maximal similarity, merges it into a fresh cluster, recomputes only
//! the new cluster's row/column, and appends the merge score to an
//! append-only history. Every iteration removes exactly two live clusters
//! and adds one, so termination is guaranteed. Running a stopped engine is
//! a no-op.
//!
//! # Labeling
//!
//! Input labels become leaves `0..n`; the k-th merge mints cluster `n + k`
//! (SciPy-style ids, the same scheme dendrogram steps use). Ties between
//! equal-score candidates are pinned to the smallest `(row, col)` pair in
//! the matrix's current iteration order, which is deterministic.
//!
//! # Complexity
//!
//! The similarity and constraint tables are O(n²) in memory and each sweep
//! for the best pair is O(n²); this is the practical scalability limit.

use std::collections::HashMap;

use crate::clustering::constraint::ConstraintPolicy;
use crate::clustering::model::SimilarityModel;
use crate::clustering::stop::StoppingCriterion;
use crate::error::{Error, Result};
use crate::matrix::LabelMatrix;

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not yet initialized.
    Idle,
    /// Matrix built, constraint initialized, no merge attempted yet.
    Ready,
    /// At least one merge performed.
    Merging,
    /// Terminal: no further merge will happen.
    Stopped,
}

/// One recorded merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Freshly minted cluster id.
    pub new_label: usize,
    /// The two consumed cluster ids.
    pub merged: (usize, usize),
    /// Similarity score that justified the merge.
    pub score: f64,
}

/// Incremental agglomerative clustering engine.
pub struct AgglomerativeClustering<M: SimilarityModel, C, S> {
    model: M,
    constraint: C,
    stop: S,
    state: EngineState,
    n_leaves: usize,
    similarity: LabelMatrix<usize, f64>,
    models: HashMap<usize, M::Model>,
    assignment: Vec<usize>,
    live: Vec<usize>,
    next_id: usize,
    history: Vec<f64>,
    merges: Vec<Merge>,
}

impl<M, C, S> AgglomerativeClustering<M, C, S>
where
    M: SimilarityModel,
    C: ConstraintPolicy,
    S: StoppingCriterion,
{
    /// Create an engine from its three strategies.
    pub fn new(model: M, constraint: C, stop: S) -> Self {
        Self {
            model,
            constraint,
            stop,
            state: EngineState::Idle,
            n_leaves: 0,
            similarity: LabelMatrix::new(f64::NEG_INFINITY),
            models: HashMap::new(),
            assignment: Vec::new(),
            live: Vec::new(),
            next_id: 0,
            history: Vec::new(),
            merges: Vec::new(),
        }
    }

    /// Build the initial state for the given labels: one model and one leaf
    /// cluster per label, the full pairwise similarity matrix, and the
    /// constraint's incremental state.
    pub fn init(&mut self, labels: &[M::Label]) -> Result<()> {
        if labels.is_empty() {
            return Err(Error::EmptyInput);
        }
        let n = labels.len();
        let mut models = HashMap::with_capacity(n);
        for (id, label) in labels.iter().enumerate() {
            models.insert(id, self.model.fit(label)?);
        }

        let mut similarity = LabelMatrix::new(f64::NEG_INFINITY);
        let symmetric = self.model.symmetric();
        for i in 0..n {
            for j in (i + 1)..n {
                let s = self.model.compare(&models[&i], &models[&j])?;
                similarity.set(i, j, s);
                let mirrored = if symmetric {
                    s
                } else {
                    self.model.compare(&models[&j], &models[&i])?
                };
                similarity.set(j, i, mirrored);
            }
        }

        self.n_leaves = n;
        self.models = models;
        self.similarity = similarity;
        self.assignment = (0..n).collect();
        self.live = (0..n).collect();
        self.next_id = n;
        self.history.clear();
        self.merges.clear();
        self.constraint.init(&self.live, &self.similarity)?;
        self.state = EngineState::Ready;
        Ok(())
    }

    /// Run the merge loop to completion.
    ///
    /// A no-op when the engine is already stopped; an error when it was
    /// never initialized.
    pub fn run(&mut self) -> Result<()> {
        match self.state {
            EngineState::Idle => return Err(Error::NotInitialized),
            EngineState::Stopped => return Ok(()),
            EngineState::Ready | EngineState::Merging => {}
        }
        loop {
            let Some((a, b, score)) = self.best_candidate() else {
                log::debug!("no legal merge candidate left, stopping");
                self.state = EngineState::Stopped;
                return Ok(());
            };
            if self.stop.should_stop(score) {
                log::debug!("stopping criterion fired at score {score}");
                self.state = EngineState::Stopped;
                return Ok(());
            }
            self.merge(a, b, score)?;
        }
    }

    /// Convenience: `init` followed by `run`, returning the clusters.
    pub fn fit(&mut self, labels: &[M::Label]) -> Result<Vec<Vec<usize>>> {
        self.init(labels)?;
        self.run()?;
        Ok(self.clusters())
    }

    /// Best legal pair: maximal similarity, ties pinned to the smallest
    /// `(row, col)` in iteration order.
    fn best_candidate(&self) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (&a, &b, &s) in self.similarity.iter_pairs() {
            if a == b || !s.is_finite() || !self.constraint.allows(a, b) {
                continue;
            }
            let replace = match best {
                None => true,
                Some((ba, bb, bs)) => s > bs || (s == bs && (a, b) < (ba, bb)),
            };
            if replace {
                best = Some((a, b, s));
            }
        }
        best
    }

    fn merge(&mut self, a: usize, b: usize, score: f64) -> Result<()> {
        let new_label = self.next_id;
        self.next_id += 1;
        log::debug!("merging {a} and {b} into {new_label} (score {score})");

        let merged_model = {
            let ma = self.models.get(&a).ok_or_else(|| missing_model(a))?;
            let mb = self.models.get(&b).ok_or_else(|| missing_model(b))?;
            self.model.merge(&[ma, mb])?
        };
        self.models.remove(&a);
        self.models.remove(&b);
        self.similarity.remove_row(&a);
        self.similarity.remove_col(&a);
        self.similarity.remove_row(&b);
        self.similarity.remove_col(&b);
        self.live.retain(|&l| l != a && l != b);

        // only the new cluster's row/column is recomputed
        let symmetric = self.model.symmetric();
        for k in self.live.clone() {
            let other = self.models.get(&k).ok_or_else(|| missing_model(k))?;
            let s = self.model.compare(&merged_model, other)?;
            self.similarity.set(new_label, k, s);
            let mirrored = if symmetric {
                s
            } else {
                self.model.compare(other, &merged_model)?
            };
            self.similarity.set(k, new_label, mirrored);
        }

        self.models.insert(new_label, merged_model);
        self.live.push(new_label);
        for cluster in self.assignment.iter_mut() {
            if *cluster == a || *cluster == b {
                *cluster = new_label;
            }
        }
        self.constraint
            .on_merge(new_label, &[a, b], &self.live, &self.similarity)?;
        self.history.push(score);
        self.merges.push(Merge {
            new_label,
            merged: (a, b),
            score,
        });
        self.state = EngineState::Merging;
        Ok(())
    }

    /// Current engine state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Live cluster ids.
    pub fn live_labels(&self) -> &[usize] {
        &self.live
    }

    /// Cluster id per input label, by input position.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    /// Groups of input-label positions, one per live cluster, ordered by
    /// smallest member.
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut by_cluster: HashMap<usize, Vec<usize>> = HashMap::new();
        for (leaf, &cluster) in self.assignment.iter().enumerate() {
            by_cluster.entry(cluster).or_default().push(leaf);
        }
        let mut clusters: Vec<Vec<usize>> = by_cluster.into_values().collect();
        clusters.sort_by_key(|members| members[0]);
        clusters
    }

    /// Append-only merge-score history.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Recorded merges, in order.
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Current similarity matrix (live clusters on both axes).
    pub fn similarity(&self) -> &LabelMatrix<usize, f64> {
        &self.similarity
    }
}

fn missing_model(label: usize) -> Error {
    Error::Other(format!("no model for live cluster {label}"))
}
