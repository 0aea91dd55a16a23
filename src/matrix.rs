//! Label-indexed pairwise matrix.
//!
//! [`LabelMatrix`] is a growable 2-D table indexed by arbitrary hashable
//! labels on each axis, with a default value returned for any pair that was
//! never set. It is the bookkeeping structure behind every similarity and
//! constraint table in this crate:
//!
//! - similarity between clusters (`LabelMatrix<usize, f64>`)
//! - merge legality between clusters (`LabelMatrix<usize, bool>`)
//!
//! # Storage
//!
//! Rows live in an arena of `Vec`s with a stable label→index map per axis.
//! Setting a value for an unseen label appends a row/column initialized to
//! the default everywhere else, so the shape is always `(|rows|, |cols|)`.
//! Deleting a row or column compacts by **swap-and-shrink**: the last
//! row/column moves into the hole and the index maps are patched. Axis order
//! after a deletion is therefore unspecified, but always deterministic.
//!
//! # Tie handling
//!
//! [`LabelMatrix::argmax_rows`] returns, per row, the column labels attaining
//! the row maximum. Ties are pinned to a deterministic order: tied labels are
//! sorted, and [`Ties::Any`] keeps the smallest. An optional threshold turns
//! rows whose maximum does not strictly beat it into empty sets.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use ndarray::Array2;

use crate::error::{Error, Result};

/// Tie handling for the arg-extremum queries: keep every tied label, or
/// exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ties {
    /// Return every label attaining the extremum.
    All,
    /// Return a single label (the smallest among the tied ones).
    Any,
}

/// 2-D matrix indexed by labels on both axes, with a default fill value.
#[derive(Debug, Clone)]
pub struct LabelMatrix<L, V> {
    ilabels: Vec<L>,
    jlabels: Vec<L>,
    label2i: HashMap<L, usize>,
    label2j: HashMap<L, usize>,
    rows: Vec<Vec<V>>,
    default: V,
}

/// Equality compares the visible content: label order on both axes, the
/// value block and the default. The label→index maps are derived from the
/// label vectors and carry no extra information.
impl<L: PartialEq, V: PartialEq> PartialEq for LabelMatrix<L, V> {
    fn eq(&self, other: &Self) -> bool {
        self.ilabels == other.ilabels
            && self.jlabels == other.jlabels
            && self.rows == other.rows
            && self.default == other.default
    }
}

impl<L, V> LabelMatrix<L, V>
where
    L: Clone + Eq + Hash + Ord,
    V: Clone,
{
    /// Create an empty matrix with the given default value.
    pub fn new(default: V) -> Self {
        Self {
            ilabels: Vec::new(),
            jlabels: Vec::new(),
            label2i: HashMap::new(),
            label2j: HashMap::new(),
            rows: Vec::new(),
            default,
        }
    }

    /// Create a matrix from explicit label lists and a dense value block.
    ///
    /// The block shape must agree with the label lists, and labels must be
    /// unique within their axis; anything else is a fatal configuration
    /// error.
    pub fn from_array(
        ilabels: Vec<L>,
        jlabels: Vec<L>,
        values: Array2<V>,
        default: V,
    ) -> Result<Self> {
        if values.nrows() != ilabels.len() || values.ncols() != jlabels.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} x {}", ilabels.len(), jlabels.len()),
                actual: format!("{} x {}", values.nrows(), values.ncols()),
            });
        }
        let label2i: HashMap<L, usize> = ilabels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        let label2j: HashMap<L, usize> = jlabels
            .iter()
            .enumerate()
            .map(|(j, l)| (l.clone(), j))
            .collect();
        if label2i.len() != ilabels.len() {
            return Err(Error::InvalidParameter {
                name: "ilabels",
                message: "row labels must be unique",
            });
        }
        if label2j.len() != jlabels.len() {
            return Err(Error::InvalidParameter {
                name: "jlabels",
                message: "column labels must be unique",
            });
        }
        let rows = values.outer_iter().map(|r| r.to_vec()).collect();
        Ok(Self {
            ilabels,
            jlabels,
            label2i,
            label2j,
            rows,
            default,
        })
    }

    /// Export the current values as a dense `ndarray` block, in axis order.
    pub fn to_array(&self) -> Array2<V> {
        Array2::from_shape_fn((self.ilabels.len(), self.jlabels.len()), |(i, j)| {
            self.rows[i][j].clone()
        })
    }

    /// Matrix shape, `(|rows|, |cols|)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ilabels.len(), self.jlabels.len())
    }

    /// True when no value was ever set.
    pub fn is_empty(&self) -> bool {
        self.ilabels.is_empty() && self.jlabels.is_empty()
    }

    /// The default value returned for unset pairs.
    pub fn default_value(&self) -> V {
        self.default.clone()
    }

    /// Row labels, in current axis order.
    pub fn row_labels(&self) -> &[L] {
        &self.ilabels
    }

    /// Column labels, in current axis order.
    pub fn col_labels(&self) -> &[L] {
        &self.jlabels
    }

    /// Value at `(i, j)`, or the default when either label is unknown.
    pub fn get(&self, i: &L, j: &L) -> V {
        match (self.label2i.get(i), self.label2j.get(j)) {
            (Some(&r), Some(&c)) => self.rows[r][c].clone(),
            _ => self.default.clone(),
        }
    }

    /// Set the value at `(i, j)`, appending a new row and/or column filled
    /// with the default when the labels are unseen.
    pub fn set(&mut self, i: L, j: L, value: V) {
        let r = match self.label2i.get(&i) {
            Some(&r) => r,
            None => {
                let r = self.ilabels.len();
                self.ilabels.push(i.clone());
                self.label2i.insert(i, r);
                self.rows.push(vec![self.default.clone(); self.jlabels.len()]);
                r
            }
        };
        let c = match self.label2j.get(&j) {
            Some(&c) => c,
            None => {
                let c = self.jlabels.len();
                self.jlabels.push(j.clone());
                self.label2j.insert(j, c);
                for row in &mut self.rows {
                    row.push(self.default.clone());
                }
                c
            }
        };
        self.rows[r][c] = value;
    }

    /// Remove a row by label. Returns false when the label is unknown.
    ///
    /// Compacts by swap-and-shrink: the last row moves into the hole.
    pub fn remove_row(&mut self, label: &L) -> bool {
        let Some(r) = self.label2i.remove(label) else {
            return false;
        };
        self.ilabels.swap_remove(r);
        self.rows.swap_remove(r);
        if r < self.ilabels.len() {
            self.label2i.insert(self.ilabels[r].clone(), r);
        }
        true
    }

    /// Remove a column by label. Returns false when the label is unknown.
    pub fn remove_col(&mut self, label: &L) -> bool {
        let Some(c) = self.label2j.remove(label) else {
            return false;
        };
        self.jlabels.swap_remove(c);
        for row in &mut self.rows {
            row.swap_remove(c);
        }
        if c < self.jlabels.len() {
            self.label2j.insert(self.jlabels[c].clone(), c);
        }
        true
    }

    /// Transposed copy of the matrix.
    pub fn transpose(&self) -> LabelMatrix<L, V> {
        let (n, m) = self.shape();
        let mut rows = vec![vec![self.default.clone(); n]; m];
        for (r, row) in self.rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                rows[c][r] = v.clone();
            }
        }
        LabelMatrix {
            ilabels: self.jlabels.clone(),
            jlabels: self.ilabels.clone(),
            label2i: self.label2j.clone(),
            label2j: self.label2i.clone(),
            rows,
            default: self.default.clone(),
        }
    }

    /// Iterate over every `(row label, column label, value)` triple.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&L, &L, &V)> + '_ {
        self.ilabels.iter().enumerate().flat_map(move |(r, il)| {
            self.jlabels
                .iter()
                .enumerate()
                .map(move |(c, jl)| (il, jl, &self.rows[r][c]))
        })
    }
}

impl<L, V> LabelMatrix<L, V>
where
    L: Clone + Eq + Hash + Ord,
    V: Clone + PartialEq + std::ops::AddAssign,
{
    /// Accumulate another matrix into this one, element-wise.
    ///
    /// Pairs absent from `self` start at the default value. A differing
    /// default on `other` is suspicious and gets logged.
    pub fn merge_add(&mut self, other: &LabelMatrix<L, V>) {
        if self.default != other.default {
            log::warn!("merge_add: incompatible default values, keeping ours");
        }
        for (i, j, v) in other.iter_pairs() {
            let mut current = self.get(i, j);
            current += v.clone();
            self.set(i.clone(), j.clone(), current);
        }
    }
}

impl<L, V> LabelMatrix<L, V>
where
    L: Clone + Eq + Hash + Ord,
    V: Clone + PartialOrd,
{
    /// Per-row argmax: for every row label, the column labels attaining the
    /// row maximum (sorted).
    ///
    /// With a threshold, rows whose maximum does not strictly exceed it
    /// yield an empty set. [`Ties::Any`] keeps only the smallest tied label.
    pub fn argmax_rows(&self, threshold: Option<V>, ties: Ties) -> HashMap<L, Vec<L>> {
        self.extremum_rows(threshold, ties, false)
    }

    /// Per-column argmax; the columnwise dual of [`argmax_rows`].
    ///
    /// [`argmax_rows`]: LabelMatrix::argmax_rows
    pub fn argmax_cols(&self, threshold: Option<V>, ties: Ties) -> HashMap<L, Vec<L>> {
        self.transpose().extremum_rows(threshold, ties, false)
    }

    /// Per-row argmin. With a threshold, rows whose minimum is not strictly
    /// below it yield an empty set.
    pub fn argmin_rows(&self, threshold: Option<V>, ties: Ties) -> HashMap<L, Vec<L>> {
        self.extremum_rows(threshold, ties, true)
    }

    /// Per-column argmin.
    pub fn argmin_cols(&self, threshold: Option<V>, ties: Ties) -> HashMap<L, Vec<L>> {
        self.transpose().extremum_rows(threshold, ties, true)
    }

    /// Global argmax: all `(row, col)` pairs attaining the matrix maximum,
    /// sorted. Empty when the matrix is empty or the maximum does not
    /// strictly exceed the threshold.
    pub fn argmax_global(&self, threshold: Option<V>) -> Vec<(L, L)> {
        self.extremum_global(threshold, false)
    }

    /// Global argmin.
    pub fn argmin_global(&self, threshold: Option<V>) -> Vec<(L, L)> {
        self.extremum_global(threshold, true)
    }

    fn better(a: &V, b: &V, minimize: bool) -> bool {
        match a.partial_cmp(b) {
            Some(ord) => {
                if minimize {
                    ord == std::cmp::Ordering::Less
                } else {
                    ord == std::cmp::Ordering::Greater
                }
            }
            None => false,
        }
    }

    fn extremum_rows(
        &self,
        threshold: Option<V>,
        ties: Ties,
        minimize: bool,
    ) -> HashMap<L, Vec<L>> {
        let mut out = HashMap::new();
        for (r, il) in self.ilabels.iter().enumerate() {
            let row = &self.rows[r];
            let mut best: Option<&V> = None;
            for v in row {
                if best.is_none() || Self::better(v, best.unwrap_or(v), minimize) {
                    best = Some(v);
                }
            }
            let mut tied: Vec<L> = Vec::new();
            if let Some(best) = best {
                let beats = match &threshold {
                    // Strict: a maximum equal to the threshold is not enough.
                    Some(t) => Self::better(best, t, minimize),
                    None => true,
                };
                if beats {
                    tied = self
                        .jlabels
                        .iter()
                        .enumerate()
                        .filter(|(c, _)| row[*c] == *best)
                        .map(|(_, jl)| jl.clone())
                        .collect();
                    tied.sort();
                    if ties == Ties::Any {
                        tied.truncate(1);
                    }
                }
            }
            out.insert(il.clone(), tied);
        }
        out
    }

    fn extremum_global(&self, threshold: Option<V>, minimize: bool) -> Vec<(L, L)> {
        let mut best: Option<&V> = None;
        for row in &self.rows {
            for v in row {
                if best.is_none() || Self::better(v, best.unwrap_or(v), minimize) {
                    best = Some(v);
                }
            }
        }
        let Some(best) = best else {
            return Vec::new();
        };
        if let Some(t) = &threshold {
            if !Self::better(best, t, minimize) {
                return Vec::new();
            }
        }
        let mut pairs: Vec<(L, L)> = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                if *v == *best {
                    pairs.push((self.ilabels[r].clone(), self.jlabels[c].clone()));
                }
            }
        }
        pairs.sort();
        pairs
    }
}

/// Fixed-width text rendering, for debugging and tests: a row-label column,
/// a header of column labels, one line of `%.2f` values per row.
impl<L> fmt::Display for LabelMatrix<L, f64>
where
    L: Clone + Eq + Hash + Ord + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inames: Vec<String> = self.ilabels.iter().map(|l| l.to_string()).collect();
        let jnames: Vec<String> = self.jlabels.iter().map(|l| l.to_string()).collect();
        let wi = inames.iter().map(|s| s.len()).max().unwrap_or(0);
        let wj = jnames.iter().map(|s| s.len()).max().unwrap_or(0).max(4);

        write!(f, "{:>wi$}", "", wi = wi)?;
        for name in &jnames {
            write!(f, " {:>wj$}", name, wj = wj)?;
        }
        for (r, name) in inames.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{:>wi$}", name, wi = wi)?;
            for v in &self.rows[r] {
                write!(f, " {:>wj$.2}", v, wj = wj)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_get_returns_default_for_unset() {
        let m: LabelMatrix<&str, f64> = LabelMatrix::new(-1.0);
        assert_eq!(m.get(&"a", &"b"), -1.0);
        assert_eq!(m.shape(), (0, 0));
    }

    #[test]
    fn test_set_grows_lazily() {
        let mut m = LabelMatrix::new(0.0);
        m.set("a", "x", 1.0);
        assert_eq!(m.shape(), (1, 1));
        m.set("b", "y", 2.0);
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.get(&"a", &"x"), 1.0);
        assert_eq!(m.get(&"b", &"y"), 2.0);
        // unset corners fall back to the default
        assert_eq!(m.get(&"a", &"y"), 0.0);
        assert_eq!(m.get(&"b", &"x"), 0.0);
    }

    #[test]
    fn test_from_array_shape_mismatch() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let err = LabelMatrix::from_array(vec!["a"], vec!["x", "y"], values, 0.0).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_from_array_duplicate_labels() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let err = LabelMatrix::from_array(vec!["a", "a"], vec!["x", "y"], values, 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_transpose_involution() {
        let values = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let m = LabelMatrix::from_array(vec!["a", "b"], vec!["x", "y", "z"], values, 0.0).unwrap();
        assert_eq!(m.transpose().transpose(), m);
        assert_eq!(m.transpose().get(&"y", &"b"), 5.0);
    }

    #[test]
    fn test_argmax_rows_threshold_and_ties() {
        let values = array![[0.5, 0.9, 0.9], [0.1, 0.2, 0.3]];
        let m = LabelMatrix::from_array(vec!["a", "b"], vec!["x", "y", "z"], values, 0.0).unwrap();

        let all = m.argmax_rows(None, Ties::All);
        assert_eq!(all[&"a"], vec!["y", "z"]);
        assert_eq!(all[&"b"], vec!["z"]);

        let any = m.argmax_rows(None, Ties::Any);
        assert_eq!(any[&"a"], vec!["y"]);

        // the row maximum must strictly exceed the threshold
        let thresholded = m.argmax_rows(Some(0.9), Ties::All);
        assert!(thresholded[&"a"].is_empty());
        assert!(thresholded[&"b"].is_empty());
        let thresholded = m.argmax_rows(Some(0.25), Ties::All);
        assert_eq!(thresholded[&"a"], vec!["y", "z"]);
        assert_eq!(thresholded[&"b"], vec!["z"]);
    }

    #[test]
    fn test_argmin_rows() {
        let values = array![[0.5, 0.9], [0.1, 0.2]];
        let m = LabelMatrix::from_array(vec!["a", "b"], vec!["x", "y"], values, 0.0).unwrap();
        let mins = m.argmin_rows(None, Ties::All);
        assert_eq!(mins[&"a"], vec!["x"]);
        assert_eq!(mins[&"b"], vec!["x"]);
        // the row minimum must fall strictly below the threshold
        let mins = m.argmin_rows(Some(0.1), Ties::All);
        assert!(mins[&"b"].is_empty());
    }

    #[test]
    fn test_argmax_global() {
        let values = array![[0.5, 0.9], [0.9, 0.2]];
        let m = LabelMatrix::from_array(vec!["a", "b"], vec!["x", "y"], values, 0.0).unwrap();
        assert_eq!(m.argmax_global(None), vec![("a", "y"), ("b", "x")]);
        assert!(m.argmax_global(Some(0.9)).is_empty());
    }

    #[test]
    fn test_remove_row_and_col_keep_maps_consistent() {
        let mut m = LabelMatrix::new(0.0);
        for (i, il) in ["a", "b", "c"].iter().enumerate() {
            for (j, jl) in ["x", "y", "z"].iter().enumerate() {
                m.set(*il, *jl, (i * 3 + j) as f64);
            }
        }
        assert!(m.remove_row(&"a"));
        assert!(m.remove_col(&"y"));
        assert!(!m.remove_row(&"a"));
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.get(&"b", &"x"), 3.0);
        assert_eq!(m.get(&"c", &"z"), 8.0);
        // removed labels fall back to the default
        assert_eq!(m.get(&"a", &"x"), 0.0);
        assert_eq!(m.get(&"b", &"y"), 0.0);
    }

    #[test]
    fn test_equality_compares_visible_content() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let a = LabelMatrix::from_array(vec!["a", "b"], vec!["x", "y"], values, 0.0).unwrap();
        // same content built cell by cell
        let mut b = LabelMatrix::new(0.0);
        b.set("a", "x", 1.0);
        b.set("a", "y", 2.0);
        b.set("b", "x", 3.0);
        b.set("b", "y", 4.0);
        assert_eq!(a, b);

        let mut c = b.clone();
        c.set("a", "x", 9.0);
        assert_ne!(a, c);
        // differing defaults are a visible difference too
        let d: LabelMatrix<&str, f64> = LabelMatrix::new(0.0);
        let e: LabelMatrix<&str, f64> = LabelMatrix::new(-1.0);
        assert_ne!(d, e);
    }

    #[test]
    fn test_merge_add() {
        let mut m = LabelMatrix::new(0.0);
        m.set("a", "x", 1.0);
        let mut other = LabelMatrix::new(0.0);
        other.set("a", "x", 2.0);
        other.set("b", "x", 5.0);
        m.merge_add(&other);
        assert_eq!(m.get(&"a", &"x"), 3.0);
        assert_eq!(m.get(&"b", &"x"), 5.0);
    }

    #[test]
    fn test_display_fixed_width() {
        let values = array![[1.0, 2.5]];
        let m = LabelMatrix::from_array(vec!["row"], vec!["x", "long"], values, 0.0).unwrap();
        let s = m.to_string();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("long"));
        assert!(lines[1].starts_with("row"));
        assert!(lines[1].contains("1.00"));
        assert!(lines[1].contains("2.50"));
    }

    #[test]
    fn test_iter_pairs() {
        let values = array![[1.0, 2.0]];
        let m = LabelMatrix::from_array(vec!["a"], vec!["x", "y"], values, 0.0).unwrap();
        let pairs: Vec<(&str, &str, f64)> = m.iter_pairs().map(|(i, j, v)| (*i, *j, *v)).collect();
        assert_eq!(pairs, vec![("a", "x", 1.0), ("a", "y", 2.0)]);
    }
}
