//! Similarity models.
//!
//! A [`SimilarityModel`] knows how to summarize one label into a model, how
//! similar two models are (higher is more similar, possibly asymmetric), and
//! how to combine the models of merged labels into one. The required methods
//! make the contract compile-time checked; there is no runtime
//! "not implemented" path.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{Error, Result};
use crate::matrix::LabelMatrix;

/// Pluggable similarity strategy for agglomerative clustering.
pub trait SimilarityModel {
    /// Clusterable unit identifier.
    type Label;
    /// Per-cluster summary produced by [`fit`](SimilarityModel::fit).
    type Model;

    /// Build the model for a single label.
    fn fit(&self, label: &Self::Label) -> Result<Self::Model>;

    /// Is [`compare`](SimilarityModel::compare) symmetric?
    fn symmetric(&self) -> bool {
        false
    }

    /// Similarity between two models; higher means more similar.
    fn compare(&self, a: &Self::Model, b: &Self::Model) -> Result<f64>;

    /// Combine the models of a set of merged labels into one.
    fn merge(&self, models: &[&Self::Model]) -> Result<Self::Model>;

    /// Pairwise similarity matrix over `labels`.
    ///
    /// Fits one model per label, then fills the matrix. When the model is
    /// symmetric only one triangle is computed and mirrored. Unset entries
    /// (the diagonal) keep the `-inf` default.
    fn similarity_matrix(&self, labels: &[Self::Label]) -> Result<LabelMatrix<Self::Label, f64>>
    where
        Self::Label: Clone + Eq + Hash + Ord,
    {
        if labels.is_empty() {
            return Err(Error::EmptyInput);
        }
        let models: Vec<Self::Model> = labels
            .iter()
            .map(|l| self.fit(l))
            .collect::<Result<Vec<_>>>()?;
        let mut matrix = LabelMatrix::new(f64::NEG_INFINITY);
        for i in 0..labels.len() {
            for j in (i + 1)..labels.len() {
                let s = self.compare(&models[i], &models[j])?;
                matrix.set(labels[i].clone(), labels[j].clone(), s);
                let mirrored = if self.symmetric() {
                    s
                } else {
                    self.compare(&models[j], &models[i])?
                };
                matrix.set(labels[j].clone(), labels[i].clone(), mirrored);
            }
        }
        Ok(matrix)
    }
}

/// Centroid summary: running sum of embeddings plus a count.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    sum: Vec<f64>,
    count: usize,
}

impl Centroid {
    /// Mean embedding of the cluster.
    pub fn mean(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        self.sum.iter().map(|v| v / n).collect()
    }
}

/// Cosine similarity between cluster centroids.
///
/// Each label carries an embedding vector; a merged cluster is summarized by
/// the weighted centroid of its members. Comparison is symmetric.
#[derive(Debug, Clone)]
pub struct CentroidModel<L> {
    embeddings: HashMap<L, Vec<f64>>,
}

impl<L: Eq + Hash> CentroidModel<L> {
    /// Create a model from per-label embeddings.
    pub fn new(embeddings: HashMap<L, Vec<f64>>) -> Self {
        Self { embeddings }
    }
}

impl<L> SimilarityModel for CentroidModel<L>
where
    L: Eq + Hash + fmt::Debug,
{
    type Label = L;
    type Model = Centroid;

    fn fit(&self, label: &L) -> Result<Centroid> {
        let sum = self.embeddings.get(label).ok_or_else(|| Error::MissingData {
            what: format!("embedding for label {label:?}"),
        })?;
        Ok(Centroid {
            sum: sum.clone(),
            count: 1,
        })
    }

    fn symmetric(&self) -> bool {
        true
    }

    fn compare(&self, a: &Centroid, b: &Centroid) -> Result<f64> {
        let (ma, mb) = (a.mean(), b.mean());
        if ma.len() != mb.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{}", ma.len()),
                actual: format!("{}", mb.len()),
            });
        }
        let dot: f64 = ma.iter().zip(&mb).map(|(x, y)| x * y).sum();
        let na: f64 = ma.iter().map(|x| x * x).sum::<f64>().sqrt();
        let nb: f64 = mb.iter().map(|x| x * x).sum::<f64>().sqrt();
        if na == 0.0 || nb == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (na * nb))
    }

    fn merge(&self, models: &[&Centroid]) -> Result<Centroid> {
        let Some(first) = models.first() else {
            return Err(Error::EmptyInput);
        };
        let dim = first.sum.len();
        let mut sum = vec![0.0; dim];
        let mut count = 0;
        for m in models {
            if m.sum.len() != dim {
                return Err(Error::ShapeMismatch {
                    expected: format!("{dim}"),
                    actual: format!("{}", m.sum.len()),
                });
            }
            for (acc, v) in sum.iter_mut().zip(&m.sum) {
                *acc += v;
            }
            count += m.count;
        }
        Ok(Centroid { sum, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CentroidModel<&'static str> {
        let mut embeddings = HashMap::new();
        embeddings.insert("a", vec![1.0, 0.0]);
        embeddings.insert("b", vec![1.0, 0.0]);
        embeddings.insert("c", vec![0.0, 1.0]);
        CentroidModel::new(embeddings)
    }

    #[test]
    fn test_fit_missing_label() {
        let err = model().fit(&"zzz").unwrap_err();
        assert!(matches!(err, Error::MissingData { .. }));
    }

    #[test]
    fn test_compare_cosine() {
        let m = model();
        let a = m.fit(&"a").unwrap();
        let b = m.fit(&"b").unwrap();
        let c = m.fit(&"c").unwrap();
        assert!((m.compare(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!(m.compare(&a, &c).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_merge_weighted_centroid() {
        let m = model();
        let a = m.fit(&"a").unwrap();
        let c = m.fit(&"c").unwrap();
        let merged = m.merge(&[&a, &c]).unwrap();
        assert_eq!(merged.mean(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_similarity_matrix_mirrors_symmetric_half() {
        let m = model();
        let matrix = m.similarity_matrix(&["a", "b", "c"]).unwrap();
        assert_eq!(matrix.shape(), (3, 3));
        assert_eq!(matrix.get(&"a", &"b"), matrix.get(&"b", &"a"));
        // diagonal was never computed
        assert_eq!(matrix.get(&"a", &"a"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_similarity_matrix_empty_input() {
        let labels: [&str; 0] = [];
        assert!(matches!(
            model().similarity_matrix(&labels),
            Err(Error::EmptyInput)
        ));
    }
}
