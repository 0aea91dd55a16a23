//! Items of the correlation-clustering problem.
//!
//! Two kinds of item coexist: a [`TrackNode`] is a time-indexed observation
//! in some modality (a speech turn, a face track), an [`IdentityNode`] is a
//! named real-world identity. Items are created once per problem instance
//! and only ever grouped, never mutated.

use crate::span::Span;

/// A time-indexed observation in one recording modality.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackNode {
    /// Recording resource (uri).
    pub resource: String,
    /// Modality of the observation (e.g. "speaker", "head", "written").
    pub modality: String,
    /// Time span covered by the track.
    pub segment: Span,
    /// Track name within the segment.
    pub track: String,
}

/// A named real-world identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityNode {
    /// Identity name.
    pub identifier: String,
}

/// A clusterable item: either a track or an identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Time-indexed observation.
    Track(TrackNode),
    /// Named identity.
    Identity(IdentityNode),
}

impl Item {
    /// Is this an identity item?
    pub fn is_identity(&self) -> bool {
        matches!(self, Item::Identity(_))
    }

    /// The identity name, when this is an identity item.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Item::Identity(node) => Some(&node.identifier),
            Item::Track(_) => None,
        }
    }
}

/// Cluster identifier in a decoded partition: inherited from the unique
/// identity item in the cluster, or freshly minted when none is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClusterId {
    /// Cluster anchored to a named identity.
    Identity(String),
    /// Cluster with no identity item; the index is mint order.
    Unknown(usize),
}

/// One decoded cluster: its identifier and its member item indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Cluster identifier.
    pub id: ClusterId,
    /// Member items, as indices into the problem's item list.
    pub items: Vec<usize>,
}

/// A partition of the problem's items into clusters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    clusters: Vec<Cluster>,
}

impl Partition {
    pub(crate) fn new(clusters: Vec<Cluster>) -> Self {
        Self { clusters }
    }

    /// The clusters, ordered by smallest member index.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// True when there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Cluster id of the given item index, if the item is known.
    pub fn cluster_of(&self, item: usize) -> Option<&ClusterId> {
        self.clusters
            .iter()
            .find(|c| c.items.contains(&item))
            .map(|c| &c.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kinds() {
        let track = Item::Track(TrackNode {
            resource: "rec1".into(),
            modality: "speaker".into(),
            segment: Span::new(0.0, 1.0),
            track: "t0".into(),
        });
        let identity = Item::Identity(IdentityNode {
            identifier: "alice".into(),
        });
        assert!(!track.is_identity());
        assert!(identity.is_identity());
        assert_eq!(identity.identifier(), Some("alice"));
        assert_eq!(track.identifier(), None);
    }

    #[test]
    fn test_partition_lookup() {
        let partition = Partition::new(vec![
            Cluster {
                id: ClusterId::Identity("alice".into()),
                items: vec![0, 2],
            },
            Cluster {
                id: ClusterId::Unknown(0),
                items: vec![1],
            },
        ]);
        assert_eq!(partition.len(), 2);
        assert_eq!(
            partition.cluster_of(2),
            Some(&ClusterId::Identity("alice".into()))
        );
        assert_eq!(partition.cluster_of(1), Some(&ClusterId::Unknown(0)));
        assert_eq!(partition.cluster_of(9), None);
    }
}
