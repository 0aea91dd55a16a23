use std::collections::HashMap;

use idem::{
    AgglomerativeClustering, CentroidModel, ContiguityConstraint, Coverage, EngineState,
    NoConstraint, Span, ThresholdStop,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn embeddings(points: &[(&str, [f64; 2])]) -> HashMap<String, Vec<f64>> {
    points
        .iter()
        .map(|(name, p)| (name.to_string(), p.to_vec()))
        .collect()
}

#[test]
fn test_two_speaker_pipeline() {
    init_logging();

    // two tight groups on nearly opposite directions
    let model = CentroidModel::new(embeddings(&[
        ("s0_a", [1.0, 0.0]),
        ("s0_b", [0.98, 0.05]),
        ("s1_a", [0.0, 1.0]),
        ("s1_b", [0.05, 0.97]),
    ]));
    let mut engine = AgglomerativeClustering::new(model, NoConstraint, ThresholdStop::new(0.5));
    let labels: Vec<String> = ["s0_a", "s0_b", "s1_a", "s1_b"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let clusters = engine.fit(&labels).unwrap();

    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(clusters.len(), 2);
    // leaves 0/1 end up together, as do 2/3
    assert_eq!(clusters[0], vec![0, 1]);
    assert_eq!(clusters[1], vec![2, 3]);
}

#[test]
fn test_contiguity_keeps_separated_speech_apart() {
    init_logging();

    // near-identical embeddings, but the spans never come close in time
    let model = CentroidModel::new(embeddings(&[
        ("early", [1.0, 0.0]),
        ("late", [0.99, 0.01]),
    ]));
    let coverages = vec![
        Coverage::new(vec![Span::new(0.0, 1.0)]),
        Coverage::new(vec![Span::new(100.0, 101.0)]),
    ];
    let mut engine = AgglomerativeClustering::new(
        model,
        ContiguityConstraint::new(1.0, coverages),
        ThresholdStop::new(0.5),
    );
    let labels = vec!["early".to_string(), "late".to_string()];
    let clusters = engine.fit(&labels).unwrap();

    // the constraint vetoes the only candidate merge
    assert_eq!(clusters, vec![vec![0], vec![1]]);
}

#[test]
fn test_merge_history_is_monotone_under_centroid_model() {
    init_logging();

    let model = CentroidModel::new(embeddings(&[
        ("a", [1.0, 0.0]),
        ("b", [0.9, 0.1]),
        ("c", [0.8, 0.2]),
        ("d", [0.0, 1.0]),
    ]));
    let mut engine = AgglomerativeClustering::new(model, NoConstraint, ThresholdStop::new(0.3));
    let labels: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    engine.fit(&labels).unwrap();

    let merges = engine.merges();
    assert!(!merges.is_empty());
    // greedy agglomeration picks scores in non-increasing order here
    for pair in merges.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(engine.history().len(), merges.len());
}
