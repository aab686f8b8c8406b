//! Similar-posts cascade tests

use super::{ids, like, post, snapshot};
use crate::scoring::{ScoringPolicy, SimilarityStage, StageOutcome};

#[test]
fn test_unknown_post_has_no_similar_posts() {
    let snapshot = snapshot(vec![post(1, Some("a")), post(2, Some("a"))], Vec::new(), Vec::new());
    assert!(ScoringPolicy::default().similar_posts(&snapshot, 99, 3).is_empty());
}

#[test]
fn test_only_post_has_no_similar_posts() {
    let snapshot = snapshot(vec![post(1, Some("a"))], Vec::new(), Vec::new());
    assert!(ScoringPolicy::default().similar_posts(&snapshot, 1, 3).is_empty());
}

#[test]
fn test_co_interaction_used_above_volume_threshold() {
    let posts = vec![
        post(1, Some("a")),
        post(2, Some("b")),
        post(3, Some("c")),
        post(4, Some("a")),
    ];
    let mut likes = Vec::new();
    for user in 1..=6 {
        likes.push(like(user, 1));
        likes.push(like(user, 2));
    }
    likes.push(like(7, 1));
    likes.push(like(7, 3));
    let snapshot = snapshot(posts, likes, Vec::new());

    let similar = ScoringPolicy::default().similar_posts(&snapshot, 1, 2);

    assert_eq!(ids(&similar), vec![2, 3]);
    assert_eq!(similar[0].score, Some(6.0));
    assert_eq!(similar[1].score, Some(1.0));
}

#[test]
fn test_co_interaction_skipped_below_volume_threshold() {
    let posts = vec![post(1, Some("a")), post(2, Some("b"))];
    let snapshot = snapshot(posts, vec![like(1, 1), like(1, 2)], Vec::new());
    let policy = ScoringPolicy::default();
    let target = snapshot.post(1).unwrap();

    let outcome =
        policy.run_similarity_stage(SimilarityStage::CoInteraction, &snapshot, target, 1, 1);

    assert_eq!(outcome, StageOutcome::Insufficient);
}

#[test]
fn test_feature_vectors_match_same_category() {
    let posts = vec![post(1, Some("tech")), post(2, Some("tech")), post(3, Some("food"))];
    let snapshot = snapshot(posts, Vec::new(), Vec::new());

    let similar = ScoringPolicy::default().similar_posts(&snapshot, 1, 1);

    assert_eq!(ids(&similar), vec![2]);
    assert!((similar[0].score.unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_cascade_falls_through_to_most_recent() {
    let posts = vec![post(1, Some("tech")), post(2, Some("tech")), post(3, Some("food"))];
    let snapshot = snapshot(posts, Vec::new(), Vec::new());

    // Only one post shares anything with post 1, so every earlier stage is short
    let similar = ScoringPolicy::default().similar_posts(&snapshot, 1, 2);

    assert_eq!(ids(&similar), vec![3, 2]);
}

#[test]
fn test_same_category_stage_takes_lowest_ids() {
    let posts = vec![
        post(1, Some("a")),
        post(5, Some("a")),
        post(3, Some("a")),
        post(4, Some("b")),
    ];
    let snapshot = snapshot(posts, Vec::new(), Vec::new());
    let target = snapshot.post(1).unwrap();

    let outcome = ScoringPolicy::default().run_similarity_stage(
        SimilarityStage::SameCategory,
        &snapshot,
        target,
        2,
        2,
    );

    match outcome {
        StageOutcome::Sufficient(similar) => assert_eq!(ids(&similar), vec![3, 5]),
        StageOutcome::Insufficient => panic!("same-category stage should be sufficient"),
    }
}

#[test]
fn test_same_category_stage_needs_a_category() {
    let snapshot = snapshot(vec![post(1, None), post(2, None)], Vec::new(), Vec::new());
    let target = snapshot.post(1).unwrap();

    let outcome = ScoringPolicy::default().run_similarity_stage(
        SimilarityStage::SameCategory,
        &snapshot,
        target,
        1,
        1,
    );

    assert_eq!(outcome, StageOutcome::Insufficient);
}

#[test]
fn test_similar_posts_never_include_target() {
    let posts: Vec<_> = (1..=6).map(|id| post(id, Some("same"))).collect();
    let snapshot = snapshot(posts, Vec::new(), Vec::new());

    let similar = ScoringPolicy::default().similar_posts(&snapshot, 4, 10);

    assert_eq!(similar.len(), 5);
    assert!(similar.iter().all(|s| s.id != 4));
}
