//! Cosine similarity search over stored embeddings
//!
//! A linear scan; the store is small enough that no index is needed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("vectors must not be empty")]
    EmptyVector,
    #[error("vector length mismatch: {0} != {1}")]
    LengthMismatch(usize, usize),
}

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, SearchError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(SearchError::EmptyVector);
    }
    if query.len() != candidate.len() {
        return Err(SearchError::LengthMismatch(query.len(), candidate.len()));
    }

    let (dot, query_sq, candidate_sq) = query.iter().zip(candidate).fold(
        (0.0f32, 0.0f32, 0.0f32),
        |(dot, q, c), (a, b)| (dot + a * b, q + a * a, c + b * b),
    );

    let denom = query_sq.sqrt() * candidate_sq.sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }
    // Components near f32::MAX overflow to inf / inf
    let score = dot / denom;
    Ok(if score.is_nan() { 0.0 } else { score })
}

/// A candidate's position in the store and its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub index: usize,
    pub score: f32,
}

/// All candidates, most similar first
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<Scored>, SearchError> {
    let mut scores = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            cosine_similarity(query, candidate).map(|score| Scored { index, score })
        })
        .collect::<Result<Vec<_>, _>>()?;

    scores.sort_by(|left, right| right.score.total_cmp(&left.score));
    Ok(scores)
}

/// The `k` most similar candidates, most similar first
pub fn top_k(query: &[f32], candidates: &[Vec<f32>], k: usize) -> Result<Vec<Scored>, SearchError> {
    let mut ranked = rank_descending_by_cosine(query, candidates)?;
    ranked.truncate(k);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        let score = cosine_similarity(&vec, &vec).unwrap();
        assert_relative_eq!(score, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_cosine_is_zero_for_orthogonal_vectors() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert_relative_eq!(score, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let score = cosine_similarity(&[1.0, 1.0], &[10.0, 10.0]).unwrap();
        assert_relative_eq!(score, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let score = cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]).unwrap();
        assert_relative_eq!(score, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_tiny_nonzero_vectors_still_compare() {
        let score = cosine_similarity(&[1e-4, 0.0], &[1e-4, 0.0]).unwrap();
        assert_relative_eq!(score, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_overflowing_candidate_does_not_break_ranking() {
        let query = vec![1.0, 1.0];
        let candidates = vec![vec![f32::MAX, f32::MAX], vec![1.0, 0.9], vec![0.0, 1.0]];
        let ranked = rank_descending_by_cosine(&query, &candidates).unwrap();

        assert!(ranked.iter().all(|s| !s.score.is_nan()));
        assert_eq!(ranked[0].index, 1);
        assert_eq!(ranked[2].index, 0);
    }

    #[test]
    fn test_invalid_vectors() {
        assert_eq!(cosine_similarity(&[], &[1.0]), Err(SearchError::EmptyVector));
        assert_eq!(
            cosine_similarity(&[1.0, 2.0], &[1.0]),
            Err(SearchError::LengthMismatch(2, 1))
        );
    }

    #[test]
    fn test_ranking_returns_highest_similarity_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let ranked = rank_descending_by_cosine(&query, &candidates).unwrap();

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].index, 2);
        assert_eq!(ranked[2].index, 1);
    }

    #[test]
    fn test_top_k_truncates() {
        let query = vec![1.0, 0.0];
        let candidates: Vec<Vec<f32>> = (0..15).map(|i| vec![1.0, i as f32]).collect();
        let top = top_k(&query, &candidates, 10).unwrap();

        assert_eq!(top.len(), 10);
        assert_eq!(top[0].index, 0);
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_top_k_with_fewer_candidates() {
        let top = top_k(&[1.0], &[vec![1.0], vec![2.0]], 10).unwrap();
        assert_eq!(top.len(), 2);
    }
}
