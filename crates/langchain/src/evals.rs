//! Scoring of retrieval augmented answers
pub mod ragas;

pub use ragas::{Ragas, RagasScores};

/// Cosine similarity of two vectors, 0 when either is empty or all zeros
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Harmonic mean, 0 when any score is 0
pub fn harmonic_mean(scores: &[f64]) -> f64 {
    if scores.is_empty() || scores.iter().any(|s| *s <= 0.0) {
        return 0.0;
    }
    scores.len() as f64 / scores.iter().map(|s| 1.0 / s).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]) - 0.5f64.sqrt()).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_harmonic_mean() {
        assert!((harmonic_mean(&[1.0, 1.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((harmonic_mean(&[0.5, 1.0]) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(harmonic_mean(&[0.9, 0.0, 0.8]), 0.0);
        assert_eq!(harmonic_mean(&[]), 0.0);
    }
}
