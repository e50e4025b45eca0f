/// Temperature-scaled softmax: `exp(s/T - max/T)` normalized to sum 1.
///
/// Computed in `f64` to keep the sum within `1e-6` on large candidate sets.
/// `temperature` must be positive; callers validate it.
pub fn softmax(scores: &[f32], temperature: f32) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let t = f64::from(temperature);
    let scaled: Vec<f64> = scores.iter().map(|&s| f64::from(s) / t).collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scaled.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Shannon entropy `-Σ p·ln(p)`; zero-probability terms contribute nothing.
pub fn entropy(probs: &[f64]) -> f64 {
    -probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.ln())
        .sum::<f64>()
}

/// How peaked a distribution is: `1 - H / ln(n)`.
///
/// Near 1 means one dominant candidate, near 0 means uniform. `ln(1) = 0`
/// leaves a single candidate undefined; it is reported as fully confident.
pub fn confidence(probs: &[f64]) -> f32 {
    if probs.len() <= 1 {
        return 1.0;
    }
    let max_entropy = (probs.len() as f64).ln();
    (1.0 - entropy(probs) / max_entropy) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[0.9, 0.1, -0.4, 0.3, 0.3], 0.7);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_softmax_is_monotonic() {
        let probs = softmax(&[0.1, 0.5, 0.3], 1.0);
        assert!(probs[1] > probs[2] && probs[2] > probs[0]);
    }

    #[test]
    fn test_lower_temperature_sharpens() {
        let warm = softmax(&[0.9, 0.1], 1.0);
        let cold = softmax(&[0.9, 0.1], 0.1);
        assert!(cold[0] > warm[0]);
    }

    #[test]
    fn test_softmax_large_scores_stable() {
        let probs = softmax(&[1000.0, 999.0], 1.0);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_softmax_empty() {
        assert!(softmax(&[], 1.0).is_empty());
    }

    #[test]
    fn test_entropy_uniform_is_ln_n() {
        let probs = vec![0.25; 4];
        assert!((entropy(&probs) - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_ignores_zeros() {
        assert_eq!(entropy(&[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(confidence(&[0.25; 4]).abs() < 1e-6);
        assert!((confidence(&[1.0, 0.0, 0.0]) - 1.0).abs() < 1e-6);
        let mid = confidence(&[0.7, 0.2, 0.1]);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_confidence_single_candidate() {
        assert_eq!(confidence(&[1.0]), 1.0);
        assert!(!confidence(&[1.0]).is_nan());
    }
}
