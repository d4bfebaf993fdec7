//! Meta-axis derivation: certainty, granularity, verification score.

/// Upper bound of the granularity axis.
pub const MAX_GRANULARITY: u32 = 1000;

/// Certainty `C = round(c * 100)`, with `c` clamped to `[0, 1]`.
pub fn certainty(confidence: f32) -> u8 {
    if !confidence.is_finite() {
        return 0;
    }
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Granularity `G = clamp(ceil(log2(w) * 100), 1, 1000)`.
///
/// `w == 0` maps to 1: log2 is undefined there, and an empty step is the
/// finest grain rather than an error.
pub fn granularity(word_count: usize) -> u32 {
    if word_count == 0 {
        return 1;
    }
    let g = ((word_count as f64).log2() * 100.0).ceil();
    (g as u32).clamp(1, MAX_GRANULARITY)
}

/// Verification score from matched concept count and external source count.
///
/// Starts at 50, +2 per concept, +5 per source, capped at 100. Monotonically
/// non-decreasing in both inputs.
pub fn verification_score(concept_count: usize, source_count: usize) -> f32 {
    let score = 50.0 + 2.0 * concept_count as f64 + 5.0 * source_count as f64;
    score.min(100.0) as f32
}

/// Inputs to the tile certainty formula.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CertaintyInputs {
    /// Initial review completed.
    pub initial_review: bool,
    /// Number of confirming experts.
    pub expert_count: u32,
    /// Number of cited external sources.
    pub external_sources: u32,
    /// Time-stability bonus factor, 0.0-1.0.
    pub time_stability_bonus: f32,
    /// Consensus multiplier, 0.0-1.0.
    pub consensus_multiplier: f32,
}

/// Tile certainty (0-100):
/// `30·review + 20·experts + 10·sources + 15·stability + 25·consensus`,
/// truncated and capped at 100.
pub fn certainty_score(inputs: &CertaintyInputs) -> u8 {
    let review = if inputs.initial_review { 30.0 } else { 0.0 };
    let score = review
        + 20.0 * inputs.expert_count as f64
        + 10.0 * inputs.external_sources as f64
        + 15.0 * inputs.time_stability_bonus as f64
        + 25.0 * inputs.consensus_multiplier as f64;
    score.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_boundaries() {
        assert_eq!(granularity(0), 1);
        assert_eq!(granularity(1), 1);
        assert_eq!(granularity(2), 100);
        assert_eq!(granularity(3), 159);
        assert_eq!(granularity(1024), 1000);
        assert_eq!(granularity(1_000_000), 1000);
    }

    #[test]
    fn test_certainty_rounds_and_clamps() {
        assert_eq!(certainty(0.9), 90);
        assert_eq!(certainty(0.555), 56);
        assert_eq!(certainty(1.7), 100);
        assert_eq!(certainty(-0.2), 0);
        assert_eq!(certainty(f32::NAN), 0);
    }

    #[test]
    fn test_verification_score_monotonic() {
        assert_eq!(verification_score(0, 0), 50.0);
        assert_eq!(verification_score(0, 2), 60.0);
        assert_eq!(verification_score(3, 0), 56.0);
        assert_eq!(verification_score(100, 100), 100.0);

        let mut prev = 0.0;
        for n in 0..40 {
            let s = verification_score(n, n / 2);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn test_certainty_score() {
        let inputs = CertaintyInputs {
            initial_review: true,
            expert_count: 1,
            external_sources: 2,
            time_stability_bonus: 0.5,
            consensus_multiplier: 0.4,
        };
        // 30 + 20 + 20 + 7.5 + 10 = 87.5
        assert_eq!(certainty_score(&inputs), 87);

        let saturated = CertaintyInputs {
            expert_count: 10,
            ..inputs
        };
        assert_eq!(certainty_score(&saturated), 100);
        assert_eq!(certainty_score(&CertaintyInputs::default()), 0);
    }
}
