//! Scores for approximate name matches.
//!
//! The base score is `(shorter - edits) / shorter`, where `shorter` is the
//! character length of the shorter of the query and the candidate's canonical
//! name. Candidates outside the inferred LICA are down-weighted by
//! `1 / ln(distance)`, capped at 1.

/// Score given to exact, unambiguous matches
pub const PERFECT_SCORE: f64 = 1.0;

/// Default minimum score an approximate match must reach to be kept
pub const DEFAULT_MIN_SCORE: f64 = 0.7;

/// Safely convert usize to f64 for score calculations
#[inline]
pub(crate) fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Minimum normalised identity a fuzzy index hit must have, by query length.
///
/// Short names need a tighter threshold, otherwise nearly everything of the
/// same length qualifies.
pub fn min_identity_for(name: &str) -> f64 {
    match name.trim().chars().count() {
        0..=4 => 0.9,
        5..=7 => 0.75,
        8..=11 => 0.7,
        _ => 0.65,
    }
}

/// Case-insensitive Levenshtein distance in characters
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Edit-distance score relative to the shorter string, in `[0, 1]`.
///
/// Empty operands score 0.
pub fn base_score(query: &str, candidate: &str) -> f64 {
    let shorter = query.chars().count().min(candidate.chars().count());
    if shorter == 0 {
        return 0.0;
    }
    let edits = edit_distance(query, candidate);
    let remaining = shorter.saturating_sub(edits);
    (count_to_f64(remaining) / count_to_f64(shorter)).clamp(0.0, 1.0)
}

/// Down-weighting for a candidate `distance` edges away from the inferred LICA.
///
/// Never exceeds 1: distances where `1 / ln(distance)` would be undefined or
/// larger than 1 (0, 1 and 2) apply no penalty.
pub fn context_modifier(distance: usize) -> f64 {
    if distance <= 1 {
        return 1.0;
    }
    (1.0 / count_to_f64(distance).ln()).min(1.0)
}

/// Score breakdown for one approximate match
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyScore {
    pub edit_distance: usize,

    /// Score before context weighting
    pub base_score: f64,

    /// Edges between the candidate and the inferred LICA; `None` when the
    /// candidate lies inside it
    pub context_distance: Option<usize>,

    pub modifier: f64,

    /// `base_score * modifier`
    pub score: f64,
}

impl FuzzyScore {
    #[must_use]
    pub fn calculate(query: &str, candidate: &str, context_distance: Option<usize>) -> Self {
        let edit_distance = edit_distance(query, candidate);
        let base_score = base_score(query, candidate);
        let modifier = context_distance.map_or(1.0, context_modifier);

        Self {
            edit_distance,
            base_score,
            context_distance,
            modifier,
            score: base_score * modifier,
        }
    }

    /// Whether the match clears `min_score`
    pub fn passes(&self, min_score: f64) -> bool {
        self.score >= min_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_identity_tightens_for_short_names() {
        assert!((min_identity_for("Homo") - 0.9).abs() < f64::EPSILON);
        assert!((min_identity_for("Qercus") - 0.75).abs() < f64::EPSILON);
        assert!((min_identity_for("Drosophila") - 0.7).abs() < f64::EPSILON);
        assert!((min_identity_for("Saccharomyces") - 0.65).abs() < f64::EPSILON);
        assert!(min_identity_for("Homo") > min_identity_for("Homo sapiens"));
    }

    #[test]
    fn test_edit_distance_ignores_case() {
        assert_eq!(edit_distance("Qercus", "Quercus"), 1);
        assert_eq!(edit_distance("QUERCUS", "quercus"), 0);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_base_score_uses_shorter_length() {
        // 6 characters in the shorter string, one edit
        let score = base_score("Qercus", "Quercus");
        assert!((score - 5.0 / 6.0).abs() < 1e-9);

        assert!((base_score("Quercus", "quercus") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_base_score_degenerate_inputs() {
        assert!(base_score("", "Quercus").abs() < f64::EPSILON);
        assert!(base_score("Quercus", "").abs() < f64::EPSILON);
        assert!(base_score("", "").abs() < f64::EPSILON);
        // More edits than characters clamps to zero
        assert!(base_score("ab", "xyzuvw").abs() < f64::EPSILON);
    }

    #[test]
    fn test_context_modifier_never_exceeds_one() {
        for distance in 0..200 {
            let modifier = context_modifier(distance);
            assert!(modifier > 0.0 && modifier <= 1.0, "distance {distance}");
        }
        assert!((context_modifier(1) - 1.0).abs() < f64::EPSILON);
        assert!((context_modifier(2) - 1.0).abs() < f64::EPSILON);
        assert!((context_modifier(3) - 1.0 / 3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_context_modifier_decreases_with_distance() {
        let mut previous = context_modifier(3);
        for distance in 4..50 {
            let modifier = context_modifier(distance);
            assert!(modifier < previous);
            previous = modifier;
        }
    }

    #[test]
    fn test_fuzzy_score_inside_context() {
        let score = FuzzyScore::calculate("Qercus", "Quercus", None);
        assert_eq!(score.edit_distance, 1);
        assert!((score.modifier - 1.0).abs() < f64::EPSILON);
        assert!((score.score - score.base_score).abs() < f64::EPSILON);
        assert!(score.passes(DEFAULT_MIN_SCORE));
    }

    #[test]
    fn test_out_of_context_never_scores_higher() {
        let inside = FuzzyScore::calculate("Qercus", "Quercus", None);
        for distance in 0..30 {
            let outside = FuzzyScore::calculate("Qercus", "Quercus", Some(distance));
            assert!(outside.score <= inside.score);
        }
        let far = FuzzyScore::calculate("Qercus", "Quercus", Some(12));
        assert!(!far.passes(DEFAULT_MIN_SCORE));
    }

    /// Holds only among candidates as long as the query
    #[test]
    fn test_fewer_edits_never_score_lower_at_equal_length() {
        let query = "Drosophila";
        let candidates = ["Drosophila", "Drosophilo", "Drosaphilo", "Drasaphilo"];
        let scores: Vec<f64> = candidates
            .iter()
            .map(|c| FuzzyScore::calculate(query, c, Some(4)).score)
            .collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        for score in scores {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_shorter_candidate_with_fewer_edits_can_score_lower() {
        // The denominator is the shorter length, so a truncated candidate
        // pays for its deletions twice
        let query = "abcdefghijklmnopqrst";
        let truncated = "abcdefghijklmnox";
        let substituted = "xxxxxxghijklmnopqrst";

        let short = FuzzyScore::calculate(query, truncated, None);
        let long = FuzzyScore::calculate(query, substituted, None);
        assert_eq!(short.edit_distance, 5);
        assert_eq!(long.edit_distance, 6);
        assert!((short.score - 11.0 / 16.0).abs() < 1e-12);
        assert!((long.score - 0.7).abs() < 1e-12);

        assert!(short.edit_distance < long.edit_distance);
        assert!(short.score < long.score);
        assert!(!short.passes(DEFAULT_MIN_SCORE));
        assert!(long.passes(DEFAULT_MIN_SCORE));
    }
}
