//! Confidence-based candidate selection

use gamecheck_core_types::Candidate;

/// Pick the highest-confidence candidate whose label contains one of the
/// keywords and whose confidence reaches `min_confidence`.
///
/// Ties go to the first candidate seen. Pure and deterministic.
pub fn select_candidate<'a>(
    candidates: &'a [Candidate],
    keywords: &[String],
    min_confidence: f64,
) -> Option<&'a Candidate> {
    candidates
        .iter()
        .filter(|c| c.matches_keywords(keywords) && c.is_confident(min_confidence))
        .fold(None, |best: Option<&Candidate>, candidate| match best {
            Some(current) if current.confidence >= candidate.confidence => Some(current),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        vec!["start".to_string(), "play".to_string()]
    }

    #[test]
    fn picks_highest_confidence_keyword_match() {
        let candidates = vec![
            Candidate::new("Settings", 10.0, 10.0, 0.9),
            Candidate::new("Start Game", 200.0, 300.0, 0.95),
            Candidate::new("Play", 220.0, 340.0, 0.8),
        ];
        let best = select_candidate(&candidates, &keywords(), 0.7).expect("candidate");
        assert_eq!(best.label, "Start Game");
        assert_eq!(best.confidence, 0.95);
    }

    #[test]
    fn returns_none_when_all_below_threshold() {
        let candidates = vec![
            Candidate::new("Start", 1.0, 1.0, 0.5),
            Candidate::new("Play", 2.0, 2.0, 0.69),
        ];
        assert!(select_candidate(&candidates, &keywords(), 0.7).is_none());
    }

    #[test]
    fn returns_none_for_empty_input() {
        assert!(select_candidate(&[], &keywords(), 0.7).is_none());
    }

    #[test]
    fn confident_non_keyword_labels_are_ignored() {
        let candidates = vec![Candidate::new("Options", 1.0, 1.0, 0.99)];
        assert!(select_candidate(&candidates, &keywords(), 0.7).is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        let candidates = vec![Candidate::new("PLAY NOW", 5.0, 6.0, 0.7)];
        let best = select_candidate(&candidates, &keywords(), 0.7).expect("candidate");
        assert_eq!(best.label, "PLAY NOW");
    }

    #[test]
    fn ties_keep_first_seen() {
        let candidates = vec![
            Candidate::new("Start", 1.0, 1.0, 0.9),
            Candidate::new("Play", 2.0, 2.0, 0.9),
        ];
        let best = select_candidate(&candidates, &keywords(), 0.7).expect("candidate");
        assert_eq!(best.label, "Start");
    }

    #[test]
    fn selection_is_repeatable() {
        let candidates = vec![
            Candidate::new("Play", 2.0, 2.0, 0.8),
            Candidate::new("Start", 1.0, 1.0, 0.85),
        ];
        let first = select_candidate(&candidates, &keywords(), 0.7).cloned();
        let second = select_candidate(&candidates, &keywords(), 0.7).cloned();
        assert_eq!(first, second);
    }
}
