//! Turning free-form model output into typed records.

use gamecheck_core_types::{ActionKind, ActionTarget, Candidate, QaError, Recommendation};
use serde::Deserialize;

/// Pull the first JSON object out of model output that may wrap it in
/// prose or a fenced code block.
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    let open = raw.find('{')?;
    let rest = &raw[open..];
    let mut depth = 0i32;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(trim_symmetric(&rest[..=idx]));
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[derive(Debug, Deserialize)]
struct CandidateEnvelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Parse a detection response. Candidates with non-finite coordinates are
/// dropped and confidences are clamped to `[0, 1]`.
pub fn parse_candidates(content: &str) -> Result<Vec<Candidate>, QaError> {
    let json = extract_json_object(content)
        .ok_or_else(|| QaError::reasoning("detection response missing JSON object"))?;
    let envelope: CandidateEnvelope = serde_json::from_str(&json)
        .map_err(|err| QaError::reasoning(format!("invalid detection JSON: {err}")))?;

    Ok(envelope
        .candidates
        .into_iter()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .map(|mut c| {
            c.confidence = clamp_unit(c.confidence);
            c
        })
        .collect())
}

/// Parse a recommendation response and check that every proposal carries
/// the target its action needs.
pub fn parse_recommendation(content: &str) -> Result<Recommendation, QaError> {
    let json = extract_json_object(content)
        .ok_or_else(|| QaError::reasoning("recommendation response missing JSON object"))?;
    let mut recommendation: Recommendation = serde_json::from_str(&json)
        .map_err(|err| QaError::reasoning(format!("invalid recommendation JSON: {err}")))?;

    recommendation.primary.confidence = clamp_unit(recommendation.primary.confidence);
    if !target_fits(recommendation.primary.action, &recommendation.primary.target) {
        return Err(QaError::reasoning(format!(
            "primary {} has no usable target",
            recommendation.primary.action.name()
        )));
    }

    // Malformed alternatives are only fallbacks, so drop them.
    recommendation
        .alternatives
        .retain(|alt| target_fits(alt.action, &alt.target));
    for alt in recommendation.alternatives.iter_mut() {
        alt.confidence = clamp_unit(alt.confidence);
    }

    Ok(recommendation)
}

fn target_fits(action: ActionKind, target: &ActionTarget) -> bool {
    match (action, target) {
        (ActionKind::Click, ActionTarget::Point(p)) => p.x.is_finite() && p.y.is_finite(),
        (ActionKind::Keypress, ActionTarget::Key(key)) => !key.trim().is_empty(),
        (ActionKind::Wait, _) | (ActionKind::Complete, _) => true,
        _ => false,
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamecheck_core_types::Point;

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Here you go:\n```json\n{\"candidates\": []}\n```";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{\"candidates\": []}");
    }

    #[test]
    fn extracts_balanced_inline_object() {
        let input = "I see { \"a\": {\"b\": 1} } and more } text";
        assert_eq!(
            extract_json_object(input).as_deref(),
            Some("{ \"a\": {\"b\": 1} }")
        );
        assert!(extract_json_object("no braces").is_none());
    }

    #[test]
    fn candidates_are_clamped_and_filtered() {
        let content = r#"{"candidates": [
            {"label": "Play", "x": 100, "y": 200, "confidence": 1.4},
            {"label": "Help", "x": 10, "y": 20, "confidence": -0.2}
        ]}"#;
        let candidates = parse_candidates(content).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].confidence, 1.0);
        assert_eq!(candidates[1].confidence, 0.0);
    }

    #[test]
    fn missing_candidates_key_means_none() {
        assert!(parse_candidates("{}").unwrap().is_empty());
    }

    #[test]
    fn garbage_is_a_reasoning_error() {
        let err = parse_candidates("I could not see anything").unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, QaError::ReasoningService(_)));
    }

    #[test]
    fn recommendation_drops_unusable_alternatives() {
        let content = r#"Next step:
        {"action": "click", "target": {"x": 50, "y": 60}, "reasoning": "play", "confidence": 0.9,
         "alternatives": [
            {"action": "keypress", "target": ""},
            {"action": "click", "target": "Enter"},
            {"action": "keypress", "target": "Space"}
         ]}"#;
        let rec = parse_recommendation(content).unwrap();
        assert_eq!(rec.primary.target, ActionTarget::Point(Point::new(50.0, 60.0)));
        assert_eq!(rec.alternatives.len(), 1);
        assert_eq!(rec.alternatives[0].target, ActionTarget::Key("Space".into()));
    }

    #[test]
    fn primary_without_target_is_rejected() {
        let err = parse_recommendation(r#"{"action": "click"}"#).unwrap_err();
        assert!(err.to_string().contains("click"));
    }

    #[test]
    fn complete_needs_no_target() {
        let rec = parse_recommendation(r#"{"action": "complete", "confidence": 0.95}"#).unwrap();
        assert_eq!(rec.primary.action, ActionKind::Complete);
    }
}
