// src/evaluator/parser.rs — Parse scoring responses into structured scores

use crate::core::types::ConversationScores;
use crate::generator::strip_code_fences;

/// Parse a scoring response into a complete score set.
///
/// Expected shape:
/// ```text
/// {"coherence": 4, "politeness": 5, "relevance": 4, "resolution": 1}
/// ```
///
/// The result is all-or-nothing: any missing or out-of-range dimension
/// rejects the whole response, so a conversation is never partially
/// scored.
pub fn parse_scores(response: &str) -> Result<ConversationScores, String> {
    let stripped = strip_code_fences(response);
    let json = extract_object(stripped).ok_or("no JSON object in response")?;

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;

    let coherence = scale_field(&value, "coherence")?;
    let politeness = scale_field(&value, "politeness")?;
    let relevance = scale_field(&value, "relevance")?;
    let resolution = binary_field(&value, "resolution")?;

    Ok(ConversationScores {
        coherence,
        politeness,
        relevance,
        resolution,
    })
}

/// A 1-5 integer dimension.
fn scale_field(value: &serde_json::Value, key: &str) -> Result<u8, String> {
    let n = value[key]
        .as_u64()
        .ok_or_else(|| format!("missing score '{key}'"))?;
    if !(1..=5).contains(&n) {
        return Err(format!("score '{key}' = {n} outside 1-5"));
    }
    Ok(n as u8)
}

/// The 0/1 resolution flag.
fn binary_field(value: &serde_json::Value, key: &str) -> Result<u8, String> {
    let n = value[key]
        .as_u64()
        .ok_or_else(|| format!("missing score '{key}'"))?;
    if n > 1 {
        return Err(format!("score '{key}' = {n} outside 0-1"));
    }
    Ok(n as u8)
}

/// Slice out the first balanced-looking JSON object, tolerating prose
/// around it ("Here are the scores: {...}").
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_json() {
        let scores =
            parse_scores(r#"{"coherence": 4, "politeness": 5, "relevance": 4, "resolution": 1}"#)
                .unwrap();
        assert_eq!(scores.coherence, 4);
        assert_eq!(scores.politeness, 5);
        assert_eq!(scores.relevance, 4);
        assert_eq!(scores.resolution, 1);
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let scores = parse_scores(
            "Here is my assessment:\n{\"coherence\": 3, \"politeness\": 3, \"relevance\": 2, \"resolution\": 0}\nLet me know.",
        )
        .unwrap();
        assert_eq!(scores.relevance, 2);
        assert_eq!(scores.resolution, 0);
    }

    #[test]
    fn test_parse_fenced() {
        let scores = parse_scores(
            "```json\n{\"coherence\": 5, \"politeness\": 4, \"relevance\": 5, \"resolution\": 1}\n```",
        )
        .unwrap();
        assert_eq!(scores.coherence, 5);
    }

    #[test]
    fn test_missing_dimension_rejected() {
        let err =
            parse_scores(r#"{"coherence": 4, "politeness": 5, "resolution": 1}"#).unwrap_err();
        assert!(err.contains("relevance"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = parse_scores(
            r#"{"coherence": 6, "politeness": 5, "relevance": 4, "resolution": 1}"#,
        )
        .unwrap_err();
        assert!(err.contains("coherence"));
    }

    #[test]
    fn test_zero_scale_rejected() {
        // Quality dimensions are 1-5; 0 only exists for resolution
        assert!(parse_scores(
            r#"{"coherence": 0, "politeness": 5, "relevance": 4, "resolution": 1}"#
        )
        .is_err());
    }

    #[test]
    fn test_resolution_above_one_rejected() {
        assert!(parse_scores(
            r#"{"coherence": 3, "politeness": 3, "relevance": 3, "resolution": 2}"#
        )
        .is_err());
    }

    #[test]
    fn test_no_json_rejected() {
        assert!(parse_scores("all good, 5 out of 5").is_err());
    }

    #[test]
    fn test_float_scores_rejected() {
        // as_u64 fails on non-integers; partial credit is not a thing
        assert!(parse_scores(
            r#"{"coherence": 4.5, "politeness": 5, "relevance": 4, "resolution": 1}"#
        )
        .is_err());
    }
}
