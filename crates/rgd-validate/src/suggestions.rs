//! Fuzzy matching for "did you mean" hints
//!
//! Uses Levenshtein distance to point at the closest known name when a
//! modifier, type or field is misspelled.

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Suggestion result with confidence scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// The suggested correction
    pub text: String,
    /// Levenshtein distance (lower = better match)
    pub distance: usize,
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Find closest matches from a list of candidates.
///
/// Comparison ignores case, so `minlength` still finds `minLength`.
pub fn find_closest_matches<S: AsRef<str>>(
    input: &str,
    candidates: &[S],
    max_results: usize,
) -> Vec<Suggestion> {
    let needle = input.to_lowercase();
    let mut suggestions: Vec<Suggestion> = candidates
        .iter()
        .map(AsRef::as_ref)
        .filter(|&candidate| candidate != input)
        .filter_map(|candidate| {
            let distance = levenshtein(&needle, &candidate.to_lowercase());
            (distance <= MAX_SUGGESTION_DISTANCE).then(|| Suggestion {
                text: candidate.to_string(),
                distance,
            })
        })
        .collect();

    // Sort by distance (best matches first), then alphabetically for stable output
    suggestions.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.text.cmp(&b.text)));
    suggestions.truncate(max_results);
    suggestions
}

/// Best single candidate for `input`, if one is close enough
pub fn closest<S: AsRef<str>>(input: &str, candidates: &[S]) -> Option<String> {
    find_closest_matches(input, candidates, 1)
        .into_iter()
        .next()
        .map(|s| s.text)
}

/// `"; did you mean 'x'?"` or nothing
pub fn did_you_mean(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("; did you mean '{}'?", s),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("minimum", "minimum"), 0);
        assert_eq!(levenshtein("minimun", "minimum"), 1);
        assert_eq!(levenshtein("enmu", "enum"), 2);
    }

    #[test]
    fn test_find_closest_matches() {
        let candidates = ["minimum", "maximum", "minLength", "minItems"];
        let matches = find_closest_matches("minimun", &candidates, 2);
        assert_eq!(matches[0].text, "minimum");
        assert_eq!(matches[0].distance, 1);
    }

    #[test]
    fn test_closest_ignores_case() {
        let candidates = ["minLength", "maxLength"];
        assert_eq!(closest("minlength", &candidates), Some("minLength".to_string()));
        assert_eq!(closest("nothingLikeIt", &candidates), None);
    }

    #[test]
    fn test_exact_match_is_not_suggested() {
        assert_eq!(closest("enum", &["enum"]), None);
    }

    #[test]
    fn test_did_you_mean() {
        assert_eq!(did_you_mean(Some("replicas")), "; did you mean 'replicas'?");
        assert_eq!(did_you_mean(None), "");
    }
}
