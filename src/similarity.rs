//! Fuzzy title comparison for duplicate detection.
//!
//! Two titles denote the same post when their normalized edit-similarity
//! ratio exceeds [`TITLE_SIMILARITY_THRESHOLD`]. This tolerates trailing
//! punctuation drift, re-formatting and small suffix changes while keeping
//! genuinely different posts apart.

/// Ratio above which two titles are considered the same post.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Normalized edit similarity in `[0, 1]`: `1 - distance / max_len`.
/// Two empty strings compare as identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

pub fn titles_match(a: &str, b: &str) -> bool {
    similarity_ratio(a, b) > TITLE_SIMILARITY_THRESHOLD
}

/// True if any known title matches the candidate.
///
/// Linear in the number of known titles; callers run this on the reduced
/// candidate set, not on a full unfiltered source feed.
pub fn title_is_duplicate(candidate: &str, known_titles: &[String]) -> bool {
    known_titles
        .iter()
        .any(|known| titles_match(candidate, known))
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_titles_have_ratio_one() {
        let title = "AF - Reward is not the optimization target by Alex";
        assert_eq!(similarity_ratio(title, title), 1.0);
        assert!(titles_match(title, title));
    }

    #[test]
    fn trailing_punctuation_still_matches() {
        assert!(titles_match(
            "EA - Shallow review of cause prioritization by Casey",
            "EA - Shallow review of cause prioritization by Casey."
        ));
    }

    #[test]
    fn different_posts_do_not_match() {
        assert!(!titles_match(
            "AF - Reward is not the optimization target by Alex",
            "LW - Six dimensions of operational adequacy by Rob"
        ));
    }

    #[test]
    fn short_prefix_does_not_match_decorated_title() {
        // Decoration ("by <author>") changes enough characters that the
        // bare title must not be treated as the same post.
        assert!(!titles_match("AF - Foo", "AF - Foo by Barbara Anderson"));
    }

    #[test]
    fn empty_titles_compare_equal() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert!(similarity_ratio("", "not empty") < 0.1);
    }

    #[test]
    fn duplicate_detection_over_known_titles() {
        let known = vec![
            "AF - Foo by Bar".to_string(),
            "LW - Something else by Quux".to_string(),
        ];
        assert!(title_is_duplicate("AF - Foo by Bar", &known));
        assert!(!title_is_duplicate("EA - A brand new post by Nobody", &known));
    }
}
