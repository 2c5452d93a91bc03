//! Answer normalization
//!
//! Answers are compared after trimming, collapsing whitespace runs to a single
//! space and lowercasing, so "  Seoul   Forest " matches "seoul forest".

/// Normalize an answer for comparison
pub fn normalize(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Check a submission against the expected answer
pub fn matches(expected: &str, submitted: &str) -> bool {
    normalize(expected) == normalize(submitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Hello   World \t"), "hello world");
        assert_eq!(normalize("\n"), "");
        assert_eq!(normalize("ABC"), "abc");
    }

    #[test]
    fn test_whitespace_and_case_insensitive() {
        assert!(matches("Seoul Forest", "  seoul   FOREST "));
        assert!(matches("seoul forest", "Seoul\tForest\n"));
        assert!(!matches("seoul forest", "seoulforest"));
        assert!(!matches("seoul forest", "seoul forests"));
    }

    #[test]
    fn test_unicode_case_folding() {
        assert!(matches("ÉCLAIR", "éclair"));
        assert!(matches("팝업 스토어", " 팝업  스토어 "));
    }
}
