//! Deterministic keyword/regex crisis pre-filter. No model inference, no IO,
//! never errors. First line of defense and the safety-net keyword backstop.

use once_cell::sync::Lazy;
use regex::Regex;

/// Direct crisis terms, primary (English) register.
const CRISIS_TERMS_EN: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "hurt myself",
    "cut myself",
    "want to die",
    "i can't go on",
    "i will kill myself",
    "no point living",
    "better off without me",
];

/// Equivalent terms, Hindi/Hinglish colloquial register.
const CRISIS_TERMS_HI: &[&str] = &[
    "marna",
    "zindagi khatam",
    "apni jaan",
    "khud ko nuksan",
    "mar jaaun",
    "jeena nahi",
];

/// Minimal keyword backstop shared with the model classifier's parse-failure
/// fallback path.
pub const FALLBACK_CRISIS_TERMS: &[&str] =
    &["suicide", "kill myself", "want to die", "end my life"];

/// Known-benign idioms. An exclusion hit always wins over keyword hits.
const EXCLUSION_PHRASES: &[&str] = &[
    "dying of embarrassment",
    "die of embarrassment",
    "dying of laughter",
    "died laughing",
    "dying laughing",
    "to die for",
    "don't want to die",
    "do not want to die",
    "dont want to die",
];

/// Polarity rule: a crisis phrase preceded by a negation token within the
/// same clause is not a hit (lookbehind-equivalent, applied as exclusion).
static NEGATED_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:don't|dont|do\s+not|never|not)\b[^.!?\n]{0,40}?\b(?:want\s+to\s+die|kill\s+myself|hurt\s+myself|end\s+my\s+life)\b",
    )
    .expect("negated phrase regex")
});

/// Deterministic crisis classifier over fixed keyword registers with an
/// exclusion list checked first.
#[derive(Debug)]
pub struct PatternMatcher {
    pattern: Regex,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher {
    /// Compile the keyword alternation once. Case-insensitive with word
    /// boundaries so "dying" does not hit a bare "die" style term.
    pub fn new() -> Self {
        let escaped: Vec<String> = CRISIS_TERMS_EN
            .iter()
            .chain(CRISIS_TERMS_HI.iter())
            .map(|t| regex::escape(t))
            .collect();
        let pattern_str = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
        Self {
            pattern: Regex::new(&pattern_str).expect("crisis keyword regex"),
        }
    }

    /// True when the text matches a known-benign idiom or a negated crisis
    /// phrase. Exclusion always wins over keyword hits.
    pub fn is_excluded(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        EXCLUSION_PHRASES.iter().any(|p| lower.contains(p)) || NEGATED_PHRASE_RE.is_match(text)
    }

    /// Returns the matched crisis term (lowercased), or `None` when nothing
    /// matched or an exclusion fired.
    pub fn evaluate(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() || self.is_excluded(text) {
            return None;
        }
        self.pattern.find(text).map(|m| m.as_str().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_keyword_matches() {
        let m = PatternMatcher::new();
        assert_eq!(
            m.evaluate("I want to kill myself").as_deref(),
            Some("kill myself")
        );
        assert_eq!(m.evaluate("sab zindagi khatam lagta hai").as_deref(), Some("zindagi khatam"));
    }

    #[test]
    fn exclusion_wins_over_keyword_overlap() {
        let m = PatternMatcher::new();
        assert_eq!(m.evaluate("I'm dying of embarrassment, that test was so funny"), None);
        assert_eq!(m.evaluate("I don't want to die, I want things to get better"), None);
        assert!(m.is_excluded("this cake is to die for"));
    }

    #[test]
    fn negation_before_phrase_is_excluded() {
        let m = PatternMatcher::new();
        assert_eq!(m.evaluate("I would never hurt myself"), None);
        assert_eq!(m.evaluate("I do not want to die"), None);
        // negation in an earlier clause does not shield a later phrase
        assert!(m.evaluate("I'm not okay. I want to die").is_some());
    }

    #[test]
    fn empty_and_benign_text_do_not_match() {
        let m = PatternMatcher::new();
        assert_eq!(m.evaluate(""), None);
        assert_eq!(m.evaluate("   "), None);
        assert_eq!(m.evaluate("exams are stressful but I'm coping"), None);
    }
}
