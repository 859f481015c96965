//! Keyword-based mood and animation hints for model output.

const EXCITED_WORDS: [&str; 3] = ["amazing", "incredible", "fantastic"];
const GENTLE_WORDS: [&str; 3] = ["gentle", "soft", "calm"];
const CELEBRATORY_WORDS: [&str; 3] = ["celebrate", "party", "woohoo"];

pub const DEFAULT_MOOD: &str = "cheerful";
pub const DEFAULT_ANIMATION: &str = "bounce";

/// Returns `(mood, animation)` for a completion. The first matching group
/// wins; text with no keyword gets the neutral pair.
pub fn infer_mood(text: &str) -> (&'static str, &'static str) {
    let lower = text.to_lowercase();
    let contains_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if contains_any(&EXCITED_WORDS) {
        ("excited", "celebration_bounce")
    } else if contains_any(&GENTLE_WORDS) {
        ("gentle", "gentle_sway")
    } else if contains_any(&CELEBRATORY_WORDS) {
        ("celebratory", "confetti_explosion")
    } else {
        (DEFAULT_MOOD, DEFAULT_ANIMATION)
    }
}
