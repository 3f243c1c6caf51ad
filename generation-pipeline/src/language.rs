use common::types::answer::Language;

const GUJARATI: std::ops::RangeInclusive<char> = '\u{0A80}'..='\u{0AFF}';
const DEVANAGARI: std::ops::RangeInclusive<char> = '\u{0900}'..='\u{097F}';

/// Tags text by the scripts found in its first `probe_chars` characters.
///
/// Gujarati wins over Devanagari when both appear; anything else is English.
pub fn detect_language(text: &str, probe_chars: usize) -> Language {
    let mut devanagari = false;
    for c in text.chars().take(probe_chars) {
        if GUJARATI.contains(&c) {
            return Language::Gu;
        }
        devanagari |= DEVANAGARI.contains(&c);
    }

    if devanagari {
        Language::Hi
    } else {
        Language::En
    }
}
