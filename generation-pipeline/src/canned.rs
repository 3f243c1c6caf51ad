//! Fixed replies that never touch retrieval or a generation backend.

use common::types::answer::Answer;

use crate::language::detect_language;

pub static WARMING_UP_RESPONSE: &str = "⚠️ System is warming up! The knowledge base is still being initialized. Please wait a few seconds and try again.";

pub static NO_CONTEXT_RESPONSE: &str = "I couldn't find anything about that in my knowledge base. Could you rephrase your question or ask about something more specific, such as admissions, courses or fees?";

const ENGLISH_GREETING: &str = "Hello! 👋 I'm the campus assistant. Ask me anything about admissions, courses, fees or campus life.";
const HINDI_GREETING: &str = "नमस्ते! 🙏 मैं कैंपस सहायक हूँ। प्रवेश, पाठ्यक्रम, फीस या कैंपस जीवन के बारे में कुछ भी पूछिए।";
const GUJARATI_GREETING: &str = "કેમ છો! 🙏 હું કેમ્પસ સહાયક છું. પ્રવેશ, અભ્યાસક્રમો, ફી અથવા કેમ્પસ જીવન વિશે કંઈપણ પૂછો.";

/// Openers answered directly, keyed by their normalized form.
const GREETINGS: &[(&str, &str)] = &[
    ("hi", ENGLISH_GREETING),
    ("hii", ENGLISH_GREETING),
    ("hello", ENGLISH_GREETING),
    ("hey", ENGLISH_GREETING),
    ("hello there", ENGLISH_GREETING),
    ("good morning", ENGLISH_GREETING),
    ("good afternoon", ENGLISH_GREETING),
    ("good evening", ENGLISH_GREETING),
    ("namaste", HINDI_GREETING),
    ("namaskar", HINDI_GREETING),
    ("नमस्ते", HINDI_GREETING),
    ("नमस्कार", HINDI_GREETING),
    ("kem cho", GUJARATI_GREETING),
    ("કેમ છો", GUJARATI_GREETING),
    ("jai shri krishna", GUJARATI_GREETING),
];

/// Canned reply for a bare greeting, matched on the normalized query with trailing
/// punctuation ignored.
pub fn greeting_reply(normalized_query: &str) -> Option<Answer> {
    let opener = normalized_query
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c == '।' || c.is_whitespace());

    GREETINGS
        .iter()
        .find(|(greeting, _)| *greeting == opener)
        .map(|(_, reply)| fixed_answer(reply))
}

pub fn warming_up_answer() -> Answer {
    fixed_answer(WARMING_UP_RESPONSE)
}

pub fn no_context_answer() -> Answer {
    fixed_answer(NO_CONTEXT_RESPONSE)
}

fn fixed_answer(text: &str) -> Answer {
    Answer::new(text, Vec::<String>::new(), detect_language(text, usize::MAX))
}
