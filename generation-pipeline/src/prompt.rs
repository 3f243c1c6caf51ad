use common::types::{answer::ChatRequest, message::format_history};
use retrieval_pipeline::RetrievedChunk;

pub static DEFAULT_SYSTEM_PROMPT: &str = r"You are the campus assistant, a friendly and knowledgeable guide for the university's students, applicants and parents.

Instructions:
1. Use the provided context as your primary source for anything about the university (admissions, courses, fees, rules, facilities).
2. General questions that are not about the university may be answered from general knowledge.
3. If the context does not contain a university-specific detail, say politely that you have not been given that information yet. Never invent numbers, dates or policies.
4. Reply in the language of the user's message: Hindi (including Hindi written in Latin letters) gets a reply in Devanagari, Gujarati gets a reply in Gujarati script, English gets a reply in English. Do not mix languages.
5. Keep answers concise, respectful and warm.";

/// The two messages sent to a generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn compose_prompt(
    system_prompt: &str,
    chunks: &[RetrievedChunk<'_>],
    request: &ChatRequest,
) -> Prompt {
    Prompt {
        system: system_prompt.to_owned(),
        user: create_user_message(chunks, request),
    }
}

/// Retrieved chunks rendered as labelled blocks, in retrieval order.
pub fn format_context(chunks: &[RetrievedChunk<'_>]) -> String {
    chunks
        .iter()
        .map(|retrieved| format!("[{}]\n{}", retrieved.chunk.source, retrieved.chunk.text))
        .collect::<Vec<String>>()
        .join("\n\n")
}

fn create_user_message(chunks: &[RetrievedChunk<'_>], request: &ChatRequest) -> String {
    let mut message = String::new();

    if !request.history.is_empty() {
        message.push_str("Chat history:\n==================\n");
        message.push_str(&format_history(&request.history));
        message.push_str("\n\n");
    }

    message.push_str("Context Information:\n==================\n");
    message.push_str(&format_context(chunks));
    message.push_str("\n\n");

    if let Some(language) = request
        .language
        .as_deref()
        .map(str::trim)
        .filter(|language| !language.is_empty())
    {
        message.push_str("Preferred reply language: ");
        message.push_str(language);
        message.push_str("\n\n");
    }

    message.push_str("User Question:\n==================\n");
    message.push_str(request.query.trim());
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{
        corpus::CorpusChunk,
        types::message::{Message, MessageRole},
    };
    use retrieval_pipeline::RetrievalSource;

    fn retrieved(chunk: &CorpusChunk) -> RetrievedChunk<'_> {
        RetrievedChunk {
            chunk,
            score: 1.0,
            source: RetrievalSource::Vector,
        }
    }

    #[test]
    fn test_user_message_contains_context_and_question() {
        let fees = CorpusChunk::new("data/fees.txt", "B.Tech fees are ₹80,000/year.");
        let hostel = CorpusChunk::new("data/hostel.txt", "Hostel curfew is 10 PM.");
        let chunks = vec![retrieved(&fees), retrieved(&hostel)];
        let request = ChatRequest::new("  What are the fees? ");
        let prompt = compose_prompt(DEFAULT_SYSTEM_PROMPT, &chunks, &request);

        assert_eq!(prompt.system, DEFAULT_SYSTEM_PROMPT);
        assert!(prompt
            .user
            .contains("[data/fees.txt]\nB.Tech fees are ₹80,000/year.\n\n[data/hostel.txt]"));
        assert!(prompt
            .user
            .ends_with("User Question:\n==================\nWhat are the fees?"));
        assert!(!prompt.user.contains("Chat history"));
        assert!(!prompt.user.contains("Preferred reply language"));
    }

    #[test]
    fn test_history_and_language_hint_are_included_when_present() {
        let fees = CorpusChunk::new("data/fees.txt", "B.Tech fees are ₹80,000/year.");
        let chunks = vec![retrieved(&fees)];
        let request = ChatRequest::new("aur hostel?")
            .with_history(vec![
                Message::new(MessageRole::User, "fees kitni hai?"),
                Message::new(MessageRole::Assistant, "₹80,000 प्रति वर्ष"),
            ])
            .with_language("hi");

        let prompt = compose_prompt("custom", &chunks, &request);

        assert_eq!(prompt.system, "custom");
        assert!(prompt.user.starts_with(
            "Chat history:\n==================\nUser: fees kitni hai?\nAI: ₹80,000 प्रति वर्ष"
        ));
        assert!(prompt.user.contains("Preferred reply language: hi"));
    }
}
