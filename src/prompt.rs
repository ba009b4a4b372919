//! Prompt construction for the completion service

/// System message sent with every completion request
pub const SYSTEM_PROMPT: &str = "You are a helpful study guide assistant.";

/// Context entries embedded in a prompt by default
pub const DEFAULT_PROMPT_CONTEXT: usize = 3;

const ANSWER_INSTRUCTIONS: &str = "Instructions:
- If the answer is directly in the knowledge base, use that information
- If not directly available, use reasoning and general knowledge to provide a helpful answer
- Keep responses concise but complete
- Use a friendly, encouraging tone
- Support markdown formatting in your response
- If you cannot answer at all, politely explain why

Answer:";

/// Builds the single user payload for a question.
///
/// The knowledge base is embedded verbatim; an oversized base is left for
/// the completion service to reject.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    community_name: String,
    context_entries: usize,
}

impl PromptBuilder {
    pub fn new(community_name: impl Into<String>, context_entries: usize) -> Self {
        Self {
            community_name: community_name.into(),
            context_entries,
        }
    }

    pub fn build(&self, question: &str, knowledge_base: &str, recent_context: &[String]) -> String {
        let context_line = self.context_line(recent_context);

        format!(
            "Act as a helpful study guide bot for the {community} Discord server. \n\
             You should be friendly, concise, and helpful. Answer based on the provided channel data.\n\
             \n\
             Channel Knowledge Base:\n\
             {knowledge_base}\n\
             \n\
             {context_line}Current Question: {question}\n\
             \n\
             {ANSWER_INSTRUCTIONS}",
            community = self.community_name,
        )
    }

    fn context_line(&self, recent_context: &[String]) -> String {
        if recent_context.is_empty() || self.context_entries == 0 {
            return String::new();
        }
        let start = recent_context.len().saturating_sub(self.context_entries);
        format!(
            "Recent conversation context: {}\n\n",
            recent_context[start..].join(", ")
        )
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("Sunnie Study Cafe", DEFAULT_PROMPT_CONTEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeds_knowledge_base_and_question_verbatim() {
        let kb = "Cafe hours: 9am-5pm\nWifi: cafe123";
        let question = "What's the wifi password?";
        let payload = PromptBuilder::default().build(question, kb, &[]);

        assert!(payload.contains(kb));
        assert!(payload.contains(&format!("Current Question: {}", question)));
        assert!(payload.contains("Sunnie Study Cafe"));
        assert!(!payload.contains("Recent conversation context"));
        assert!(payload.ends_with("Answer:"));
    }

    #[test]
    fn test_context_keeps_last_three() {
        let context: Vec<String> = ["q1", "q2", "q3", "q4", "q5"].iter().map(|s| s.to_string()).collect();
        let payload = PromptBuilder::default().build("next?", "kb", &context);

        assert!(payload.contains("Recent conversation context: q3, q4, q5\n\nCurrent Question: next?"));
        assert!(!payload.contains("q2"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::new("Night Owls", 3);
        let context = vec!["earlier".to_string()];
        assert_eq!(
            builder.build("q", "kb", &context),
            builder.build("q", "kb", &context)
        );
    }
}
