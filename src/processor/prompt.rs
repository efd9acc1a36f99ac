//! Prompt assembly for the generative model

use std::fmt::Write as _;

use crate::db::ConversationEntry;

/// Category under which exchanges are recorded
pub const CONVERSATION_CATEGORY: &str = "conversation";

/// Owner and assistant identity read from the fact table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_name: String,
    pub assistant_name: String,
    pub relationship: String,
}

/// Everything the prompt is built from
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub identity: &'a Identity,
    /// Local date and time, already formatted
    pub now: String,
    /// Information section, including its heading
    pub info_section: String,
    /// Conversation window as stored, most recent first
    pub history: &'a [ConversationEntry],
}

impl PromptContext<'_> {
    /// Render the prompt, ending on the assistant's turn marker
    ///
    /// History is replayed oldest first; entries outside the conversation
    /// category are skipped.
    #[must_use]
    pub fn format_prompt(&self, command: &str) -> String {
        let Identity {
            user_name,
            assistant_name,
            relationship,
        } = self.identity;

        let mut prompt = format!(
            "You are {assistant_name}, a highly intelligent and helpful personal assistant.\n\
             Your owner is {user_name}, and your relationship is {relationship}.\n\
             Current date and time: {}\n\
             You remember past interactions to provide contextually relevant responses.\n\n\
             {}\
             Conversation History:\n",
            self.now, self.info_section
        );

        for entry in self
            .history
            .iter()
            .rev()
            .filter(|e| e.category == CONVERSATION_CATEGORY)
        {
            let _ = writeln!(
                prompt,
                "User: {}\n{assistant_name}: {}",
                entry.command, entry.response
            );
        }

        let _ = write!(prompt, "User: {command}\n{assistant_name}: ");
        prompt
    }
}

/// Heading plus body of the information section
#[must_use]
pub fn info_section(found: bool, text: &str) -> String {
    let heading = if found {
        "Here is some information I found:"
    } else {
        "Here is some information I could find:"
    };
    format!("{heading}\n{text}\n\n")
}

/// Text after the last assistant turn marker, trimmed
///
/// Completion endpoints that echo the prompt repeat earlier turns; only the
/// final turn is the reply.
#[must_use]
pub fn extract_reply(completion: &str, assistant_name: &str) -> String {
    let marker = format!("{assistant_name}:");
    completion
        .rsplit(marker.as_str())
        .next()
        .unwrap_or(completion)
        .trim()
        .to_string()
}
