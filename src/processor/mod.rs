//! Command processing pipeline
//!
//! Turns recognized text into a reply: memory and retrieval feed a prompt,
//! the generative model answers, and the answer is cleaned, recorded and
//! bounded. [`CommandProcessor::process`] never fails; every error degrades to
//! a fixed apology.

mod prompt;
mod sanitize;

pub use prompt::{CONVERSATION_CATEGORY, Identity, PromptContext, extract_reply, info_section};
pub use sanitize::{LEAKAGE_PHRASES, sanitize, truncate_response};

use std::sync::Arc;

use crate::Result;
use crate::config::ProcessorConfig;
use crate::db::MemoryStore;
use crate::providers::Generator;
use crate::retriever::{GREETING_TOKEN, InfoRetriever};

/// Fact key for the owner's name
pub const USER_NAME_FACT: &str = "user_name";
/// Fact key for the assistant's name
pub const ASSISTANT_NAME_FACT: &str = "assistant_name";
/// Fact key for the owner relationship
pub const RELATIONSHIP_FACT: &str = "relationship";

/// Reply used whenever processing fails
pub const APOLOGY: &str = "I'm sorry, I encountered an error while processing your request.";

/// Greeting for the wake-word activation token
#[must_use]
pub fn greeting(user_name: Option<&str>) -> String {
    match user_name {
        Some(name) if !name.trim().is_empty() => {
            format!("Hello there, {name}! How may I help you?")
        }
        _ => "Hello there! How may I help you?".to_string(),
    }
}

/// Orchestrates memory, retrieval and generation for one command
pub struct CommandProcessor {
    memory: MemoryStore,
    retriever: Arc<InfoRetriever>,
    generator: Arc<dyn Generator>,
    config: ProcessorConfig,
}

impl CommandProcessor {
    #[must_use]
    pub fn new(
        memory: MemoryStore,
        retriever: Arc<InfoRetriever>,
        generator: Arc<dyn Generator>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            memory,
            retriever,
            generator,
            config,
        }
    }

    /// Memory store backing this processor
    #[must_use]
    pub const fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Produce the reply for `command`
    pub async fn process(&self, command: &str) -> String {
        match self.try_process(command).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(command, error = %e, "failed to process command");
                APOLOGY.to_string()
            }
        }
    }

    async fn try_process(&self, command: &str) -> Result<String> {
        if command.trim().eq_ignore_ascii_case(GREETING_TOKEN) {
            return self.greet(command);
        }

        let identity = self.identity()?;
        let history = self.memory.recent_conversation()?;

        let retrieval = self.retriever.retrieve(command).await;
        tracing::debug!(kind = ?retrieval.kind, "retrieved information");

        let ctx = PromptContext {
            identity: &identity,
            now: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            info_section: info_section(retrieval.is_answer(), &retrieval.text),
            history: &history,
        };
        let prompt = ctx.format_prompt(command);
        tracing::debug!(chars = prompt.len(), "prompt assembled");

        let completion = self.generator.generate(&prompt).await?;
        let reply = sanitize(&extract_reply(&completion, &identity.assistant_name));
        tracing::info!(chars = reply.chars().count(), "generated reply");

        self.memory
            .append_conversation(CONVERSATION_CATEGORY, command, &reply)?;

        Ok(truncate_response(&reply, self.config.max_response_chars))
    }

    fn greet(&self, command: &str) -> Result<String> {
        let user_name = self.memory.get_fact(USER_NAME_FACT)?;
        let reply = greeting(user_name.as_deref());
        self.memory
            .append_conversation(CONVERSATION_CATEGORY, command, &reply)?;
        tracing::info!("greeted user");
        Ok(reply)
    }

    fn identity(&self) -> Result<Identity> {
        let defaults = crate::config::IdentityConfig::default();
        Ok(Identity {
            user_name: self
                .memory
                .get_fact(USER_NAME_FACT)?
                .unwrap_or_else(|| "my owner".to_string()),
            assistant_name: self
                .memory
                .get_fact(ASSISTANT_NAME_FACT)?
                .unwrap_or(defaults.assistant_name),
            relationship: self
                .memory
                .get_fact(RELATIONSHIP_FACT)?
                .unwrap_or(defaults.relationship),
        })
    }
}
