//! Page content summarization

use crate::client::{complete_text, SharedChatClient};
use crate::error::AgentResult;
use tracing::debug;

/// Condenses raw page text into a dense summary before evaluation.
///
/// Unlike the other agents this one surfaces errors: the search dispatcher
/// holds the raw content and applies its own truncation fallback when
/// summarization fails, so absorbing the error here would hide the signal
/// it needs.
pub struct ContentSummarizer {
    client: SharedChatClient,
}

impl ContentSummarizer {
    pub fn new(client: SharedChatClient) -> Self {
        Self { client }
    }

    pub async fn summarize(&self, raw_content: &str, context_query: &str) -> AgentResult<String> {
        let system = "You condense web page text into dense research notes. \
                      Keep every concrete fact, number, name, and date that relates \
                      to the reader's query. Drop navigation text, boilerplate, and ads.";

        let user = format!(
            "The reader's search query: \"{context_query}\"\n\n\
             Summarize the following page content in 200-500 words, keeping the \
             details most useful for that query:\n\n{raw_content}"
        );

        let summary = complete_text(&self.client, system, &user).await?;

        debug!(
            raw_chars = raw_content.chars().count(),
            summary_chars = summary.chars().count(),
            "Summarized page content"
        );

        Ok(summary)
    }
}
