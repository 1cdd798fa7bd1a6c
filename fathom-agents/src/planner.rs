//! Initial query planning

use crate::client::SharedChatClient;
use crate::error::{AgentError, AgentResult};
use fathom_core::Query;
use serde_json::Value;
use siumai::prelude::ChatMessage;
use tracing::{debug, warn};

/// Plans the initial search queries for a research topic.
pub struct QueryPlanner {
    client: SharedChatClient,
    query_count: usize,
}

impl QueryPlanner {
    pub fn new(client: SharedChatClient, query_count: usize) -> Self {
        Self {
            client,
            query_count,
        }
    }

    /// Plan the initial queries for a topic.
    ///
    /// Degrades to the topic itself as the single query when the completion
    /// call fails or returns nothing usable; planning never blocks research.
    pub async fn plan_initial_queries(&self, topic: &str) -> Vec<Query> {
        match self.generate_queries(topic).await {
            Ok(queries) if !queries.is_empty() => {
                debug!(count = queries.len(), "Planned initial queries");
                queries
            }
            Ok(_) => {
                debug!("Planner returned no queries, using topic as query");
                vec![Query::initial(topic)]
            }
            Err(e) => {
                warn!(error = %e, "Query planning failed, using topic as query");
                vec![Query::initial(topic)]
            }
        }
    }

    async fn generate_queries(&self, topic: &str) -> AgentResult<Vec<Query>> {
        let prompt = format!(
            r#"You are a research planner. Generate {count} distinct web search queries that together cover this research topic.

Topic: "{topic}"

Respond with a JSON array of strings only, for example:
["first search query", "second search query"]

Keep each query short and specific enough for a web search engine."#,
            count = self.query_count,
            topic = topic,
        );

        let messages = vec![ChatMessage::user(prompt).build()];

        let response = self
            .client
            .chat_with_tools(messages, None)
            .await
            .map_err(|e| AgentError::Llm(format!("Failed to generate queries: {}", e)))?;

        let content = response.content_text().unwrap_or_default();
        self.parse_queries(content)
    }

    fn parse_queries(&self, response: &str) -> AgentResult<Vec<Query>> {
        let json_str = match (response.find('['), response.rfind(']')) {
            (Some(start), Some(end)) if start < end => &response[start..=end],
            _ => {
                return Err(AgentError::Malformed(
                    "no JSON array in planner response".to_string(),
                ))
            }
        };

        let parsed: Value = serde_json::from_str(json_str)?;
        let entries = parsed
            .as_array()
            .ok_or_else(|| AgentError::Malformed("planner output is not an array".to_string()))?;

        let mut queries: Vec<Query> = Vec::new();
        for entry in entries {
            if let Some(text) = entry.as_str() {
                let text = text.trim();
                if !text.is_empty() && !queries.iter().any(|q| q.text == text) {
                    queries.push(Query::initial(text));
                }
            }
        }

        queries.truncate(self.query_count);
        Ok(queries)
    }
}
