//! Learning and follow-up extraction from relevant results

use crate::client::SharedChatClient;
use crate::error::{AgentError, AgentResult};
use fathom_core::{text::truncate_chars, Learning, SearchResult};
use serde::Deserialize;
use siumai::prelude::ChatMessage;
use tracing::{debug, warn};

/// Cap on result content forwarded to the model. Keeps extraction prompts
/// well under context limits even for long summaries.
const MAX_CONTENT_CHARS: usize = 1500;

/// Distills one relevant search result into a learning plus at most one
/// follow-up question.
pub struct InsightExtractor {
    client: SharedChatClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionDto {
    learning: String,
    #[serde(default)]
    follow_up_questions: Vec<String>,
}

impl InsightExtractor {
    pub fn new(client: SharedChatClient) -> Self {
        Self { client }
    }

    /// Extract a learning from a result already judged relevant.
    ///
    /// Failures degrade to a placeholder learning that keeps the source URL,
    /// so one bad extraction never aborts the phase.
    pub async fn extract(&self, query: &str, result: &SearchResult) -> Learning {
        match self.try_extract(query, result).await {
            Ok(learning) => {
                debug!(
                    url = %result.url,
                    follow_ups = learning.follow_up_questions.len(),
                    "Extracted learning"
                );
                learning
            }
            Err(e) => {
                warn!(url = %result.url, error = %e, "Extraction failed, using placeholder");
                Learning::placeholder(&result.url)
            }
        }
    }

    async fn try_extract(&self, query: &str, result: &SearchResult) -> AgentResult<Learning> {
        let content = truncate_chars(&result.content, MAX_CONTENT_CHARS);

        let prompt = format!(
            r#"The user is researching the query below. Extract the single most important learning from this search result, and optionally one follow-up question that would deepen the research.

Search query: "{query}"

Result title: {title}
Result content:
{content}

Respond with a JSON object only:
{{"learning": "one or two sentences", "followUpQuestions": ["an optional follow-up question"]}}"#,
            query = query,
            title = result.title,
            content = content,
        );

        let messages = vec![ChatMessage::user(prompt).build()];

        let response = self
            .client
            .chat_with_tools(messages, None)
            .await
            .map_err(|e| AgentError::Llm(format!("Failed to extract learning: {}", e)))?;

        let text = response.content_text().unwrap_or_default();
        let mut dto = parse_extraction(text)?;

        if dto.learning.trim().is_empty() {
            return Err(AgentError::Malformed(
                "extractor returned an empty learning".to_string(),
            ));
        }

        // One follow-up per result keeps the second phase bounded.
        dto.follow_up_questions.retain(|q| !q.trim().is_empty());
        dto.follow_up_questions.truncate(1);

        Ok(Learning {
            text: dto.learning.trim().to_string(),
            follow_up_questions: dto.follow_up_questions,
            source_url: result.url.clone(),
        })
    }
}

fn parse_extraction(response: &str) -> AgentResult<ExtractionDto> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            return Err(AgentError::Malformed(
                "no JSON object in extractor response".to_string(),
            ))
        }
    };

    Ok(serde_json::from_str(json_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_learning_with_follow_up() {
        let dto = parse_extraction(
            r#"{"learning": "Rust ships a borrow checker.", "followUpQuestions": ["How does NLL differ?"]}"#,
        )
        .unwrap();
        assert_eq!(dto.learning, "Rust ships a borrow checker.");
        assert_eq!(dto.follow_up_questions.len(), 1);
    }

    #[test]
    fn missing_follow_ups_default_to_empty() {
        let dto = parse_extraction(r#"{"learning": "Plain fact."}"#).unwrap();
        assert!(dto.follow_up_questions.is_empty());
    }

    #[test]
    fn rejects_responses_without_object() {
        assert!(parse_extraction("the learning is that...").is_err());
    }
}
