//! Search result relevance evaluation

use crate::client::SharedChatClient;
use crate::error::{AgentError, AgentResult};
use fathom_core::{EvaluationVerdict, SearchResult};
use serde::Deserialize;
use siumai::prelude::ChatMessage;
use tracing::{debug, warn};

/// Judges whether one search result is relevant to its originating query.
pub struct ResultEvaluator {
    client: SharedChatClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerdictDto {
    is_relevant: bool,
    #[serde(default)]
    reason: String,
}

impl ResultEvaluator {
    pub fn new(client: SharedChatClient) -> Self {
        Self { client }
    }

    /// Evaluate one result against the query that produced it.
    ///
    /// Provider or parse failures degrade to a not-relevant verdict so a
    /// flaky evaluator can never abort a research phase.
    pub async fn evaluate(&self, query: &str, result: &SearchResult) -> EvaluationVerdict {
        match self.try_evaluate(query, result).await {
            Ok(verdict) => {
                debug!(
                    url = %result.url,
                    is_relevant = verdict.is_relevant,
                    "Evaluated search result"
                );
                verdict
            }
            Err(e) => {
                warn!(url = %result.url, error = %e, "Evaluation failed, marking not relevant");
                EvaluationVerdict::not_relevant("Error in evaluation")
            }
        }
    }

    async fn try_evaluate(
        &self,
        query: &str,
        result: &SearchResult,
    ) -> AgentResult<EvaluationVerdict> {
        let prompt = format!(
            r#"Evaluate whether this search result is relevant and will help answer the search query.

Search query: "{query}"

Result title: {title}
Result URL: {url}
Result content:
{content}

Respond with a JSON object only:
{{"isRelevant": true or false, "reason": "one short sentence"}}"#,
            query = query,
            title = result.title,
            url = result.url,
            content = result.content,
        );

        let messages = vec![ChatMessage::user(prompt).build()];

        let response = self
            .client
            .chat_with_tools(messages, None)
            .await
            .map_err(|e| AgentError::Llm(format!("Failed to evaluate result: {}", e)))?;

        let content = response.content_text().unwrap_or_default();
        let dto = parse_verdict(content)?;

        Ok(EvaluationVerdict {
            is_relevant: dto.is_relevant,
            reason: dto.reason,
        })
    }
}

fn parse_verdict(response: &str) -> AgentResult<VerdictDto> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            return Err(AgentError::Malformed(
                "no JSON object in evaluator response".to_string(),
            ))
        }
    };

    Ok(serde_json::from_str(json_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_verdict() {
        let dto = parse_verdict(r#"{"isRelevant": true, "reason": "covers the query"}"#).unwrap();
        assert!(dto.is_relevant);
        assert_eq!(dto.reason, "covers the query");
    }

    #[test]
    fn parses_verdict_embedded_in_prose() {
        let dto =
            parse_verdict("Sure!\n{\"isRelevant\": false, \"reason\": \"off topic\"}\n").unwrap();
        assert!(!dto.is_relevant);
    }

    #[test]
    fn missing_reason_defaults_to_empty() {
        let dto = parse_verdict(r#"{"isRelevant": true}"#).unwrap();
        assert!(dto.reason.is_empty());
    }

    #[test]
    fn rejects_non_json_responses() {
        assert!(parse_verdict("relevant, I think").is_err());
    }
}
