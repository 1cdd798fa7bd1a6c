//! Exa search API client
//!
//! <https://docs.exa.ai> - POST /search with page text included in the
//! response, so no second fetch per result is needed.

use crate::error::{ProviderResult, SearchError};
use crate::provider::SearchProvider;
use async_trait::async_trait;
use fathom_core::{retry_async, RawSearchResult, RetryConfig, SearchSettings};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Exa search client
pub struct ExaProvider {
    client: reqwest::Client,
    settings: SearchSettings,
    api_key: String,
}

/// Exa search request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest {
    query: String,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: String,
    contents: ExaContents,
}

#[derive(Debug, Clone, Serialize)]
struct ExaContents {
    text: ExaTextConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextConfig {
    max_characters: u32,
}

/// Exa search response
#[derive(Debug, Deserialize)]
struct ExaSearchResponse {
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    title: Option<String>,
    url: String,
    text: Option<String>,
}

impl ExaProvider {
    /// Create a new Exa client from settings. The API key comes from the
    /// settings or the EXA_API_KEY environment variable.
    pub fn new(settings: SearchSettings) -> ProviderResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var("EXA_API_KEY").ok())
            .ok_or(SearchError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(settings.timeout_ms))
            .user_agent("fathom/0.1")
            .build()?;

        info!("Created Exa search client for {}", settings.base_url);

        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    fn build_request(&self, query: &str) -> ExaSearchRequest {
        ExaSearchRequest {
            query: query.to_string(),
            num_results: self.settings.num_results as u32,
            search_type: "auto".to_string(),
            contents: ExaContents {
                text: ExaTextConfig {
                    max_characters: self.settings.max_content_chars as u32,
                },
            },
        }
    }

    async fn execute(
        client: reqwest::Client,
        url: String,
        api_key: String,
        body: ExaSearchRequest,
        timeout_ms: u64,
    ) -> ProviderResult<ExaSearchResponse> {
        let response = client
            .post(&url)
            .header("x-api-key", &api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout { timeout_ms }
                } else {
                    SearchError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    message
                },
            });
        }

        Ok(response.json::<ExaSearchResponse>().await?)
    }
}

#[async_trait]
impl SearchProvider for ExaProvider {
    fn name(&self) -> &str {
        "exa"
    }

    async fn search(&self, query: &str) -> ProviderResult<Vec<RawSearchResult>> {
        let url = format!("{}/search", self.settings.base_url.trim_end_matches('/'));
        let body = self.build_request(query);
        let timeout_ms = self.settings.timeout_ms;

        debug!(query = query, url = %url, "Dispatching Exa search");

        let operation = {
            let client = self.client.clone();
            let api_key = self.api_key.clone();
            move || {
                Self::execute(
                    client.clone(),
                    url.clone(),
                    api_key.clone(),
                    body.clone(),
                    timeout_ms,
                )
                .boxed()
            }
        };

        let retry = RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 500,
            max_delay_ms: 2000,
            ..Default::default()
        };

        let response = retry_async(operation, retry, "exa_search").await?;

        let results = response
            .results
            .into_iter()
            .map(|r| RawSearchResult {
                title: r.title.unwrap_or_default(),
                url: r.url,
                content: r.text.unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        debug!(query = query, count = results.len(), "Exa search returned");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_exa_field_names() {
        let settings = SearchSettings::default();
        let provider = ExaProvider {
            client: reqwest::Client::new(),
            settings,
            api_key: "test".to_string(),
        };

        let body = provider.build_request("solar storage");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["query"], "solar storage");
        assert_eq!(json["numResults"], 2);
        assert_eq!(json["type"], "auto");
        assert_eq!(json["contents"]["text"]["maxCharacters"], 8000);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let settings = SearchSettings {
            api_key: None,
            ..Default::default()
        };
        // Only meaningful when the environment variable is absent too
        if std::env::var("EXA_API_KEY").is_err() {
            assert!(matches!(
                ExaProvider::new(settings),
                Err(SearchError::MissingApiKey)
            ));
        }
    }

    #[test]
    fn response_results_tolerate_missing_text() {
        let raw = r#"{"results":[{"title":"Grid storage","url":"https://example.com/a"},{"title":null,"url":"https://example.com/b","text":"body"}]}"#;
        let parsed: ExaSearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert!(parsed.results[0].text.is_none());
        assert!(parsed.results[1].title.is_none());
    }
}
