//! Final report synthesis

use crate::client::{complete_text, SharedChatClient};
use fathom_core::Learning;
use tracing::{info, warn};

/// Compiles accumulated learnings into a final markdown report.
pub struct ReportSynthesizer {
    client: SharedChatClient,
}

impl ReportSynthesizer {
    pub fn new(client: SharedChatClient) -> Self {
        Self { client }
    }

    /// Produce the report in a single model call.
    ///
    /// When the model is unavailable the report falls back to a plain
    /// assembly of the learnings, so a finished session always yields
    /// something presentable.
    pub async fn synthesize(
        &self,
        topic: &str,
        learnings: &[Learning],
        queries: &[String],
    ) -> String {
        info!(
            topic = %topic,
            learnings = learnings.len(),
            queries = queries.len(),
            "Synthesizing final report"
        );

        if learnings.is_empty() {
            return assemble_fallback(topic, learnings, queries);
        }

        let system = "You are a research analyst. Write a clear, well-structured \
                      markdown report from the collected learnings. Use headings, \
                      group related facts, and cite source URLs inline.";

        let mut user = format!("Research topic: {topic}\n\nQueries that were run:\n");
        for query in queries {
            user.push_str(&format!("- {query}\n"));
        }
        user.push_str("\nCollected learnings:\n");
        for learning in learnings {
            user.push_str(&format!("- {} (source: {})\n", learning.text, learning.source_url));
        }
        user.push_str("\nWrite the final report now.");

        match complete_text(&self.client, system, &user).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Report synthesis failed, assembling fallback report");
                assemble_fallback(topic, learnings, queries)
            }
        }
    }
}

/// Deterministic report used when the model cannot be reached.
fn assemble_fallback(topic: &str, learnings: &[Learning], queries: &[String]) -> String {
    let mut report = format!("# Research Report: {}\n\n", topic);
    report.push_str(&format!(
        "_Generated {}_\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));

    if learnings.is_empty() {
        report.push_str("No learnings were collected for this topic.\n");
        return report;
    }

    report.push_str("## Findings\n\n");
    for (i, learning) in learnings.iter().enumerate() {
        report.push_str(&format!("{}. {}\n", i + 1, learning.text));
    }

    report.push_str("\n## Sources\n\n");
    let mut seen = Vec::new();
    for learning in learnings {
        if !learning.source_url.is_empty() && !seen.contains(&&learning.source_url) {
            report.push_str(&format!("- {}\n", learning.source_url));
            seen.push(&learning.source_url);
        }
    }

    report.push_str("\n## Queries\n\n");
    for query in queries {
        report.push_str(&format!("- {}\n", query));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learning(text: &str, url: &str) -> Learning {
        Learning {
            text: text.to_string(),
            follow_up_questions: vec![],
            source_url: url.to_string(),
        }
    }

    #[test]
    fn fallback_lists_findings_sources_and_queries() {
        let learnings = vec![
            learning("Fact one.", "https://a.example"),
            learning("Fact two.", "https://b.example"),
        ];
        let queries = vec!["first query".to_string()];

        let report = assemble_fallback("test topic", &learnings, &queries);

        assert!(report.starts_with("# Research Report: test topic"));
        assert!(report.contains("1. Fact one."));
        assert!(report.contains("2. Fact two."));
        assert!(report.contains("- https://a.example"));
        assert!(report.contains("- first query"));
    }

    #[test]
    fn fallback_deduplicates_source_urls() {
        let learnings = vec![
            learning("Fact one.", "https://a.example"),
            learning("Fact two.", "https://a.example"),
        ];

        let report = assemble_fallback("t", &learnings, &[]);

        assert_eq!(report.matches("https://a.example").count(), 1);
    }

    #[test]
    fn fallback_handles_no_learnings() {
        let report = assemble_fallback("empty", &[], &[]);
        assert!(report.contains("No learnings were collected"));
    }
}
