//! Single research pass: plan, search, evaluate, extract

use crate::dispatcher::SearchDispatcher;
use crate::progress::ProgressEmitter;
use fathom_agents::{InsightExtractor, QueryPlanner, ResultEvaluator};
use fathom_core::{
    async_utils::process_concurrently, Learning, Query, ResearchPhase, SearchResult,
};
use tracing::{debug, info};

/// Everything one research pass produced.
#[derive(Debug, Default)]
pub struct PhaseReport {
    /// Queries that ran to completion this pass. Duplicates the ledger
    /// short-circuited are excluded; zero-result queries are included.
    pub completed_queries: Vec<Query>,
    /// Results that passed URL dedup, in query order.
    pub search_results: Vec<SearchResult>,
    /// Learnings in relevant-result order.
    pub learnings: Vec<Learning>,
    /// Per-query provider failure reasons. Informational; the pass itself
    /// never fails.
    pub errors: Vec<String>,
}

/// Drives the stages of one research pass with bounded fan-out.
///
/// Every evaluation in a pass completes before any extraction starts, so a
/// flaky extractor can never see a result that was not judged relevant
/// first.
pub struct PhaseRunner {
    planner: QueryPlanner,
    dispatcher: SearchDispatcher,
    evaluator: ResultEvaluator,
    extractor: InsightExtractor,
    concurrency: usize,
}

impl PhaseRunner {
    pub fn new(
        planner: QueryPlanner,
        dispatcher: SearchDispatcher,
        evaluator: ResultEvaluator,
        extractor: InsightExtractor,
        concurrency: usize,
    ) -> Self {
        Self {
            planner,
            dispatcher,
            evaluator,
            extractor,
            concurrency,
        }
    }

    /// Plan and run the initial pass for a topic.
    pub async fn run_initial(&self, topic: &str, emitter: &ProgressEmitter) -> PhaseReport {
        emitter.status("planning", format!("Planning initial queries for \"{topic}\""));
        let queries = self.planner.plan_initial_queries(topic).await;
        emitter.step(format!("Planned {} initial queries", queries.len()));

        self.execute(ResearchPhase::Initial, queries, emitter).await
    }

    /// Run the follow-up pass over questions raised by the initial pass.
    ///
    /// One query per distinct question; questions matching an
    /// already-completed query are dropped during planning. Follow-ups
    /// raised by this pass's own learnings are never pursued.
    pub async fn run_follow_up(
        &self,
        follow_ups: Vec<String>,
        completed: &[Query],
        emitter: &ProgressEmitter,
    ) -> PhaseReport {
        emitter.status(
            "planning",
            format!("Planning follow-up queries from {} questions", follow_ups.len()),
        );
        let queries = plan_follow_up_queries(follow_ups, completed);
        emitter.step(format!("Planned {} follow-up queries", queries.len()));

        self.execute(ResearchPhase::FollowUp, queries, emitter).await
    }

    async fn execute(
        &self,
        phase: ResearchPhase,
        queries: Vec<Query>,
        emitter: &ProgressEmitter,
    ) -> PhaseReport {
        if queries.is_empty() {
            debug!(phase = %phase, "No queries to run for this pass");
            return PhaseReport::default();
        }

        info!(phase = %phase, queries = queries.len(), "Running research pass");

        emitter.status("searching", format!("Searching {} queries", queries.len()));
        let outcomes = process_concurrently(queries, self.concurrency, |query| {
            self.dispatcher.dispatch(query)
        })
        .await;

        let mut report = PhaseReport::default();
        let mut pairs: Vec<(String, SearchResult)> = Vec::new();
        for outcome in outcomes {
            if outcome.duplicate {
                continue;
            }
            if let Some(reason) = outcome.error {
                report
                    .errors
                    .push(format!("{}: {}", outcome.query.text, reason));
            }
            for result in outcome.results {
                pairs.push((outcome.query.text.clone(), result));
            }
            report.completed_queries.push(outcome.query);
        }
        emitter.step(format!(
            "Collected {} results from {} queries",
            pairs.len(),
            report.completed_queries.len()
        ));

        emitter.status("evaluating", format!("Evaluating {} results", pairs.len()));
        // Barrier: the collect below finishes every verdict before any
        // extraction below can start.
        let evaluated = process_concurrently(pairs, self.concurrency, |(query_text, result)| {
            async move {
                let verdict = self.evaluator.evaluate(&query_text, &result).await;
                (query_text, result, verdict)
            }
        })
        .await;

        let mut relevant: Vec<(String, SearchResult)> = Vec::new();
        for (query_text, result, verdict) in evaluated {
            report.search_results.push(result.clone());
            if verdict.is_relevant {
                relevant.push((query_text, result));
            } else {
                debug!(url = %result.url, reason = %verdict.reason, "Result judged not relevant");
            }
        }
        emitter.step(format!("{} results judged relevant", relevant.len()));

        emitter.status(
            "extracting",
            format!("Extracting learnings from {} results", relevant.len()),
        );
        report.learnings = process_concurrently(relevant, self.concurrency, |(query_text, result)| {
            async move { self.extractor.extract(&query_text, &result).await }
        })
        .await;
        emitter.step(format!("Extracted {} learnings", report.learnings.len()));

        info!(
            phase = %phase,
            completed = report.completed_queries.len(),
            results = report.search_results.len(),
            learnings = report.learnings.len(),
            "Research pass finished"
        );

        report
    }
}

/// Gather the distinct follow-up questions from a set of learnings,
/// preserving first-seen order.
pub fn collect_follow_ups(learnings: &[Learning]) -> Vec<String> {
    let mut follow_ups: Vec<String> = Vec::new();
    for learning in learnings {
        for question in &learning.follow_up_questions {
            let trimmed = question.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !follow_ups.iter().any(|f| f == trimmed) {
                follow_ups.push(trimmed.to_string());
            }
        }
    }
    follow_ups
}

/// One follow-up query per distinct question, skipping anything the session
/// already ran.
fn plan_follow_up_queries(follow_ups: Vec<String>, completed: &[Query]) -> Vec<Query> {
    let mut queries: Vec<Query> = Vec::new();
    for question in follow_ups {
        if completed.iter().any(|q| q.text == question) {
            continue;
        }
        if queries.iter().any(|q| q.text == question) {
            continue;
        }
        queries.push(Query::follow_up(question));
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learning(text: &str, follow_ups: &[&str]) -> Learning {
        Learning {
            text: text.to_string(),
            follow_up_questions: follow_ups.iter().map(|s| s.to_string()).collect(),
            source_url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn follow_ups_are_distinct_and_ordered() {
        let learnings = vec![
            learning("a", &["How does X work?"]),
            learning("b", &[]),
            learning("c", &["What about Y?"]),
            learning("d", &["How does X work?"]),
        ];

        let follow_ups = collect_follow_ups(&learnings);
        assert_eq!(follow_ups, vec!["How does X work?", "What about Y?"]);
    }

    #[test]
    fn blank_follow_ups_are_ignored() {
        let learnings = vec![learning("a", &["  ", ""])];
        assert!(collect_follow_ups(&learnings).is_empty());
    }

    #[test]
    fn follow_up_planning_skips_completed_queries() {
        let completed = vec![Query::initial("How does X work?")];
        let queries = plan_follow_up_queries(
            vec![
                "How does X work?".to_string(),
                "What about Y?".to_string(),
                "What about Y?".to_string(),
            ],
            &completed,
        );

        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].text, "What about Y?");
        assert_eq!(queries[0].origin, ResearchPhase::FollowUp);
    }
}
