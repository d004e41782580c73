//! Text-to-SQL scoring by execution against the read-only dataset store.

use async_trait::async_trait;
use govbench_core::errors::FailureReason;
use govbench_core::evaluator_api::{Evaluation, Evaluator};
use govbench_core::model::{EvaluationType, GroundTruth, LlmResponse, Question, ScoreComponents};
use govbench_core::store::{RowSet, Store};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;

const COMPONENT_WEIGHT: f64 = 0.5;

pub struct SqlEvaluator {
    store: Store,
    statement_timeout: Duration,
    reference_cache: moka::sync::Cache<String, RowSet>,
}

impl SqlEvaluator {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            statement_timeout: Duration::from_secs(10),
            reference_cache: moka::sync::Cache::new(4096),
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Expected rows come from the dataset when present, otherwise from the
    /// reference SQL, executed once per question and memoized.
    async fn expected_rows(
        &self,
        q: &Question,
        reference_sql: &str,
        explicit: Option<&[Vec<serde_json::Value>]>,
    ) -> anyhow::Result<RowSet> {
        if let Some(rows) = explicit {
            return Ok(RowSet::from_json_rows(rows));
        }
        if let Some(hit) = self.reference_cache.get(&q.id) {
            return Ok(hit);
        }
        let rows = self
            .store
            .query(reference_sql, self.statement_timeout)
            .await
            .map_err(|e| anyhow::anyhow!("reference query for '{}' failed: {}", q.id, e))?;
        self.reference_cache.insert(q.id.clone(), rows.clone());
        Ok(rows)
    }
}

#[async_trait]
impl Evaluator for SqlEvaluator {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn evaluation_type(&self) -> EvaluationType {
        EvaluationType::Sql
    }

    async fn evaluate(
        &self,
        q: &Question,
        resp: &LlmResponse,
    ) -> anyhow::Result<Evaluation> {
        let GroundTruth::Sql {
            reference_sql,
            expected_rows,
        } = &q.ground_truth
        else {
            anyhow::bail!("question '{}' has no SQL ground truth", q.id);
        };

        let mut components = ScoreComponents::new();
        let mut details = json!({});

        let Some(sql) = extract_sql(&resp.text) else {
            components.push_bool("execution_success", false, COMPONENT_WEIGHT);
            components.push_bool("result_match", false, COMPONENT_WEIGHT);
            details["failure_reason"] = json!(FailureReason::ParseFailure.as_str());
            details["raw_response"] = json!(excerpt(&resp.text));
            return Ok(Evaluation::from_components(components, details));
        };
        details["extracted_sql"] = json!(sql);

        let candidate = match self.store.query(&sql, self.statement_timeout).await {
            Ok(rows) => rows,
            Err(e) => {
                components.push_bool("execution_success", false, COMPONENT_WEIGHT);
                components.push_bool("result_match", false, COMPONENT_WEIGHT);
                details["failure_reason"] = json!(FailureReason::SqlExecutionError.as_str());
                details["error"] = json!(e.to_string());
                return Ok(Evaluation::from_components(components, details));
            }
        };
        components.push_bool("execution_success", true, COMPONENT_WEIGHT);

        let expected = self
            .expected_rows(q, reference_sql, expected_rows.as_deref())
            .await?;
        let matched = candidate.matches(&expected);
        components.push_bool("result_match", matched, COMPONENT_WEIGHT);
        if !matched {
            details["failure_reason"] = json!(FailureReason::ResultMismatch.as_str());
            details["candidate_row_count"] = json!(candidate.len());
            details["expected_row_count"] = json!(expected.len());
        }

        Ok(Evaluation::from_components(components, details))
    }
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```(?:sql)?\s*(.*?)```").expect("hardcoded regex"))
}

fn line_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)--[^\r\n]*").expect("hardcoded regex"))
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("hardcoded regex"))
}

fn keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(SELECT|WITH|INSERT|UPDATE|DELETE|CREATE|DROP|ALTER)\b")
            .expect("hardcoded regex")
    })
}

/// Pulls the first SQL statement out of a completion: code fences and
/// comments stripped, prose before the first statement keyword dropped,
/// everything after the first semicolon ignored.
pub fn extract_sql(response: &str) -> Option<String> {
    if response.trim().is_empty() {
        return None;
    }

    let body = fence_re()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| response.to_string());

    let body = line_comment_re().replace_all(&body, " ");
    let body = block_comment_re().replace_all(&body, " ");

    let start = keyword_re().find(&body)?.start();
    let stmt = &body[start..];
    let stmt = stmt.split(';').next().unwrap_or(stmt);
    let stmt = stmt.split_whitespace().collect::<Vec<_>>().join(" ");

    if stmt.is_empty() {
        None
    } else {
        Some(stmt)
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}
