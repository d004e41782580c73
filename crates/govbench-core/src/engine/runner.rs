//! Per-question evaluation loop: classify, prompt, call the model, score.
//!
//! Questions are independent, so a semaphore-bounded worker pool evaluates
//! them concurrently. Model and provider calls are the only suspending
//! operations; both carry timeouts, and a failure aborts only its own
//! question.

use crate::cache::key::response_key;
use crate::config::RunConfig;
use crate::errors::FailureReason;
use crate::evaluator_api::Evaluator;
use crate::executor::registry::FunctionRegistry;
use crate::model::{
    Difficulty, EvaluationType, LlmResponse, Question, QuestionResult, QuestionStatus,
    RunArtifacts, ScoreComponents, Usage,
};
use crate::prompt::{self, EvalPrompt};
use crate::providers::llm::LlmClient;
use crate::retry::RetryPolicy;
use crate::schema::SchemaRegistry;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};

pub struct Runner {
    pub client: Arc<dyn LlmClient>,
    pub schema: Arc<SchemaRegistry>,
    pub functions: Arc<FunctionRegistry>,
    pub evaluators: Vec<Arc<dyn Evaluator>>,
    pub config: RunConfig,
    function_docs: String,
    response_cache: moka::sync::Cache<String, LlmResponse>,
    cancelled: Arc<AtomicBool>,
}

impl Clone for Runner {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            schema: self.schema.clone(),
            functions: self.functions.clone(),
            evaluators: self.evaluators.clone(),
            config: self.config.clone(),
            function_docs: self.function_docs.clone(),
            response_cache: self.response_cache.clone(),
            cancelled: self.cancelled.clone(),
        }
    }
}

impl Runner {
    pub fn new(
        client: Arc<dyn LlmClient>,
        schema: Arc<SchemaRegistry>,
        functions: Arc<FunctionRegistry>,
        evaluators: Vec<Arc<dyn Evaluator>>,
        config: RunConfig,
    ) -> Self {
        let function_docs = functions.docs();
        Self {
            client,
            schema,
            functions,
            evaluators,
            config,
            function_docs,
            response_cache: moka::sync::Cache::new(4096),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag an interrupt handler can set. Once raised, no further
    /// questions are issued; results already completed are kept.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub async fn run(&self, questions: &[Question]) -> anyhow::Result<RunArtifacts> {
        if questions.is_empty() {
            anyhow::bail!("no questions to evaluate");
        }

        let parallel = self.config.settings.parallel.unwrap_or(4).max(1);
        let sem = Arc::new(Semaphore::new(parallel));
        let started_at = chrono::Utc::now().to_rfc3339();
        let mut handles = Vec::new();

        for q in questions {
            if self.cancelled.load(Ordering::Relaxed) {
                tracing::warn!("cancellation requested; no further questions will be issued");
                break;
            }
            let permit = sem.clone().acquire_owned().await?;
            let runner = self.clone();
            let q = q.clone();
            let meta = (
                q.id.clone(),
                q.evaluation_type(),
                q.difficulty,
                q.category.clone(),
            );
            let handle = tokio::spawn(async move {
                let _permit = permit;
                runner.evaluate_question(&q).await
            });
            handles.push((meta, handle));
        }

        let mut results = Vec::new();
        for ((id, eval_type, difficulty, category), handle) in handles {
            match handle.await {
                Ok(row) => results.push(row),
                Err(e) => results.push(errored_result(
                    &id,
                    eval_type,
                    difficulty,
                    &category,
                    FailureReason::ModelUnavailable,
                    format!("join error: {}", e),
                )),
            }
        }

        Ok(RunArtifacts {
            model: self.config.model.clone(),
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            results,
        })
    }

    pub async fn evaluate_question(&self, q: &Question) -> QuestionResult {
        let started = std::time::Instant::now();
        let eval_type = q.evaluation_type();

        let (eval_prompt, mut base_details) = match eval_type {
            EvaluationType::Sql => {
                let tables = self.schema.classify(&q.text);
                tracing::debug!(question = %q.id, ?tables, "classified question");
                let schema_text = self.schema.render(&tables);
                (
                    prompt::sql_prompt(&schema_text, &q.text),
                    json!({ "tables": tables }),
                )
            }
            EvaluationType::FunctionCall => (
                prompt::function_prompt(&self.function_docs, &q.text),
                json!({ "registry_version": self.functions.version() }),
            ),
        };

        let Some(evaluator) = self
            .evaluators
            .iter()
            .find(|e| e.evaluation_type() == eval_type)
        else {
            return errored_result(
                &q.id,
                eval_type,
                q.difficulty,
                &q.category,
                FailureReason::ModelUnavailable,
                format!("no evaluator registered for {}", eval_type.as_str()),
            );
        };

        let resp = match self.call_model(&eval_prompt).await {
            Ok(resp) => resp,
            Err((reason, message)) => {
                tracing::warn!(question = %q.id, %reason, "model call failed");
                base_details["failure_reason"] = json!(reason.as_str());
                base_details["error"] = json!(message);
                return QuestionResult {
                    question_id: q.id.clone(),
                    evaluation_type: eval_type,
                    difficulty: q.difficulty,
                    category: q.category.clone(),
                    status: QuestionStatus::Error,
                    score: 0.0,
                    components: ScoreComponents::new(),
                    response_text: String::new(),
                    usage: Usage::default(),
                    execution_details: base_details,
                    duration_ms: Some(started.elapsed().as_millis() as u64),
                };
            }
        };

        match evaluator.evaluate(q, &resp).await {
            Ok(eval) => {
                let mut details = eval.details;
                if let (Some(d), Some(b)) = (details.as_object_mut(), base_details.as_object()) {
                    for (k, v) in b {
                        d.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                QuestionResult {
                    question_id: q.id.clone(),
                    evaluation_type: eval_type,
                    difficulty: q.difficulty,
                    category: q.category.clone(),
                    status: eval.status,
                    score: eval.score,
                    components: eval.components,
                    response_text: resp.text.clone(),
                    usage: resp.usage,
                    execution_details: details,
                    duration_ms: Some(started.elapsed().as_millis() as u64),
                }
            }
            Err(e) => {
                tracing::warn!(question = %q.id, error = %e, "evaluator error");
                base_details["error"] = json!(format!("{:#}", e));
                base_details["raw_response"] = json!(resp.text);
                QuestionResult {
                    question_id: q.id.clone(),
                    evaluation_type: eval_type,
                    difficulty: q.difficulty,
                    category: q.category.clone(),
                    status: QuestionStatus::Error,
                    score: 0.0,
                    components: ScoreComponents::new(),
                    response_text: resp.text,
                    usage: resp.usage,
                    execution_details: base_details,
                    duration_ms: Some(started.elapsed().as_millis() as u64),
                }
            }
        }
    }

    async fn call_model(&self, prompt: &EvalPrompt) -> Result<LlmResponse, (FailureReason, String)> {
        let key = response_key(&self.config.model, &prompt.system, &prompt.user);
        let use_cache = self.config.settings.cache.unwrap_or(true);
        if use_cache {
            if let Some(hit) = self.response_cache.get(&key) {
                return Ok(hit);
            }
        }

        let deadline = Duration::from_secs(self.config.settings.timeout_seconds.unwrap_or(30));
        let retry = RetryPolicy::with_attempts(self.config.settings.retries.unwrap_or(2) + 1);

        let result = retry
            .run(|| async {
                let resp = timeout(deadline, self.client.complete(prompt))
                    .await
                    .map_err(anyhow::Error::from)??;
                Ok(resp)
            })
            .await;

        match result {
            Ok(resp) => {
                if use_cache {
                    self.response_cache.insert(key, resp.clone());
                }
                Ok(resp)
            }
            Err(exhausted) => {
                let reason = if exhausted
                    .last
                    .downcast_ref::<tokio::time::error::Elapsed>()
                    .is_some()
                {
                    FailureReason::ModelTimeout
                } else {
                    FailureReason::ModelUnavailable
                };
                Err((reason, exhausted.to_string()))
            }
        }
    }
}

fn errored_result(
    id: &str,
    eval_type: EvaluationType,
    difficulty: Difficulty,
    category: &str,
    reason: FailureReason,
    message: String,
) -> QuestionResult {
    QuestionResult {
        question_id: id.to_string(),
        evaluation_type: eval_type,
        difficulty,
        category: category.to_string(),
        status: QuestionStatus::Error,
        score: 0.0,
        components: ScoreComponents::new(),
        response_text: String::new(),
        usage: Usage::default(),
        execution_details: json!({
            "failure_reason": reason.as_str(),
            "error": message,
        }),
        duration_ms: None,
    }
}
