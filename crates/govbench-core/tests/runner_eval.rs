//! End-to-end runner behavior with an in-process model client.

use async_trait::async_trait;
use govbench_core::config::RunConfig;
use govbench_core::engine::runner::Runner;
use govbench_core::evaluator_api::{Evaluation, Evaluator};
use govbench_core::executor::registry::FunctionRegistry;
use govbench_core::model::{
    Difficulty, EvaluationType, GroundTruth, LlmResponse, Question, QuestionStatus,
    ScoreComponents, Usage,
};
use govbench_core::prompt::EvalPrompt;
use govbench_core::providers::llm::LlmClient;
use govbench_core::schema::SchemaRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FakeClient {
    reply: String,
    calls: AtomicU64,
    delay: Option<Duration>,
}

impl FakeClient {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicU64::new(0),
            delay: None,
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            calls: AtomicU64::new(0),
            delay: Some(Duration::from_secs(3600)),
        })
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, _prompt: &EvalPrompt) -> anyhow::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        Ok(LlmResponse {
            text: self.reply.clone(),
            provider: "fake".to_string(),
            model: "fake-model".to_string(),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            latency_ms: 0,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Passes whenever the completion contains a SELECT statement.
struct SelectEvaluator;

#[async_trait]
impl Evaluator for SelectEvaluator {
    fn name(&self) -> &'static str {
        "select_check"
    }

    fn evaluation_type(&self) -> EvaluationType {
        EvaluationType::Sql
    }

    async fn evaluate(
        &self,
        _question: &Question,
        resp: &LlmResponse,
    ) -> anyhow::Result<Evaluation> {
        let passed = resp.text.to_uppercase().contains("SELECT");
        let mut components = ScoreComponents::new();
        components.push_bool("execution_success", passed, 0.5);
        components.push_bool("result_match", passed, 0.5);
        Ok(Evaluation::from_components(
            components,
            serde_json::json!({}),
        ))
    }
}

fn sql_question(id: &str) -> Question {
    Question {
        id: id.to_string(),
        text: "What was the education budget in 2022?".to_string(),
        difficulty: Difficulty::Easy,
        category: "budget".to_string(),
        ground_truth: GroundTruth::Sql {
            reference_sql: "SELECT outlay_amount FROM budget_outlays".to_string(),
            expected_rows: None,
        },
    }
}

fn runner(client: Arc<dyn LlmClient>, config: RunConfig) -> Runner {
    Runner::new(
        client,
        Arc::new(SchemaRegistry::government_data()),
        Arc::new(FunctionRegistry::live_providers().unwrap()),
        vec![Arc::new(SelectEvaluator)],
        config,
    )
}

#[tokio::test]
async fn batch_evaluates_every_question() -> anyhow::Result<()> {
    let client = FakeClient::replying("SELECT outlay_amount FROM budget_outlays");
    let r = runner(client, RunConfig::new("fake:model"));

    let questions = vec![sql_question("q1"), sql_question("q2"), sql_question("q3")];
    let artifacts = r.run(&questions).await?;

    assert_eq!(artifacts.results.len(), 3);
    assert!(artifacts
        .results
        .iter()
        .all(|r| r.status == QuestionStatus::Pass));
    assert_eq!(artifacts.results[0].usage.total_tokens, 15);
    Ok(())
}

#[tokio::test]
async fn identical_prompts_hit_the_response_cache() -> anyhow::Result<()> {
    let client = FakeClient::replying("SELECT 1");
    let mut config = RunConfig::new("fake:model");
    config.settings.parallel = Some(1);
    let r = runner(client.clone(), config);

    // Same question id and text twice; the second completion is cached.
    let questions = vec![sql_question("q1"), sql_question("q1")];
    let artifacts = r.run(&questions).await?;

    assert_eq!(artifacts.results.len(), 2);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn model_timeout_marks_only_that_question_errored() -> anyhow::Result<()> {
    let client = FakeClient::hanging();
    let mut config = RunConfig::new("fake:model");
    config.settings.timeout_seconds = Some(1);
    config.settings.retries = Some(0);
    let r = runner(client, config);

    let artifacts = r.run(&[sql_question("q1")]).await?;
    let row = &artifacts.results[0];
    assert_eq!(row.status, QuestionStatus::Error);
    assert_eq!(row.score, 0.0);
    assert_eq!(
        row.execution_details["failure_reason"],
        serde_json::json!("model_timeout")
    );
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_issuing_new_questions() -> anyhow::Result<()> {
    let client = FakeClient::replying("SELECT 1");
    let r = runner(client, RunConfig::new("fake:model"));
    r.cancel_flag().store(true, std::sync::atomic::Ordering::Relaxed);

    let artifacts = r.run(&[sql_question("q1"), sql_question("q2")]).await?;
    assert!(artifacts.results.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_evaluator_is_a_per_question_error() -> anyhow::Result<()> {
    let client = FakeClient::replying("Function: get_cpi_data\nParameters: start_year=2020");
    let r = runner(client, RunConfig::new("fake:model"));

    let mut q = sql_question("fc1");
    q.ground_truth = GroundTruth::Function {
        name: "get_cpi_data".to_string(),
        parameters: Default::default(),
    };

    let artifacts = r.run(&[q]).await?;
    assert_eq!(artifacts.results[0].status, QuestionStatus::Error);
    Ok(())
}

#[tokio::test]
async fn empty_batch_is_fatal() {
    let client = FakeClient::replying("SELECT 1");
    let r = runner(client, RunConfig::new("fake:model"));
    assert!(r.run(&[]).await.is_err());
}
