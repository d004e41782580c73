use crate::model::{EvaluationType, LlmResponse, Question, QuestionStatus, ScoreComponents};
use async_trait::async_trait;

/// The outcome of scoring one completion against one question.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub status: QuestionStatus,
    pub score: f64,
    pub components: ScoreComponents,
    pub details: serde_json::Value,
}

impl Evaluation {
    /// Derives score and status from the components. Full marks pass,
    /// zero fails, anything between is partial credit.
    pub fn from_components(components: ScoreComponents, details: serde_json::Value) -> Self {
        let score = components.total();
        let status = if score >= 1.0 {
            QuestionStatus::Pass
        } else if score <= 0.0 {
            QuestionStatus::Fail
        } else {
            QuestionStatus::Partial
        };
        Self {
            status,
            score,
            components,
            details,
        }
    }
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluation_type(&self) -> EvaluationType;
    async fn evaluate(
        &self,
        question: &Question,
        resp: &LlmResponse,
    ) -> anyhow::Result<Evaluation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derivation() {
        let mut c = ScoreComponents::new();
        c.push_bool("execution_success", true, 0.5);
        c.push_bool("result_match", true, 0.5);
        let e = Evaluation::from_components(c, serde_json::json!({}));
        assert_eq!(e.status, QuestionStatus::Pass);
        assert_eq!(e.score, 1.0);

        let mut c = ScoreComponents::new();
        c.push_bool("execution_success", true, 0.5);
        c.push_bool("result_match", false, 0.5);
        let e = Evaluation::from_components(c, serde_json::json!({}));
        assert_eq!(e.status, QuestionStatus::Partial);
        assert_eq!(e.score, 0.5);

        let mut c = ScoreComponents::new();
        c.push_bool("execution_success", false, 0.5);
        c.push_bool("result_match", false, 0.5);
        let e = Evaluation::from_components(c, serde_json::json!({}));
        assert_eq!(e.status, QuestionStatus::Fail);
    }
}
