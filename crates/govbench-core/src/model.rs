use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationType {
    Sql,
    FunctionCall,
}

impl EvaluationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationType::Sql => "sql",
            EvaluationType::FunctionCall => "function_call",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A scalar function-call parameter. Kept ordered inside a `BTreeMap` so the
/// canonical (function, sorted parameter tuple) shape falls out of iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Converts a raw textual value into the narrowest type it fits.
    pub fn parse(raw: &str) -> ParamValue {
        let s = raw.trim().trim_matches(|c| c == '"' || c == '\'');
        if let Ok(i) = s.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return ParamValue::Float(f);
        }
        match s.to_ascii_lowercase().as_str() {
            "true" => ParamValue::Bool(true),
            "false" => ParamValue::Bool(false),
            _ => ParamValue::Text(s.to_string()),
        }
    }

    pub fn from_json(v: &serde_json::Value) -> Option<ParamValue> {
        match v {
            serde_json::Value::Bool(b) => Some(ParamValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ParamValue::Int(i))
                } else {
                    n.as_f64().map(ParamValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(ParamValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Bool(b) => serde_json::json!(b),
            ParamValue::Int(i) => serde_json::json!(i),
            ParamValue::Float(f) => serde_json::json!(f),
            ParamValue::Text(s) => serde_json::json!(s),
        }
    }

    /// Stable textual form used in cache keys and provider query strings.
    pub fn canonical(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Text(s) => s.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Tolerant comparison: numbers within relative tolerance, strings
    /// trimmed and case-insensitive.
    pub fn matches(&self, other: &ParamValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => crate::store::nearly_equal(a, b),
            _ => match (self, other) {
                (ParamValue::Bool(a), ParamValue::Bool(b)) => a == b,
                (ParamValue::Text(a), ParamValue::Text(b)) => {
                    a.trim().eq_ignore_ascii_case(b.trim())
                }
                _ => false,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

pub type CallParams = BTreeMap<String, ParamValue>;

/// The reference answer a question is scored against. Exactly one shape per
/// question; enforced at dataset load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruth {
    Sql {
        reference_sql: String,
        #[serde(default)]
        expected_rows: Option<Vec<Vec<serde_json::Value>>>,
    },
    Function {
        name: String,
        parameters: CallParams,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub ground_truth: GroundTruth,
}

impl Question {
    pub fn evaluation_type(&self) -> EvaluationType {
        match self.ground_truth {
            GroundTruth::Sql { .. } => EvaluationType::Sql,
            GroundTruth::Function { .. } => EvaluationType::FunctionCall,
        }
    }
}

/// Token counters for a single call or a whole session. Merged explicitly at
/// aggregation time; there is no process-wide accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    pub fn merge(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub usage: Usage,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Pass,
    Partial,
    Fail,
    Error,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Pass => "pass",
            QuestionStatus::Partial => "partial",
            QuestionStatus::Fail => "fail",
            QuestionStatus::Error => "error",
        }
    }
}

/// Named scoring components. Each value is in [0,1]; the total is the
/// weighted sum, itself in [0,1] when weights sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents(Vec<Component>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub value: f64,
    pub weight: f64,
}

impl ScoreComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bool(&mut self, name: &str, passed: bool, weight: f64) {
        self.0.push(Component {
            name: name.to_string(),
            value: if passed { 1.0 } else { 0.0 },
            weight,
        });
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|c| c.name == name).map(|c| c.value)
    }

    pub fn total(&self) -> f64 {
        let sum: f64 = self.0.iter().map(|c| c.value * c.weight).sum();
        sum.clamp(0.0, 1.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub evaluation_type: EvaluationType,
    pub difficulty: Difficulty,
    pub category: String,
    pub status: QuestionStatus,
    pub score: f64,
    pub components: ScoreComponents,
    pub response_text: String,
    pub usage: Usage,
    /// Structured reason plus captured raw payloads for every failure mode;
    /// never raised past the evaluation loop.
    pub execution_details: serde_json::Value,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifacts {
    pub model: String,
    pub started_at: String,
    pub finished_at: String,
    pub results: Vec<QuestionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_value_parses_narrowest_type() {
        assert_eq!(ParamValue::parse("2020"), ParamValue::Int(2020));
        assert_eq!(ParamValue::parse("2.5"), ParamValue::Float(2.5));
        assert_eq!(ParamValue::parse("true"), ParamValue::Bool(true));
        assert_eq!(
            ParamValue::parse("\"CUUR0000SA0\""),
            ParamValue::Text("CUUR0000SA0".into())
        );
    }

    #[test]
    fn param_value_matches_with_tolerance() {
        assert!(ParamValue::Int(2020).matches(&ParamValue::Float(2020.0)));
        assert!(ParamValue::Text("CA ".into()).matches(&ParamValue::Text("ca".into())));
        assert!(!ParamValue::Int(2020).matches(&ParamValue::Int(2021)));
    }

    #[test]
    fn score_total_is_weighted_sum() {
        let mut c = ScoreComponents::new();
        c.push_bool("function_selection", true, 0.25);
        c.push_bool("parameter_accuracy", false, 0.25);
        c.push_bool("execution_success", false, 0.25);
        c.push_bool("result_correctness", false, 0.25);
        assert_eq!(c.total(), 0.25);
        assert_eq!(c.get("function_selection"), Some(1.0));
    }

    #[test]
    fn usage_merge_is_additive() {
        let mut a = Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        let b = Usage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        };
        a.merge(&b);
        assert_eq!(a.total_tokens, 18);
    }
}
