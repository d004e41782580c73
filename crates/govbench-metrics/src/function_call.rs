//! Function-calling scoring: selection, parameters, execution, result.
//!
//! Four strictly boolean components, 0.25 each. A component that fails never
//! lets a later one pass (a call that was not dispatched cannot succeed),
//! but an earlier component keeps whatever value it already earned.

use async_trait::async_trait;
use govbench_core::errors::FailureReason;
use govbench_core::evaluator_api::{Evaluation, Evaluator};
use govbench_core::executor::{payload_has_data, ApiExecutor};
use govbench_core::model::{
    CallParams, EvaluationType, GroundTruth, LlmResponse, ParamValue, Question, ScoreComponents,
};
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, OnceLock};

const COMPONENT_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub name: String,
    pub parameters: CallParams,
}

pub struct FunctionCallEvaluator {
    executor: Arc<ApiExecutor>,
}

impl FunctionCallEvaluator {
    pub fn new(executor: Arc<ApiExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Evaluator for FunctionCallEvaluator {
    fn name(&self) -> &'static str {
        "function_call"
    }

    fn evaluation_type(&self) -> EvaluationType {
        EvaluationType::FunctionCall
    }

    async fn evaluate(
        &self,
        q: &Question,
        resp: &LlmResponse,
    ) -> anyhow::Result<Evaluation> {
        let GroundTruth::Function {
            name: expected_name,
            parameters: expected_params,
        } = &q.ground_truth
        else {
            anyhow::bail!("question '{}' has no function ground truth", q.id);
        };

        let registry = self.executor.registry();
        let expected_spec = registry.get(expected_name).ok_or_else(|| {
            anyhow::anyhow!(
                "question '{}' expects '{}', which is not in registry {}",
                q.id,
                expected_name,
                registry.version()
            )
        })?;

        let mut components = ScoreComponents::new();
        let mut details = json!({
            "expected_function": expected_name,
        });

        let Some(call) = parse_function_call(&resp.text) else {
            components.push_bool("function_selection", false, COMPONENT_WEIGHT);
            components.push_bool("parameter_accuracy", false, COMPONENT_WEIGHT);
            components.push_bool("execution_success", false, COMPONENT_WEIGHT);
            components.push_bool("result_correctness", false, COMPONENT_WEIGHT);
            details["failure_reason"] = json!(FailureReason::ParseFailure.as_str());
            details["raw_response"] = json!(excerpt(&resp.text));
            return Ok(Evaluation::from_components(components, details));
        };

        details["predicted_function"] = json!(call.name);
        details["predicted_parameters"] =
            json!(call.parameters.iter().map(|(k, v)| (k.clone(), v.as_json())).collect::<serde_json::Map<_, _>>());

        // 1. Selection: the right name, and a name the registry knows.
        let in_registry = registry.contains(&call.name);
        let selection = in_registry && call.name == *expected_name;
        components.push_bool("function_selection", selection, COMPONENT_WEIGHT);
        if !in_registry {
            details["failure_reason"] = json!(FailureReason::UnknownFunction.as_str());
        }

        // 2. Parameters: shape, ranges and agreement with the ground truth.
        // Only meaningful once the right function was chosen.
        let mut parameters_ok = false;
        if selection {
            let merged = expected_spec.apply_defaults(&call.parameters);
            let violations = expected_spec.validate(&merged);
            if !violations.is_empty() {
                details["parameter_violations"] = json!(violations.messages);
                details["failure_reason"] = json!(if violations.out_of_range {
                    FailureReason::ParameterOutOfRange.as_str()
                } else {
                    FailureReason::ParameterMismatch.as_str()
                });
            } else {
                let expected_merged = expected_spec.apply_defaults(expected_params);
                parameters_ok = params_match(&merged, &expected_merged);
                if !parameters_ok {
                    details["failure_reason"] = json!(FailureReason::ParameterMismatch.as_str());
                }
            }
        }
        components.push_bool("parameter_accuracy", parameters_ok, COMPONENT_WEIGHT);

        // 3 + 4. Dispatch only behind the parameter gate; an invalid call
        // must never reach the network.
        if !parameters_ok {
            components.push_bool("execution_success", false, COMPONENT_WEIGHT);
            components.push_bool("result_correctness", false, COMPONENT_WEIGHT);
            details["dispatched"] = json!(false);
            return Ok(Evaluation::from_components(components, details));
        }

        let outcome = self.executor.call(&call.name, &call.parameters).await;
        details["dispatched"] = json!(true);
        details["served_from_cache"] = json!(outcome.cached);
        components.push_bool("execution_success", outcome.success, COMPONENT_WEIGHT);

        let correct = outcome.success && payload_has_data(expected_spec.family, &outcome.payload);
        components.push_bool("result_correctness", correct, COMPONENT_WEIGHT);

        if !outcome.success {
            details["failure_reason"] = json!(outcome
                .reason
                .unwrap_or(FailureReason::ApiExecutionError)
                .as_str());
            details["error"] = json!(outcome.error);
        } else if !correct {
            details["failure_reason"] = json!(FailureReason::ResultMismatch.as_str());
        }

        Ok(Evaluation::from_components(components, details))
    }
}

fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Function:\s*([A-Za-z0-9_]+)\s+Parameters:\s*([^\r\n]*)")
            .expect("hardcoded regex")
    })
}

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*([^,]+)").expect("hardcoded regex")
    })
}

/// Parses the literal two-line call format:
///
/// ```text
/// Function: get_cpi_data
/// Parameters: series_id=CUUR0000SA0, start_year=2020, end_year=2024
/// ```
///
/// The single-line variant is tolerated; anything else is a parse failure.
pub fn parse_function_call(response: &str) -> Option<ParsedCall> {
    let caps = call_re().captures(response)?;
    let name = caps.get(1)?.as_str().to_string();

    let mut parameters = CallParams::new();
    if let Some(raw) = caps.get(2) {
        for pair in param_re().captures_iter(raw.as_str()) {
            let key = pair.get(1)?.as_str().to_string();
            let value = ParamValue::parse(pair.get(2)?.as_str());
            parameters.insert(key, value);
        }
    }

    Some(ParsedCall { name, parameters })
}

fn params_match(predicted: &CallParams, expected: &CallParams) -> bool {
    if predicted.len() != expected.len() {
        return false;
    }
    expected
        .iter()
        .all(|(k, ev)| predicted.get(k).map_or(false, |pv| pv.matches(ev)))
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_line_format() {
        let call = parse_function_call(
            "Function: get_cpi_data\nParameters: series_id=CUUR0000SA0, start_year=2020, end_year=2024",
        )
        .unwrap();
        assert_eq!(call.name, "get_cpi_data");
        assert_eq!(call.parameters.get("start_year"), Some(&ParamValue::Int(2020)));
        assert_eq!(
            call.parameters.get("series_id"),
            Some(&ParamValue::Text("CUUR0000SA0".into()))
        );
    }

    #[test]
    fn parses_single_line_variant() {
        let call =
            parse_function_call("Function: get_regional_income Parameters: state=CA, year=2023")
                .unwrap();
        assert_eq!(call.name, "get_regional_income");
        assert_eq!(call.parameters.get("year"), Some(&ParamValue::Int(2023)));
    }

    #[test]
    fn parses_empty_parameter_list() {
        let call = parse_function_call("Function: get_cpi_data\nParameters: ").unwrap();
        assert!(call.parameters.is_empty());
    }

    #[test]
    fn free_text_is_a_parse_failure() {
        assert!(parse_function_call("You should use the CPI API for this.").is_none());
        assert!(parse_function_call("get_cpi_data(start_year=2020)").is_none());
    }

    #[test]
    fn quoted_values_are_unquoted() {
        let call = parse_function_call("Function: get_regional_income\nParameters: state=\"CA\", year=2023")
            .unwrap();
        assert_eq!(call.parameters.get("state"), Some(&ParamValue::Text("CA".into())));
    }
}
