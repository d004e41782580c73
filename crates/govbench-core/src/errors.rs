use serde::{Deserialize, Serialize};

/// Per-question failure taxonomy. Every variant is recovered locally and
/// surfaced through `execution_details`; none aborts a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ParseFailure,
    SqlExecutionError,
    ResultMismatch,
    ModelTimeout,
    ModelUnavailable,
    UnknownFunction,
    ParameterOutOfRange,
    ParameterMismatch,
    ApiExecutionError,
    RateLimitExceeded,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ParseFailure => "parse_failure",
            FailureReason::SqlExecutionError => "sql_execution_error",
            FailureReason::ResultMismatch => "result_mismatch",
            FailureReason::ModelTimeout => "model_timeout",
            FailureReason::ModelUnavailable => "model_unavailable",
            FailureReason::UnknownFunction => "unknown_function",
            FailureReason::ParameterOutOfRange => "parameter_out_of_range",
            FailureReason::ParameterMismatch => "parameter_mismatch",
            FailureReason::ApiExecutionError => "api_execution_error",
            FailureReason::RateLimitExceeded => "rate_limit_exceeded",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for FailureReason {}

#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Load-time validation failure for a dataset record. Raised before any
/// per-question evaluation starts, so it is fatal to the run.
#[derive(Debug)]
pub struct DatasetError(pub String);

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dataset error: {}", self.0)
    }
}

impl std::error::Error for DatasetError {}

#[derive(Debug)]
pub struct SqlExecError(pub String);

impl std::fmt::Display for SqlExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sql execution failed: {}", self.0)
    }
}

impl std::error::Error for SqlExecError {}
