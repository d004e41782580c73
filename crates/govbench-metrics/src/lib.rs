use std::sync::Arc;

use govbench_core::evaluator_api::Evaluator;
use govbench_core::executor::ApiExecutor;
use govbench_core::store::Store;

pub mod aggregate;
pub mod function_call;
pub mod sql;

/// The standard evaluator pair: SQL against the relational snapshot,
/// function calls against the live-provider executor.
pub fn default_evaluators(store: Store, executor: Arc<ApiExecutor>) -> Vec<Arc<dyn Evaluator>> {
    vec![
        Arc::new(sql::SqlEvaluator::new(store)),
        Arc::new(function_call::FunctionCallEvaluator::new(executor)),
    ]
}
