//! Conversion of already-loaded dataset records into typed questions.
//!
//! File I/O belongs to the surrounding harness; the engine only accepts JSON
//! values and validates them eagerly so shape problems fail the run up front
//! instead of surfacing as evaluator-time errors.

use crate::errors::DatasetError;
use crate::model::{CallParams, Difficulty, GroundTruth, ParamValue, Question};

pub fn questions_from_records(records: &[serde_json::Value]) -> Result<Vec<Question>, DatasetError> {
    records.iter().map(question_from_record).collect()
}

pub fn question_from_record(rec: &serde_json::Value) -> Result<Question, DatasetError> {
    let obj = rec
        .as_object()
        .ok_or_else(|| DatasetError("record is not a JSON object".into()))?;

    let id = req_str(obj, "id")?;
    let text = req_str(obj, "question_text")?;
    let difficulty_raw = req_str(obj, "difficulty")?;
    let difficulty = Difficulty::parse(&difficulty_raw).ok_or_else(|| {
        DatasetError(format!(
            "record '{}': unknown difficulty '{}'",
            id, difficulty_raw
        ))
    })?;
    let category = req_str(obj, "category")?;

    let has_sql = obj.contains_key("reference_sql");
    let has_function = obj.contains_key("expected_function");
    let ground_truth = match (has_sql, has_function) {
        (true, true) => {
            return Err(DatasetError(format!(
                "record '{}': carries both reference_sql and expected_function",
                id
            )))
        }
        (false, false) => {
            return Err(DatasetError(format!(
                "record '{}': missing reference_sql or expected_function",
                id
            )))
        }
        (true, false) => GroundTruth::Sql {
            reference_sql: req_str(obj, "reference_sql")?,
            expected_rows: expected_rows(obj, &id)?,
        },
        (false, true) => GroundTruth::Function {
            name: req_str(obj, "expected_function")?,
            parameters: expected_parameters(obj, &id)?,
        },
    };

    Ok(Question {
        id,
        text,
        difficulty,
        category,
        ground_truth,
    })
}

fn req_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<String, DatasetError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| DatasetError(format!("missing or non-string field '{}'", field)))
}

fn expected_parameters(
    obj: &serde_json::Map<String, serde_json::Value>,
    id: &str,
) -> Result<CallParams, DatasetError> {
    let raw = obj.get("expected_parameters").ok_or_else(|| {
        DatasetError(format!("record '{}': missing expected_parameters", id))
    })?;
    let map = raw.as_object().ok_or_else(|| {
        DatasetError(format!("record '{}': expected_parameters is not an object", id))
    })?;

    let mut params = CallParams::new();
    for (k, v) in map {
        let value = ParamValue::from_json(v).ok_or_else(|| {
            DatasetError(format!(
                "record '{}': parameter '{}' is not a scalar",
                id, k
            ))
        })?;
        params.insert(k.clone(), value);
    }
    Ok(params)
}

/// `expected_result` accepts rows as arrays of values, or as objects whose
/// values are taken in key order so the comparison stays deterministic.
fn expected_rows(
    obj: &serde_json::Map<String, serde_json::Value>,
    id: &str,
) -> Result<Option<Vec<Vec<serde_json::Value>>>, DatasetError> {
    let Some(raw) = obj.get("expected_result") else {
        return Ok(None);
    };
    let rows = raw.as_array().ok_or_else(|| {
        DatasetError(format!("record '{}': expected_result is not an array", id))
    })?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            serde_json::Value::Array(cells) => out.push(cells.clone()),
            serde_json::Value::Object(m) => {
                let ordered: std::collections::BTreeMap<_, _> = m.iter().collect();
                out.push(ordered.values().map(|v| (*v).clone()).collect());
            }
            other => out.push(vec![other.clone()]),
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sql_record_converts() {
        let rec = json!({
            "id": "sql_001",
            "question_text": "What was the education budget in 2022?",
            "difficulty": "easy",
            "category": "budget",
            "reference_sql": "SELECT outlay_amount FROM budget_outlays WHERE fiscal_year = 2022",
            "expected_result": [[80.3]]
        });
        let q = question_from_record(&rec).unwrap();
        assert_eq!(q.id, "sql_001");
        match q.ground_truth {
            GroundTruth::Sql { expected_rows, .. } => {
                assert_eq!(expected_rows.unwrap()[0][0], json!(80.3));
            }
            _ => panic!("expected SQL ground truth"),
        }
    }

    #[test]
    fn function_record_converts() {
        let rec = json!({
            "id": "fc_001",
            "question_text": "How did CPI change from 2020 to 2023?",
            "difficulty": "medium",
            "category": "economic_indicators",
            "expected_function": "get_cpi_data",
            "expected_parameters": {"start_year": 2020, "end_year": 2023}
        });
        let q = question_from_record(&rec).unwrap();
        match q.ground_truth {
            GroundTruth::Function { name, parameters } => {
                assert_eq!(name, "get_cpi_data");
                assert_eq!(parameters.get("start_year"), Some(&ParamValue::Int(2020)));
            }
            _ => panic!("expected function ground truth"),
        }
    }

    #[test]
    fn missing_required_field_fails_fast() {
        let rec = json!({
            "id": "bad_001",
            "difficulty": "easy",
            "category": "budget",
            "reference_sql": "SELECT 1"
        });
        let err = question_from_record(&rec).unwrap_err();
        assert!(err.to_string().contains("question_text"));
    }

    #[test]
    fn both_ground_truth_shapes_rejected() {
        let rec = json!({
            "id": "bad_002",
            "question_text": "?",
            "difficulty": "easy",
            "category": "budget",
            "reference_sql": "SELECT 1",
            "expected_function": "get_cpi_data",
            "expected_parameters": {}
        });
        assert!(question_from_record(&rec).is_err());
    }
}
