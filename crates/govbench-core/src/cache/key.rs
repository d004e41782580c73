//! Canonical cache keys. Retries and repeated ground-truth calls are safe
//! because identical request shapes always hash to the same key.

use crate::model::CallParams;
use sha2::{Digest, Sha256};

/// Key for a model completion: model id + both prompt halves.
pub fn response_key(model: &str, system: &str, user: &str) -> String {
    let mut h = Sha256::new();
    h.update(model.as_bytes());
    h.update(b"\n");
    h.update(system.as_bytes());
    h.update(b"\n");
    h.update(user.as_bytes());
    hex::encode(h.finalize())
}

/// Key for a live provider call: function name + sorted parameter tuple.
/// `CallParams` is a BTreeMap, so iteration is sorted by construction.
pub fn call_key(function: &str, params: &CallParams) -> String {
    let mut h = Sha256::new();
    h.update(function.as_bytes());
    for (k, v) in params {
        h.update(b"\n");
        h.update(k.as_bytes());
        h.update(b"=");
        h.update(v.canonical().as_bytes());
    }
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamValue;

    #[test]
    fn call_key_is_insensitive_to_insertion_order() {
        let mut a = CallParams::new();
        a.insert("start_year".into(), ParamValue::Int(2020));
        a.insert("end_year".into(), ParamValue::Int(2024));

        let mut b = CallParams::new();
        b.insert("end_year".into(), ParamValue::Int(2024));
        b.insert("start_year".into(), ParamValue::Int(2020));

        assert_eq!(call_key("get_cpi_data", &a), call_key("get_cpi_data", &b));
    }

    #[test]
    fn different_parameters_produce_different_keys() {
        let mut a = CallParams::new();
        a.insert("year".into(), ParamValue::Int(2022));
        let mut b = CallParams::new();
        b.insert("year".into(), ParamValue::Int(2023));
        assert_ne!(
            call_key("get_gdp_by_industry", &a),
            call_key("get_gdp_by_industry", &b)
        );
    }

    #[test]
    fn response_key_separates_prompt_halves() {
        assert_ne!(
            response_key("m", "a", "b"),
            response_key("m", "ab", "")
        );
    }
}
