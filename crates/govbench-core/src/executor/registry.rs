//! The fixed, versioned registry of callable data-retrieval functions.
//!
//! Parameter shape is validated with a compiled JSON Schema per function;
//! range and ordering rules that a schema cannot express (start/end year
//! ordering) are checked alongside it.

use crate::model::{CallParams, ParamValue};
use anyhow::Context;
use serde_json::json;

pub const DATA_YEAR_MIN: i64 = 2014;
pub const DATA_YEAR_MAX: i64 = 2024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    LaborStatistics,
    EconomicAnalysis,
}

impl ProviderFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::LaborStatistics => "labor_statistics",
            ProviderFamily::EconomicAnalysis => "economic_analysis",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ParamKind {
    Integer { min: Option<i64>, max: Option<i64> },
    Text,
}

#[derive(Debug, Clone)]
pub struct ParamDoc {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Result of validating a merged parameter map against a spec.
#[derive(Debug, Clone, Default)]
pub struct ParamViolations {
    pub messages: Vec<String>,
    /// Set when a value breaks a numeric range or ordering rule; such calls
    /// must never be dispatched to the network.
    pub out_of_range: bool,
}

impl ParamViolations {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub struct FunctionSpec {
    pub name: String,
    pub family: ProviderFamily,
    pub description: String,
    /// Provider-side dataset the call routes to (economic-analysis only).
    pub dataset: Option<String>,
    pub params: Vec<ParamDoc>,
    pub defaults: CallParams,
    /// (low, high) pair whose values must satisfy low <= high.
    pub year_order: Option<(String, String)>,
    schema: jsonschema::JSONSchema,
}

impl FunctionSpec {
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: &str,
        family: ProviderFamily,
        description: &str,
        dataset: Option<&str>,
        params: Vec<ParamDoc>,
        defaults: CallParams,
        year_order: Option<(&str, &str)>,
    ) -> anyhow::Result<Self> {
        let schema_json = schema_for(&params);
        let schema = jsonschema::JSONSchema::options()
            .compile(&schema_json)
            .map_err(|e| anyhow::anyhow!("schema compile failed for '{}': {}", name, e))?;
        Ok(Self {
            name: name.to_string(),
            family,
            description: description.to_string(),
            dataset: dataset.map(|d| d.to_string()),
            params,
            defaults,
            year_order: year_order.map(|(a, b)| (a.to_string(), b.to_string())),
            schema,
        })
    }

    /// Overlays the caller's parameters on the spec defaults.
    pub fn apply_defaults(&self, given: &CallParams) -> CallParams {
        let mut merged = self.defaults.clone();
        for (k, v) in given {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Validates an already-merged parameter map.
    pub fn validate(&self, merged: &CallParams) -> ParamViolations {
        let mut violations = ParamViolations::default();

        let instance = params_to_json(merged);
        if let Err(errors) = self.schema.validate(&instance) {
            for e in errors {
                violations.messages.push(format!("{}: {}", e.instance_path, e));
            }
        }

        for p in &self.params {
            if let (ParamKind::Integer { min, max }, Some(ParamValue::Int(v))) =
                (&p.kind, merged.get(&p.name))
            {
                if min.map_or(false, |lo| *v < lo) || max.map_or(false, |hi| *v > hi) {
                    violations.out_of_range = true;
                }
            }
        }

        if let Some((lo, hi)) = &self.year_order {
            if let (Some(ParamValue::Int(a)), Some(ParamValue::Int(b))) =
                (merged.get(lo), merged.get(hi))
            {
                if a > b {
                    violations
                        .messages
                        .push(format!("{} must not exceed {}", lo, hi));
                    violations.out_of_range = true;
                }
            }
        }

        violations
    }
}

fn schema_for(params: &[ParamDoc]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for p in params {
        let prop = match &p.kind {
            ParamKind::Integer { min, max } => {
                let mut m = json!({ "type": "integer" });
                if let Some(lo) = min {
                    m["minimum"] = json!(lo);
                }
                if let Some(hi) = max {
                    m["maximum"] = json!(hi);
                }
                m
            }
            ParamKind::Text => json!({ "type": "string" }),
        };
        properties.insert(p.name.clone(), prop);
        if p.required {
            required.push(p.name.clone());
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn params_to_json(params: &CallParams) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (k, v) in params {
        map.insert(k.clone(), v.as_json());
    }
    serde_json::Value::Object(map)
}

pub struct FunctionRegistry {
    version: String,
    specs: Vec<FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new(version: &str, specs: Vec<FunctionSpec>) -> Self {
        Self {
            version: version.to_string(),
            specs,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn specs(&self) -> &[FunctionSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Prompt-facing documentation for every registered function.
    pub fn docs(&self) -> String {
        let mut out = String::new();
        for family in [
            ProviderFamily::LaborStatistics,
            ProviderFamily::EconomicAnalysis,
        ] {
            let heading = match family {
                ProviderFamily::LaborStatistics => "# Labor Statistics Functions",
                ProviderFamily::EconomicAnalysis => "# Economic Analysis Functions",
            };
            out.push_str(heading);
            out.push('\n');
            for spec in self.specs.iter().filter(|s| s.family == family) {
                out.push_str(&format!("\n## {}\n{}\nParameters:\n", spec.name, spec.description));
                for p in &spec.params {
                    let ty = match p.kind {
                        ParamKind::Integer { .. } => "integer",
                        ParamKind::Text => "string",
                    };
                    let requirement = if p.required { "required" } else { "optional" };
                    let default = spec
                        .defaults
                        .get(&p.name)
                        .map(|v| format!(" (default: {})", v.canonical()))
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "- {} ({}, {}): {}{}\n",
                        p.name, ty, requirement, p.description, default
                    ));
                }
            }
            out.push('\n');
        }
        out
    }

    /// The built-in registry of live data-provider calls.
    pub fn live_providers() -> anyhow::Result<Self> {
        let year = |name: &str, required: bool, desc: &str| ParamDoc {
            name: name.to_string(),
            kind: ParamKind::Integer {
                min: Some(DATA_YEAR_MIN),
                max: Some(DATA_YEAR_MAX),
            },
            required,
            description: format!("{} ({}-{})", desc, DATA_YEAR_MIN, DATA_YEAR_MAX),
        };
        let text = |name: &str, required: bool, desc: &str| ParamDoc {
            name: name.to_string(),
            kind: ParamKind::Text,
            required,
            description: desc.to_string(),
        };
        let defaults = |entries: &[(&str, ParamValue)]| -> CallParams {
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect()
        };

        let specs = vec![
            FunctionSpec::new(
                "get_cpi_data",
                ProviderFamily::LaborStatistics,
                "Retrieve Consumer Price Index data",
                None,
                vec![
                    text("series_id", false, "Series ID for CPI data"),
                    year("start_year", true, "Start year for data retrieval"),
                    year("end_year", true, "End year for data retrieval"),
                ],
                defaults(&[("series_id", ParamValue::Text("CUUR0000SA0".into()))]),
                Some(("start_year", "end_year")),
            )
            .context("get_cpi_data")?,
            FunctionSpec::new(
                "get_employment_cost_index",
                ProviderFamily::LaborStatistics,
                "Retrieve Employment Cost Index data",
                None,
                vec![
                    text("series_id", false, "Series ID for ECI data"),
                    year("start_year", true, "Start year for data retrieval"),
                    year("end_year", true, "End year for data retrieval"),
                ],
                defaults(&[("series_id", ParamValue::Text("CIU1010000000000I".into()))]),
                Some(("start_year", "end_year")),
            )
            .context("get_employment_cost_index")?,
            FunctionSpec::new(
                "get_productivity_data",
                ProviderFamily::LaborStatistics,
                "Retrieve labor productivity data",
                None,
                vec![
                    text("series_id", false, "Series ID for productivity data"),
                    year("start_year", true, "Start year for data retrieval"),
                    year("end_year", true, "End year for data retrieval"),
                ],
                defaults(&[("series_id", ParamValue::Text("PRS85006092".into()))]),
                Some(("start_year", "end_year")),
            )
            .context("get_productivity_data")?,
            FunctionSpec::new(
                "get_gdp_by_industry",
                ProviderFamily::EconomicAnalysis,
                "Retrieve GDP by industry data",
                Some("GDPbyIndustry"),
                vec![
                    year("year", true, "Year for GDP data"),
                    text("industry", false, "Industry code or 'ALL'"),
                    text("table_id", false, "Table identifier"),
                ],
                defaults(&[
                    ("industry", ParamValue::Text("ALL".into())),
                    ("table_id", ParamValue::Text("1".into())),
                ]),
                None,
            )
            .context("get_gdp_by_industry")?,
            FunctionSpec::new(
                "get_regional_income",
                ProviderFamily::EconomicAnalysis,
                "Retrieve regional personal income data",
                Some("Regional"),
                vec![
                    text("state", true, "State name or FIPS code"),
                    year("year", true, "Year for income data"),
                    text("line_code", false, "Line code for a specific income measure"),
                ],
                defaults(&[("line_code", ParamValue::Text("SA1-1".into()))]),
                None,
            )
            .context("get_regional_income")?,
        ];

        Ok(Self::new("live-providers/v1", specs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FunctionRegistry {
        FunctionRegistry::live_providers().unwrap()
    }

    fn params(entries: &[(&str, ParamValue)]) -> CallParams {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn valid_parameters_pass() {
        let reg = registry();
        let spec = reg.get("get_cpi_data").unwrap();
        let merged = spec.apply_defaults(&params(&[
            ("start_year", ParamValue::Int(2020)),
            ("end_year", ParamValue::Int(2024)),
        ]));
        let v = spec.validate(&merged);
        assert!(v.is_empty(), "unexpected violations: {:?}", v.messages);
    }

    #[test]
    fn year_outside_range_is_out_of_range() {
        let reg = registry();
        let spec = reg.get("get_cpi_data").unwrap();
        let merged = spec.apply_defaults(&params(&[
            ("start_year", ParamValue::Int(2025)),
            ("end_year", ParamValue::Int(2025)),
        ]));
        let v = spec.validate(&merged);
        assert!(!v.is_empty());
        assert!(v.out_of_range);
    }

    #[test]
    fn start_after_end_is_out_of_range() {
        let reg = registry();
        let spec = reg.get("get_cpi_data").unwrap();
        let merged = spec.apply_defaults(&params(&[
            ("start_year", ParamValue::Int(2023)),
            ("end_year", ParamValue::Int(2020)),
        ]));
        let v = spec.validate(&merged);
        assert!(v.out_of_range);
        assert!(v.messages.iter().any(|m| m.contains("start_year")));
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let reg = registry();
        let spec = reg.get("get_regional_income").unwrap();
        let merged = spec.apply_defaults(&params(&[("year", ParamValue::Int(2023))]));
        let v = spec.validate(&merged);
        assert!(!v.is_empty());
        assert!(!v.out_of_range);
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let reg = registry();
        let spec = reg.get("get_gdp_by_industry").unwrap();
        let merged = spec.apply_defaults(&params(&[
            ("year", ParamValue::Int(2023)),
            ("quarter", ParamValue::Text("Q1".into())),
        ]));
        assert!(!spec.validate(&merged).is_empty());
    }

    #[test]
    fn defaults_fill_missing_optional_parameters() {
        let reg = registry();
        let spec = reg.get("get_cpi_data").unwrap();
        let merged = spec.apply_defaults(&params(&[
            ("start_year", ParamValue::Int(2020)),
            ("end_year", ParamValue::Int(2024)),
        ]));
        assert_eq!(
            merged.get("series_id"),
            Some(&ParamValue::Text("CUUR0000SA0".into()))
        );
    }

    #[test]
    fn docs_list_every_function() {
        let reg = registry();
        let docs = reg.docs();
        for spec in reg.specs() {
            assert!(docs.contains(&format!("## {}", spec.name)));
        }
        assert!(docs.contains("default: CUUR0000SA0"));
    }
}
