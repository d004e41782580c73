//! Static description of the relational tables the SQL track targets.

pub mod classify;

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct SchemaTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub purpose: String,
    pub example: String,
    /// Lowercase terms that mark a question as relevant to this table.
    pub vocabulary: Vec<String>,
}

/// Process-lifetime table registry. Iteration follows registration order so
/// rendered schema blocks are deterministic regardless of how the table set
/// was selected.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    tables: Vec<SchemaTable>,
}

impl SchemaRegistry {
    pub fn new(tables: Vec<SchemaTable>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[SchemaTable] {
        &self.tables
    }

    pub fn get(&self, name: &str) -> Option<&SchemaTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Renders a schema block for the named tables. Unknown names simply do
    /// not appear; they never leak through as empty headings.
    pub fn render(&self, names: &[String]) -> String {
        let blocks: Vec<String> = self
            .tables
            .iter()
            .filter(|t| names.iter().any(|n| n == &t.name))
            .map(render_table)
            .collect();

        if blocks.len() > 1 {
            format!(
                "RELEVANT TABLES FOR YOUR QUERY ({} tables):\n\n{}",
                blocks.len(),
                blocks.join("\n---\n")
            )
        } else {
            blocks.into_iter().next().unwrap_or_default()
        }
    }

    /// The built-in government fiscal and economic dataset schema.
    pub fn government_data() -> Self {
        let mut tables = Vec::new();

        tables.push(table(
            "budget_outlays",
            "Government spending data by function and fiscal year",
            "SELECT function_name, SUM(outlay_amount) AS total_outlays FROM budget_outlays \
             WHERE fiscal_year >= 2020 GROUP BY function_name ORDER BY total_outlays DESC LIMIT 10",
            &[
                ("record_id", "INTEGER", "surrogate row key"),
                ("superfunction", "TEXT", "top-level budget grouping"),
                ("function_name", "TEXT", "budget function, e.g. Education"),
                ("fiscal_year", "INTEGER", "federal fiscal year"),
                ("outlay_amount", "REAL", "outlays in billions of dollars"),
                ("unit", "TEXT", "unit of measure"),
                ("source", "TEXT", "publishing agency"),
            ],
            &[
                "outlays", "spending", "budget", "defense", "military", "health",
                "categories", "functions", "departments", "federal",
            ],
        ));

        tables.push(table(
            "time_series_data",
            "Economic indicators and time series data (consumer prices, employment costs, productivity)",
            "SELECT year, numeric_value FROM time_series_data WHERE category = 'consumer_price_index' \
             AND year BETWEEN 2020 AND 2023 ORDER BY year",
            &[
                ("record_id", "INTEGER", "surrogate row key"),
                ("series_id", "TEXT", "provider series identifier"),
                ("indicator_id", "TEXT", "normalized indicator identifier"),
                ("source", "TEXT", "publishing agency"),
                ("category", "TEXT", "indicator category, e.g. consumer_price_index"),
                ("subcategory", "TEXT", "indicator subcategory"),
                ("year", "INTEGER", "observation year"),
                ("period_type", "TEXT", "annual, quarterly or monthly"),
                ("period_value", "TEXT", "period within the year"),
                ("period_name", "TEXT", "human-readable period"),
                ("fiscal_calendar", "TEXT", "fiscal or calendar basis"),
                ("geographic_level", "TEXT", "national, state or metro"),
                ("geographic_code", "TEXT", "geography code"),
                ("geographic_name", "TEXT", "geography name"),
                ("raw_value", "TEXT", "value as published"),
                ("numeric_value", "REAL", "parsed numeric value"),
                ("unit", "TEXT", "unit of measure"),
                ("unit_multiplier", "INTEGER", "power-of-ten multiplier"),
                ("is_estimated", "INTEGER", "1 when the value is estimated"),
                ("footnotes", "TEXT", "provider footnotes"),
            ],
            &[
                "cpi", "consumer price", "inflation", "employment cost", "workers",
                "compensation", "economic indicators", "productivity",
            ],
        ));

        tables.push(table(
            "industry_gdp",
            "GDP contribution by industry over time",
            "SELECT industry_name, gdp_value FROM industry_gdp WHERE year = 2023 \
             ORDER BY gdp_value DESC LIMIT 10",
            &[
                ("record_id", "INTEGER", "surrogate row key"),
                ("industry_code", "TEXT", "industry classification code"),
                ("industry_name", "TEXT", "industry name"),
                ("year", "INTEGER", "observation year"),
                ("gdp_value", "REAL", "value added in billions of dollars"),
                ("unit", "TEXT", "unit of measure"),
                ("unit_multiplier", "INTEGER", "power-of-ten multiplier"),
                ("source", "TEXT", "publishing agency"),
            ],
            &["gdp", "industry", "industries", "contribution", "economic sectors"],
        ));

        tables.push(table(
            "regional_data",
            "Regional economic data by state",
            "SELECT state_name, personal_income FROM regional_data WHERE year = 2023 \
             ORDER BY personal_income DESC LIMIT 10",
            &[
                ("record_id", "INTEGER", "surrogate row key"),
                ("state_code", "TEXT", "two-letter state code"),
                ("state_name", "TEXT", "state name"),
                ("region", "TEXT", "census region"),
                ("year", "INTEGER", "observation year"),
                ("personal_income", "REAL", "total personal income in millions"),
                ("per_capita_income", "REAL", "per-capita personal income"),
                ("population", "INTEGER", "resident population"),
                ("unit", "TEXT", "unit of measure"),
                ("source", "TEXT", "publishing agency"),
            ],
            &[
                "state", "states", "regional", "personal income", "per capita",
                "population",
            ],
        ));

        tables.push(table(
            "gdp_by_industry",
            "Industry contributions to GDP over time",
            "SELECT industry_name, SUM(gdp_contribution) AS total_contribution FROM gdp_by_industry \
             WHERE year = 2023 GROUP BY industry_name ORDER BY total_contribution DESC",
            &[
                ("record_id", "INTEGER", "surrogate row key"),
                ("industry_code", "TEXT", "industry classification code"),
                ("industry_name", "TEXT", "industry name"),
                ("year", "INTEGER", "observation year"),
                ("quarter", "TEXT", "calendar quarter"),
                ("gdp_contribution", "REAL", "contribution in billions of dollars"),
                ("percentage_of_total", "REAL", "share of total GDP"),
                ("unit", "TEXT", "unit of measure"),
                ("source", "TEXT", "publishing agency"),
            ],
            &["gdp", "industry", "industries", "contribution", "economic sectors"],
        ));

        Self::new(tables)
    }
}

fn table(
    name: &str,
    purpose: &str,
    example: &str,
    columns: &[(&str, &str, &str)],
    vocabulary: &[&str],
) -> SchemaTable {
    SchemaTable {
        name: name.to_string(),
        columns: columns
            .iter()
            .map(|(n, t, d)| Column {
                name: n.to_string(),
                ty: t.to_string(),
                description: d.to_string(),
            })
            .collect(),
        purpose: purpose.to_string(),
        example: example.to_string(),
        vocabulary: vocabulary.iter().map(|v| v.to_string()).collect(),
    }
}

fn render_table(t: &SchemaTable) -> String {
    let mut out = String::new();
    out.push_str(&format!("TABLE: {}\n", t.name));
    out.push_str("COLUMNS:\n");
    for c in &t.columns {
        out.push_str(&format!("  {} ({}) - {}\n", c.name, c.ty, c.description));
    }
    out.push_str(&format!("PURPOSE: {}\n", t.purpose));
    out.push_str(&format!("EXAMPLE: {}\n", t.example));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_follows_registration_order() {
        let reg = SchemaRegistry::government_data();
        // Request in reverse order; output must follow registration order.
        let names = vec!["regional_data".to_string(), "budget_outlays".to_string()];
        let text = reg.render(&names);
        let budget = text.find("TABLE: budget_outlays").unwrap();
        let regional = text.find("TABLE: regional_data").unwrap();
        assert!(budget < regional);
    }

    #[test]
    fn unknown_table_does_not_render_empty_heading() {
        let reg = SchemaRegistry::government_data();
        let text = reg.render(&["no_such_table".to_string()]);
        assert!(text.is_empty());
    }

    #[test]
    fn single_table_renders_without_header() {
        let reg = SchemaRegistry::government_data();
        let text = reg.render(&["budget_outlays".to_string()]);
        assert!(text.starts_with("TABLE: budget_outlays"));
        assert!(!text.contains("RELEVANT TABLES"));
    }
}
