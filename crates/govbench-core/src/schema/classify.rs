//! Keyword-based question-to-table classification.

use super::SchemaRegistry;

impl SchemaRegistry {
    /// Selects the tables whose vocabulary appears in the question.
    ///
    /// Matching is case-insensitive substring search; the result follows
    /// registration order. When nothing matches, the classifier fails open
    /// and returns every table; an empty schema would make query
    /// generation impossible.
    pub fn classify(&self, question: &str) -> Vec<String> {
        let q = question.to_lowercase();
        let hits: Vec<String> = self
            .tables()
            .iter()
            .filter(|t| t.vocabulary.iter().any(|term| q.contains(term.as_str())))
            .map(|t| t.name.clone())
            .collect();

        if hits.is_empty() {
            tracing::debug!("no table vocabulary matched; falling open to full schema");
            self.tables().iter().map(|t| t.name.clone()).collect()
        } else {
            hits
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_question_selects_budget_table() {
        let reg = SchemaRegistry::government_data();
        let tables = reg.classify("What was the education budget in 2022?");
        assert_eq!(tables, vec!["budget_outlays".to_string()]);
    }

    #[test]
    fn gdp_question_selects_both_gdp_tables() {
        let reg = SchemaRegistry::government_data();
        let tables = reg.classify("Which industry contributed the most to GDP in 2023?");
        assert!(tables.contains(&"industry_gdp".to_string()));
        assert!(tables.contains(&"gdp_by_industry".to_string()));
    }

    #[test]
    fn never_returns_empty_set() {
        let reg = SchemaRegistry::government_data();
        for text in ["", "xylophone weather on mars", "???"] {
            let tables = reg.classify(text);
            assert!(!tables.is_empty(), "classifier returned empty set for {:?}", text);
            assert_eq!(tables.len(), reg.tables().len());
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let reg = SchemaRegistry::government_data();
        let a = reg.classify("How much was spent on defense versus health?");
        let b = reg.classify("How much was spent on defense versus health?");
        assert_eq!(a, b);
    }
}
