//! Prompt assembly. Pure composition; no randomness.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalPrompt {
    pub system: String,
    pub user: String,
}

const SQL_SYSTEM: &str = "You are a SQL expert. Generate a SQL query to answer the given question \
using the provided database schema.

IMPORTANT: All government data is limited to years 2014-2024 only.
If asked for data outside this range, explain that data is not available.

Important guidelines:
- Use only the tables and columns described in the schema
- Data covers 2014-2024 only
- Write valid SQLite syntax
- Be precise and efficient
- Return only the SQL query without explanations";

const FUNCTION_SYSTEM_HEADER: &str = "You are an expert economic data analyst with access to \
government economic data APIs. You must call a specific function to answer each question.

CRITICAL: All data is limited to years 2014-2024. If asked for data outside this range, explain \
the limitation.";

const FUNCTION_SYSTEM_FOOTER: &str = "INSTRUCTIONS:
1. Data is only available for 2014-2024
2. Use ONLY the functions listed above
3. Format your response EXACTLY like this:

Function: get_cpi_data
Parameters: series_id=CUUR0000SA0, start_year=2020, end_year=2024

4. Do NOT provide explanations, code examples, or general guidance
5. ALWAYS specify concrete parameter values based on the question
6. If unsure about an optional parameter, use its documented default";

pub fn sql_prompt(schema_text: &str, question: &str) -> EvalPrompt {
    EvalPrompt {
        system: SQL_SYSTEM.to_string(),
        user: format!(
            "Question: {}\n\nDatabase Schema:\n{}\n\nGenerate the SQL query:",
            question, schema_text
        ),
    }
}

pub fn function_prompt(function_docs: &str, question: &str) -> EvalPrompt {
    EvalPrompt {
        system: format!(
            "{}\n\nAvailable Functions:\n{}\n\n{}",
            FUNCTION_SYSTEM_HEADER, function_docs, FUNCTION_SYSTEM_FOOTER
        ),
        user: format!(
            "Question: {}\n\nWhich function should I call and with what parameters to answer \
             this question?",
            question
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_prompt_carries_constraints() {
        let p = sql_prompt("TABLE: budget_outlays", "What was spent on health?");
        assert!(p.system.contains("2014-2024"));
        assert!(p.system.contains("Return only the SQL query"));
        assert!(p.user.contains("TABLE: budget_outlays"));
        assert!(p.user.contains("What was spent on health?"));
    }

    #[test]
    fn function_prompt_fixes_two_line_format() {
        let p = function_prompt("## get_cpi_data", "How did CPI change?");
        assert!(p.system.contains("Function: get_cpi_data"));
        assert!(p.system.contains("Parameters: series_id=CUUR0000SA0"));
        assert!(p.system.contains("## get_cpi_data"));
    }

    #[test]
    fn composition_is_pure() {
        let a = sql_prompt("s", "q");
        let b = sql_prompt("s", "q");
        assert_eq!(a, b);
    }
}
