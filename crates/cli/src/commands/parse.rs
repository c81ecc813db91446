use payhub_agent::selector::rules;

use super::CommandResult;

/// Rule-based only; the LLM path needs a live toolkit and a network call.
pub fn run(query: &str) -> CommandResult {
    let query = query.trim();
    if query.is_empty() {
        return CommandResult::failure("parse", "invalid_input", "query must not be empty", 2);
    }

    let selection = rules::select(query);
    match serde_json::to_string_pretty(&selection) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("parse", "serialization", error.to_string(), 1),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::run;

    #[test]
    fn prints_the_rule_selection() {
        let result = run("Create an invoice for $100 USD for jane@example.com");
        assert_eq!(result.exit_code, 0);

        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["tool"], json!("create_invoice"));
        assert_eq!(payload["parameters"]["amount"], json!(100));
        assert_eq!(payload["parameters"]["currency"], json!("USD"));
        assert_eq!(payload["source"], json!("rules"));
    }

    #[test]
    fn blank_query_is_an_input_error() {
        let result = run("   ");
        assert_eq!(result.exit_code, 2);

        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["status"], json!("error"));
        assert_eq!(payload["error_class"], json!("invalid_input"));
    }
}
