use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use payhub_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

const UNSET: &str = "<unset>";

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let server = &config.server;
    let visa = &config.visa;
    let llm = &config.llm;
    let static_dir = server.static_dir.as_ref().map(|dir| dir.display().to_string());

    let rows = vec![
        row("server.bind_address", server.bind_address.clone(), &["PAYHUB_SERVER_BIND_ADDRESS"]),
        row("server.port", server.port.to_string(), &["PORT"]),
        row("server.static_dir", static_dir.unwrap_or_else(|| UNSET.to_string()), &[
            "PAYHUB_SERVER_STATIC_DIR",
        ]),
        row("server.graceful_shutdown_secs", server.graceful_shutdown_secs.to_string(), &[
            "PAYHUB_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ]),
        row("visa.merchant_id", optional(visa.merchant_id.as_deref()), &[
            "VISA_ACCEPTANCE_MERCHANT_ID",
        ]),
        row("visa.api_key_id", redact_identifier(visa.api_key_id.as_deref()), &[
            "VISA_ACCEPTANCE_API_KEY_ID",
        ]),
        row("visa.secret_key", redact_secret(visa.secret_key.as_ref()), &[
            "VISA_ACCEPTANCE_SECRET_KEY",
        ]),
        row("visa.environment", optional(visa.environment.as_deref()), &[
            "VISA_ACCEPTANCE_ENVIRONMENT",
        ]),
        row("visa.cybs_environment", optional(visa.cybs_environment.as_deref()), &[
            "CYBS_ENVIRONMENT",
        ]),
        row("visa.request_timeout_secs", visa.request_timeout_secs.to_string(), &[
            "PAYHUB_VISA_REQUEST_TIMEOUT_SECS",
        ]),
        row("llm.api_key", redact_secret(llm.api_key.as_ref()), &["OPENAI_API_KEY"]),
        row("llm.base_url", llm.base_url.clone(), &["PAYHUB_LLM_BASE_URL"]),
        row("llm.model", llm.model.clone(), &["PAYHUB_LLM_MODEL"]),
        row("llm.timeout_secs", llm.timeout_secs.to_string(), &["PAYHUB_LLM_TIMEOUT_SECS"]),
        row("demo.force_demo", config.demo.force_demo.to_string(), &["PAYHUB_FORCE_DEMO"]),
        row("logging.level", config.logging.level.clone(), &[
            "PAYHUB_LOGGING_LEVEL",
            "PAYHUB_LOG_LEVEL",
        ]),
        row("logging.format", format!("{:?}", config.logging.format), &[
            "PAYHUB_LOGGING_FORMAT",
            "PAYHUB_LOG_FORMAT",
        ]),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(rows.into_iter().map(|(key, value, env_keys)| {
        render_line(key, &value, source(key, env_keys))
    }));
    lines.join("\n")
}

type Row = (&'static str, String, &'static [&'static str]);

fn row(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Row {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("payhub.toml"), PathBuf::from("config/payhub.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn optional(value: Option<&str>) -> String {
    value.filter(|value| !value.trim().is_empty()).unwrap_or(UNSET).to_string()
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>".to_string(),
        Some(_) => "<empty>".to_string(),
        None => UNSET.to_string(),
    }
}

/// Keeps the first four characters so operators can tell keys apart.
fn redact_identifier(value: Option<&str>) -> String {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return UNSET.to_string();
    };
    let prefix: String = value.chars().take(4).collect();
    if prefix.chars().count() == value.chars().count() {
        return "<redacted>".to_string();
    }
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact_identifier, redact_secret};

    #[test]
    fn secrets_never_render() {
        let secret = SecretString::from("c2VjcmV0LWtleQ==".to_string());
        assert_eq!(redact_secret(Some(&secret)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn identifiers_keep_a_short_prefix() {
        assert_eq!(redact_identifier(Some("7a1b9c-key-id")), "7a1b***");
        assert_eq!(redact_identifier(Some("abc")), "<redacted>");
        assert_eq!(redact_identifier(Some("  ")), "<unset>");
    }

    #[test]
    fn nested_toml_keys_are_found() {
        let doc: toml::Value = "[visa]\nmerchant_id = \"m\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "visa.merchant_id"));
        assert!(!contains_path(&doc, "visa.secret_key"));
    }
}
