use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leadscout_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

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

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", &["LEADSCOUT_DATABASE_URL"]),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", &["LEADSCOUT_DATABASE_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", &["LEADSCOUT_DATABASE_TIMEOUT_SECS"]),
    ));

    let directory_key = config
        .directory
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "directory.api_key",
        &directory_key,
        source("directory.api_key", &["LEADSCOUT_DIRECTORY_API_KEY", "APOLLO_API_KEY"]),
    ));
    lines.push(render_line(
        "directory.base_url",
        &config.directory.base_url,
        source("directory.base_url", &["LEADSCOUT_DIRECTORY_BASE_URL"]),
    ));
    lines.push(render_line(
        "directory.page_maximum",
        &config.directory.page_maximum.to_string(),
        source("directory.page_maximum", &["LEADSCOUT_DIRECTORY_PAGE_MAXIMUM"]),
    ));
    lines.push(render_line(
        "directory.timeout_secs",
        &config.directory.timeout_secs.to_string(),
        source("directory.timeout_secs", &["LEADSCOUT_DIRECTORY_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "search.planner",
        &format!("{:?}", config.search.planner),
        source("search.planner", &["LEADSCOUT_SEARCH_PLANNER"]),
    ));
    lines.push(render_line(
        "search.max_iterations",
        &config.search.max_iterations.to_string(),
        source("search.max_iterations", &["LEADSCOUT_SEARCH_MAX_ITERATIONS"]),
    ));
    lines.push(render_line(
        "search.min_results",
        &config.search.min_results.to_string(),
        source("search.min_results", &["LEADSCOUT_SEARCH_MIN_RESULTS"]),
    ));
    lines.push(render_line(
        "search.per_query_limit",
        &config.search.per_query_limit.to_string(),
        source("search.per_query_limit", &["LEADSCOUT_SEARCH_PER_QUERY_LIMIT"]),
    ));
    lines.push(render_line(
        "search.deadline_secs",
        &config.search.deadline_secs.to_string(),
        source("search.deadline_secs", &["LEADSCOUT_SEARCH_DEADLINE_SECS"]),
    ));

    lines.push(render_line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        source("llm.provider", &["LEADSCOUT_LLM_PROVIDER"]),
    ));
    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        source("llm.model", &["LEADSCOUT_LLM_MODEL"]),
    ));
    lines.push(render_line(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        source("llm.base_url", &["LEADSCOUT_LLM_BASE_URL"]),
    ));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        llm_api_key,
        source("llm.api_key", &["LEADSCOUT_LLM_API_KEY"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["LEADSCOUT_LOGGING_LEVEL", "LEADSCOUT_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["LEADSCOUT_LOGGING_FORMAT", "LEADSCOUT_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("leadscout.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/leadscout.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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

/// Keeps the last four characters of long keys so operators can tell them apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() < 12 {
        return "<redacted>".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
