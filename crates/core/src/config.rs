use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MAX_PAGE_SIZE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub directory: DirectoryConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// People-directory API used as the search provider.
#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub page_maximum: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub planner: PlannerKind,
    pub max_iterations: u32,
    pub min_results: usize,
    pub per_query_limit: u32,
    /// Wall-clock budget for a whole run; zero disables the deadline.
    pub deadline_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    Keyword,
    Llm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub directory_api_key: Option<String>,
    pub planner: Option<PlannerKind>,
    pub max_iterations: Option<u32>,
    pub min_results: Option<usize>,
    pub per_query_limit: Option<u32>,
    pub deadline_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://leadscout.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            directory: DirectoryConfig {
                api_key: None,
                base_url: "https://api.apollo.io".to_string(),
                page_maximum: MAX_PAGE_SIZE,
                timeout_secs: 30,
            },
            search: SearchConfig {
                planner: PlannerKind::Keyword,
                max_iterations: 3,
                min_results: 5,
                per_query_limit: 10,
                deadline_secs: 120,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for PlannerKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "llm" => Ok(Self::Llm),
            other => Err(ConfigError::Validation(format!(
                "unsupported planner `{other}` (expected keyword|llm)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leadscout.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(directory) = patch.directory {
            if let Some(api_key) = directory.api_key {
                self.directory.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = directory.base_url {
                self.directory.base_url = base_url;
            }
            if let Some(page_maximum) = directory.page_maximum {
                self.directory.page_maximum = page_maximum;
            }
            if let Some(timeout_secs) = directory.timeout_secs {
                self.directory.timeout_secs = timeout_secs;
            }
        }

        if let Some(search) = patch.search {
            if let Some(planner) = search.planner {
                self.search.planner = planner;
            }
            if let Some(max_iterations) = search.max_iterations {
                self.search.max_iterations = max_iterations;
            }
            if let Some(min_results) = search.min_results {
                self.search.min_results = min_results;
            }
            if let Some(per_query_limit) = search.per_query_limit {
                self.search.per_query_limit = per_query_limit;
            }
            if let Some(deadline_secs) = search.deadline_secs {
                self.search.deadline_secs = deadline_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LEADSCOUT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LEADSCOUT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("LEADSCOUT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LEADSCOUT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("LEADSCOUT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADSCOUT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("LEADSCOUT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADSCOUT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("LEADSCOUT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LEADSCOUT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LEADSCOUT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LEADSCOUT_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("LEADSCOUT_LLM_MAX_RETRIES", &value)?;
        }

        let directory_key =
            read_env("LEADSCOUT_DIRECTORY_API_KEY").or_else(|| read_env("APOLLO_API_KEY"));
        if let Some(value) = directory_key {
            self.directory.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEADSCOUT_DIRECTORY_BASE_URL") {
            self.directory.base_url = value;
        }
        if let Some(value) = read_env("LEADSCOUT_DIRECTORY_PAGE_MAXIMUM") {
            self.directory.page_maximum = parse_u32("LEADSCOUT_DIRECTORY_PAGE_MAXIMUM", &value)?;
        }
        if let Some(value) = read_env("LEADSCOUT_DIRECTORY_TIMEOUT_SECS") {
            self.directory.timeout_secs = parse_u64("LEADSCOUT_DIRECTORY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADSCOUT_SEARCH_PLANNER") {
            self.search.planner = value.parse()?;
        }
        if let Some(value) = read_env("LEADSCOUT_SEARCH_MAX_ITERATIONS") {
            self.search.max_iterations = parse_u32("LEADSCOUT_SEARCH_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("LEADSCOUT_SEARCH_MIN_RESULTS") {
            self.search.min_results = parse_usize("LEADSCOUT_SEARCH_MIN_RESULTS", &value)?;
        }
        if let Some(value) = read_env("LEADSCOUT_SEARCH_PER_QUERY_LIMIT") {
            self.search.per_query_limit = parse_u32("LEADSCOUT_SEARCH_PER_QUERY_LIMIT", &value)?;
        }
        if let Some(value) = read_env("LEADSCOUT_SEARCH_DEADLINE_SECS") {
            self.search.deadline_secs = parse_u64("LEADSCOUT_SEARCH_DEADLINE_SECS", &value)?;
        }

        let log_level =
            read_env("LEADSCOUT_LOGGING_LEVEL").or_else(|| read_env("LEADSCOUT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEADSCOUT_LOGGING_FORMAT").or_else(|| read_env("LEADSCOUT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(directory_api_key) = overrides.directory_api_key {
            self.directory.api_key = Some(secret_value(directory_api_key));
        }
        if let Some(planner) = overrides.planner {
            self.search.planner = planner;
        }
        if let Some(max_iterations) = overrides.max_iterations {
            self.search.max_iterations = max_iterations;
        }
        if let Some(min_results) = overrides.min_results {
            self.search.min_results = min_results;
        }
        if let Some(per_query_limit) = overrides.per_query_limit {
            self.search.per_query_limit = per_query_limit;
        }
        if let Some(deadline_secs) = overrides.deadline_secs {
            self.search.deadline_secs = deadline_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_directory(&self.directory)?;
        validate_search(&self.search)?;
        if self.search.planner == PlannerKind::Llm {
            validate_llm(&self.llm)?;
        }
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl SearchConfig {
    pub fn deadline(&self) -> Option<std::time::Duration> {
        (self.deadline_secs > 0).then(|| std::time::Duration::from_secs(self.deadline_secs))
    }
}

impl DirectoryConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("leadscout.toml"), PathBuf::from("config/leadscout.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    let base_url = directory.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "directory.base_url must start with http:// or https://".to_string(),
        ));
    }

    if directory.page_maximum == 0 || directory.page_maximum > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "directory.page_maximum must be in range 1..={MAX_PAGE_SIZE}"
        )));
    }

    if directory.timeout_secs == 0 || directory.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "directory.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.max_iterations == 0 {
        return Err(ConfigError::Validation(
            "search.max_iterations must be greater than zero".to_string(),
        ));
    }

    if search.per_query_limit == 0 || search.per_query_limit > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "search.per_query_limit must be in range 1..={MAX_PAGE_SIZE}"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    directory: Option<DirectoryPatch>,
    search: Option<SearchPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    page_maximum: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    planner: Option<PlannerKind>,
    max_iterations: Option<u32>,
    min_results: Option<usize>,
    per_query_limit: Option<u32>,
    deadline_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, PlannerKind};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const LEADSCOUT_VARS: &[&str] = &[
        "LEADSCOUT_DATABASE_URL",
        "LEADSCOUT_DIRECTORY_API_KEY",
        "LEADSCOUT_SEARCH_PLANNER",
        "LEADSCOUT_SEARCH_MAX_ITERATIONS",
        "LEADSCOUT_LLM_PROVIDER",
        "LEADSCOUT_LOG_LEVEL",
        "LEADSCOUT_LOG_FORMAT",
        "APOLLO_API_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(LEADSCOUT_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.search.planner == PlannerKind::Keyword, "keyword planner is the default")?;
        ensure(config.search.max_iterations == 3, "three iterations by default")?;
        ensure(config.search.deadline().is_some(), "deadline is enabled by default")?;
        ensure(!config.directory.has_api_key(), "no directory key without configuration")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(LEADSCOUT_VARS);

        env::set_var("TEST_DIRECTORY_KEY", "dir-key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("leadscout.toml");
            fs::write(
                &path,
                r#"
[directory]
api_key = "${TEST_DIRECTORY_KEY}"

[search]
min_results = 12
deadline_secs = 0
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let key = config.directory.api_key.as_ref().map(|key| key.expose_secret().to_string());
            ensure(
                key.as_deref() == Some("dir-key-from-env"),
                "directory key should be loaded from environment",
            )?;
            ensure(config.search.min_results == 12, "min_results should come from file")?;
            ensure(config.search.deadline().is_none(), "zero deadline disables the bound")?;
            Ok(())
        })();

        clear_vars(&["TEST_DIRECTORY_KEY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        env::remove_var("TEST_UNSET_DIRECTORY_KEY");

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("leadscout.toml");
        fs::write(&path, "[directory]\napi_key = \"${TEST_UNSET_DIRECTORY_KEY}\"\n")
            .map_err(|err| err.to_string())?;

        let outcome =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(outcome, Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "TEST_UNSET_DIRECTORY_KEY"),
            "missing variable should be named in the error",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(LEADSCOUT_VARS);

        env::set_var("LEADSCOUT_LOG_LEVEL", "warn");
        env::set_var("LEADSCOUT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(LEADSCOUT_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(LEADSCOUT_VARS);

        env::set_var("LEADSCOUT_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("LEADSCOUT_SEARCH_MAX_ITERATIONS", "5");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("leadscout.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[search]
max_iterations = 2
per_query_limit = 25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.search.max_iterations == 5, "env should win over file")?;
            ensure(config.search.per_query_limit == 25, "file should win over defaults")?;
            Ok(())
        })();

        clear_vars(LEADSCOUT_VARS);
        result
    }

    #[test]
    fn llm_planner_requires_provider_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(LEADSCOUT_VARS);

        env::set_var("LEADSCOUT_SEARCH_PLANNER", "llm");
        env::set_var("LEADSCOUT_LLM_PROVIDER", "openai");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(LEADSCOUT_VARS);
        result
    }

    #[test]
    fn invalid_numeric_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(LEADSCOUT_VARS);

        env::set_var("LEADSCOUT_SEARCH_MAX_ITERATIONS", "many");
        let outcome = AppConfig::load(LoadOptions::default());
        clear_vars(LEADSCOUT_VARS);

        ensure(
            matches!(outcome, Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "LEADSCOUT_SEARCH_MAX_ITERATIONS"),
            "invalid env value should name the variable",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(LEADSCOUT_VARS);

        env::set_var("APOLLO_API_KEY", "apollo-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("apollo-secret-value"),
                "debug output should not contain directory key",
            )?;
            ensure(config.directory.has_api_key(), "legacy key variable should be honoured")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(LEADSCOUT_VARS);
        result
    }
}
