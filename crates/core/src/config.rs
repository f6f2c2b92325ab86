use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f32(profile: &str, key: &str, default: f32) -> f32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str) -> bool {
    matches!(
        profiled_env_opt(profile, key).as_deref(),
        Some("1" | "true" | "TRUE" | "yes")
    )
}

/// Split a comma-separated tool list, dropping blanks and duplicates.
pub fn parse_tool_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub ollama: OllamaConfig,
    pub session: SessionConfig,
    pub bridge: BridgeConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TOOLBRIDGE_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TOOLBRIDGE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            ollama: OllamaConfig::from_env_profiled(p),
            session: SessionConfig::from_env_profiled(p),
            bridge: BridgeConfig::from_env_profiled(p),
            http: HttpConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject settings the runner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.ollama.url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.ollama.url.clone()));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.bridge.max_iterations == 0 {
            return Err(ConfigError::NotPositive("MAX_ITERATIONS"));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::NotPositive("HTTP_TIMEOUT_SECS"));
        }
        if matches!(&self.bridge.allowed_tools, Some(names) if names.is_empty()) {
            return Err(ConfigError::EmptyAllowList);
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  ollama:   url={}, model={}", self.ollama.url, self.ollama.model);
        tracing::info!(
            "  session:  app={}, user={}, session={}",
            self.session.app_name,
            self.session.user_id,
            self.session.session_id
        );
        tracing::info!(
            "  bridge:   allow_list={}, dynamic={}, max_iterations={}",
            self.bridge
                .allowed_tools
                .as_ref()
                .map(|names| names.join(","))
                .unwrap_or_else(|| "(agent tree)".to_string()),
            self.bridge.dynamic,
            self.bridge.max_iterations
        );
        tracing::info!(
            "  http:     retries={}, timeout={}s",
            self.http.retries,
            self.http.timeout_secs
        );
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3:8b"),
            temperature: profiled_env_f32(p, "LLM_TEMPERATURE", 0.0),
        }
    }
}

// ── Session identity ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    /// Message sent when the CLI is started without `--message`.
    pub test_message: Option<String>,
}

impl SessionConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            app_name: profiled_env_or(p, "APP_NAME", "app"),
            user_id: session_env(p, "USER_ID").unwrap_or_else(|| "local-user".to_string()),
            session_id: session_env(p, "SESSION_ID")
                .unwrap_or_else(|| "local-session".to_string()),
            test_message: session_env(p, "TEST_MSG"),
        }
    }
}

/// `{KEY}`, else the older `ADK_{KEY}` spelling.
fn session_env(profile: &str, key: &str) -> Option<String> {
    profiled_env_opt(profile, key).or_else(|| profiled_env_opt(profile, &format!("ADK_{key}")))
}

// ── Bridge ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Explicit allow-list. `None` means "derive from the agent tree".
    pub allowed_tools: Option<Vec<String>>,
    /// Skip the static allow-list and derive one per call from the active agent.
    pub dynamic: bool,
    pub max_iterations: u32,
}

impl BridgeConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            allowed_tools: profiled_env_opt(p, "ALLOWED_TOOLS").map(|raw| parse_tool_list(&raw)),
            dynamic: profiled_env_bool(p, "BRIDGE_DYNAMIC"),
            max_iterations: profiled_env_u32(p, "MAX_ITERATIONS", 10),
        }
    }
}

// ── HTTP tools ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub retries: u32,
    pub timeout_secs: u32,
}

impl HttpConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            retries: profiled_env_u32(p, "HTTP_RETRIES", 3),
            timeout_secs: profiled_env_u32(p, "HTTP_TIMEOUT_SECS", 10),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout_secs: 10,
        }
    }
}
