//! JSON GET tool with retries.
//!
//! Never fails the tool call for HTTP or network problems: the outcome is
//! reported in the `{ok, status, data, error}` payload so the model can
//! explain the failure and carry on.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use toolbridge_core::config::HttpConfig;

use crate::tool::{required_str, Nameable, Tool, ToolContext, ToolDefinition, ToolError};

/// Characters of a non-2xx body kept in the error message.
const ERROR_BODY_LIMIT: usize = 300;

/// Outcome of a GET, as handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl HttpOutcome {
    fn success(status: u16, data: Value) -> Self {
        Self {
            ok: true,
            status: Some(status),
            data: Some(data),
            error: None,
        }
    }

    fn failure(status: Option<u16>, error: String) -> Self {
        Self {
            ok: false,
            status,
            data: None,
            error: Some(error),
        }
    }
}

/// Shared retrying GET client, also used by composite tools.
#[derive(Clone)]
pub struct JsonFetcher {
    client: reqwest::Client,
    retries: u32,
    timeout: Duration,
    /// Base delay; attempt `n` waits `n * backoff` before retrying.
    backoff: Duration,
}

impl JsonFetcher {
    /// Redirects are not followed; a 3xx is reported like any other non-2xx.
    pub fn new(config: &HttpConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            retries: config.retries,
            timeout: Duration::from_secs(u64::from(config.timeout_secs)),
            backoff: Duration::from_millis(500),
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// GET `url` with the configured retry policy.
    pub async fn get(&self, url: &str) -> HttpOutcome {
        self.get_with(url, self.retries, self.timeout).await
    }

    /// GET `url`, retrying 5xx answers and transport errors.
    pub async fn get_with(&self, url: &str, retries: u32, timeout: Duration) -> HttpOutcome {
        let mut last_error: Option<String> = None;

        for attempt in 1..=retries {
            debug!(url, attempt, retries, "GET");
            match self.client.get(url).timeout(timeout).send().await {
                Ok(response) => {
                    let status = response.status();
                    let code = status.as_u16();
                    if status.is_success() {
                        return match response.json::<Value>().await {
                            Ok(data) => HttpOutcome::success(code, data),
                            Err(e) => {
                                HttpOutcome::failure(Some(code), format!("JSON parse error: {e}"))
                            }
                        };
                    }
                    if status.is_server_error() && attempt < retries {
                        warn!(url, status = code, attempt, "server error, retrying");
                        tokio::time::sleep(self.backoff * attempt).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
                    return HttpOutcome::failure(Some(code), format!("HTTP {code}: {body}"));
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "request failed");
                    last_error = Some(e.to_string());
                    if attempt < retries {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        HttpOutcome::failure(None, last_error.unwrap_or_else(|| "Unknown error".to_string()))
    }
}

/// GET a JSON endpoint and return the parsed body.
pub struct HttpGetTool {
    fetcher: JsonFetcher,
}

impl HttpGetTool {
    pub fn new(fetcher: JsonFetcher) -> Self {
        Self { fetcher }
    }
}

impl Nameable for HttpGetTool {
    fn name(&self) -> &str {
        "http_get"
    }
}

#[async_trait]
impl Tool for HttpGetTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "GET a JSON endpoint. Returns {ok, status, data, error}; retries on server and network errors."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Absolute http(s) URL to fetch"
                    },
                    "retries": {
                        "type": "integer",
                        "description": "Maximum attempts (default 3)"
                    },
                    "timeout": {
                        "type": "number",
                        "description": "Per-attempt timeout in seconds (default 10)"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let url = required_str(&arguments, "url")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolError::InvalidInput(format!(
                "url must be an absolute http(s) URL, got '{url}'"
            )));
        }

        let retries = arguments
            .get("retries")
            .and_then(Value::as_u64)
            .map(|r| r.min(10) as u32)
            .unwrap_or(self.fetcher.retries);
        let timeout = arguments
            .get("timeout")
            .and_then(Value::as_f64)
            .filter(|t| *t > 0.0)
            .map(|t| Duration::from_secs_f64(t.min(120.0)))
            .unwrap_or(self.fetcher.timeout);

        let outcome = self.fetcher.get_with(url, retries, timeout).await;
        serde_json::to_value(outcome).map_err(|e| ToolError::Other(e.into()))
    }
}
