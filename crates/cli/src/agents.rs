use std::sync::Arc;

use anyhow::{Context, Result};

use toolbridge_core::config::HttpConfig;
use toolbridge_runtime::agent::Agent;
use toolbridge_runtime::tools::{CalcTool, HttpGetTool, JsonFetcher, WeatherLookupTool};

pub const DEFAULT_MESSAGE: &str = "First compute 2*(5+7) with the calc tool. \
Then fetch https://jsonplaceholder.typicode.com/todos/1 with http_get and summarize the title.";

const ROOT_INSTRUCTION: &str = "You are a helpful assistant. \
Use tools when they help. If a tool returns ok=false or errors, \
explain the failure briefly and continue with the rest of the task. \
Keep answers concise.";

const WEATHER_INSTRUCTION: &str = "You answer questions about the current weather. \
Call weather_lookup with the city name and report temperature and wind briefly.";

/// `root` with `calc` and `http_get`, delegating weather to a `weather` sub-agent.
pub fn build_root_agent(http: &HttpConfig) -> Result<Agent> {
    let fetcher = JsonFetcher::new(http).context("failed to build HTTP client")?;

    let weather = Agent::new("weather", WEATHER_INSTRUCTION)
        .with_description("Looks up the current weather for a city.")
        .with_tool(WeatherLookupTool::new(fetcher.clone()))?;

    let root = Agent::new("root", ROOT_INSTRUCTION)
        .with_description("General assistant with arithmetic and HTTP tools.")
        .with_tool(CalcTool)?
        .with_shared_tool(Arc::new(HttpGetTool::new(fetcher)))?;
    Ok(root.with_sub_agent(weather))
}
