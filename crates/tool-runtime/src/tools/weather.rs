//! Current weather for a city: geocode, then fetch the forecast.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::tool::{required_str, Nameable, Tool, ToolContext, ToolDefinition, ToolError};

use super::http_get::{HttpOutcome, JsonFetcher};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub ok: bool,
    pub location: Option<Value>,
    pub current: Option<Value>,
    pub error: Option<String>,
}

impl WeatherReport {
    fn failed(location: Option<Value>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            location,
            current: None,
            error: Some(error.into()),
        }
    }
}

pub struct WeatherLookupTool {
    fetcher: JsonFetcher,
    geocoding_url: String,
    forecast_url: String,
}

impl WeatherLookupTool {
    pub fn new(fetcher: JsonFetcher) -> Self {
        Self {
            fetcher,
            geocoding_url: GEOCODING_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
        }
    }

    /// Point both lookups somewhere else.
    pub fn with_endpoints(
        mut self,
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Self {
        self.geocoding_url = geocoding_url.into();
        self.forecast_url = forecast_url.into();
        self
    }

    pub async fn lookup(&self, city: &str) -> Result<WeatherReport, ToolError> {
        let geocode = Url::parse_with_params(
            &self.geocoding_url,
            &[("name", city), ("count", "1"), ("format", "json")],
        )
        .map_err(|e| ToolError::Other(e.into()))?;

        let place = match self.fetcher.get(geocode.as_str()).await {
            HttpOutcome {
                ok: true,
                data: Some(data),
                ..
            } => data
                .get("results")
                .and_then(Value::as_array)
                .and_then(|results| results.first())
                .cloned(),
            HttpOutcome { error, .. } => {
                return Ok(WeatherReport::failed(
                    None,
                    error.unwrap_or_else(|| "geocoding failed".to_string()),
                ))
            }
        };
        let Some(place) = place else {
            return Ok(WeatherReport::failed(None, format!("no location found for '{city}'")));
        };

        let (Some(latitude), Some(longitude)) = (
            place.get("latitude").and_then(Value::as_f64),
            place.get("longitude").and_then(Value::as_f64),
        ) else {
            return Ok(WeatherReport::failed(Some(place), "location has no coordinates"));
        };
        debug!(city, latitude, longitude, "geocoded");

        let location = serde_json::json!({
            "name": place.get("name").cloned().unwrap_or(Value::Null),
            "country": place.get("country").cloned().unwrap_or(Value::Null),
            "latitude": latitude,
            "longitude": longitude,
        });

        let forecast = Url::parse_with_params(
            &self.forecast_url,
            &[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
            ],
        )
        .map_err(|e| ToolError::Other(e.into()))?;

        Ok(match self.fetcher.get(forecast.as_str()).await {
            HttpOutcome {
                ok: true,
                data: Some(data),
                ..
            } => match data.get("current_weather") {
                Some(current) => WeatherReport {
                    ok: true,
                    location: Some(location),
                    current: Some(current.clone()),
                    error: None,
                },
                None => WeatherReport::failed(Some(location), "forecast has no current weather"),
            },
            HttpOutcome { error, .. } => WeatherReport::failed(
                Some(location),
                error.unwrap_or_else(|| "forecast failed".to_string()),
            ),
        })
    }
}

impl Nameable for WeatherLookupTool {
    fn name(&self) -> &str {
        "weather_lookup"
    }
}

#[async_trait]
impl Tool for WeatherLookupTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Current weather for a city. Returns {ok, location, current, error}."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name, e.g. 'Berlin'"
                    }
                },
                "required": ["city"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let city = required_str(&arguments, "city")?.trim();
        if city.is_empty() {
            return Err(ToolError::InvalidInput("city must not be empty".to_string()));
        }
        let report = self.lookup(city).await?;
        serde_json::to_value(report).map_err(|e| ToolError::Other(e.into()))
    }
}
