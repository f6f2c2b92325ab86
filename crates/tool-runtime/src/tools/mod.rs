//! Built-in tools offered to the model.
//!
//! - `calc`: arithmetic expressions
//! - `http_get`: retrying JSON GET
//! - `weather_lookup`: geocode plus current weather, on top of `http_get`'s fetcher

pub mod calc;
pub mod http_get;
pub mod weather;

pub use calc::CalcTool;
pub use http_get::{HttpGetTool, HttpOutcome, JsonFetcher};
pub use weather::WeatherLookupTool;
