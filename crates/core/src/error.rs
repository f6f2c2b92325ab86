use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid Ollama URL '{0}': expected an http:// or https:// address")]
    InvalidUrl(String),

    #[error("Model name must not be empty")]
    EmptyModel,

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("Allowed tool list is set but contains no names")]
    EmptyAllowList,
}
