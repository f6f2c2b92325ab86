use clap::Parser;

/// Run one turn of a tool-using agent against a local Ollama model.
///
/// Tool calls the model writes out as plain JSON text are recovered and
/// executed; calls to tools the agent does not have end the turn instead.
#[derive(Parser, Debug)]
#[command(name = "toolbridge", about = "Tool-call normalizing agent runner for Ollama models")]
pub struct CliArgs {
    /// Message to send (default: TEST_MSG or a calc + http_get demo prompt)
    #[arg(long, short)]
    pub message: Option<String>,

    /// Ollama model name (overrides OLLAMA_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama base URL (overrides OLLAMA_URL)
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Allowed tool name; repeat or comma-separate. Overrides ALLOWED_TOOLS.
    #[arg(long = "allow", value_delimiter = ',')]
    pub allow: Vec<String>,

    /// Derive the allow-list from the active agent on every call
    #[arg(long)]
    pub dynamic: bool,

    /// Maximum agentic loop iterations per turn (overrides MAX_ITERATIONS)
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
