use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use toolbridge_runtime::conversation::Fragment;
use toolbridge_runtime::event::AgentEvent;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const ASSISTANT_TEXT: Color = Color::Cyan;
    const TOOL_CALL: Color = Color::Yellow;
    const TOOL_RESULT: Color = Color::DarkGreen;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// Longest tool result shown before truncating.
const RESULT_PREVIEW_CHARS: usize = 500;

/// Terminal output for a single run.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print the startup banner.
    pub fn print_banner(&self, model: &str, url: &str, allow_list: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("toolbridge"),
            ResetColor,
            Print(" - Ollama agent runner\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Model: {} | Server: {}\n", model, url)),
            Print(format!("Allowed tools: {}\n", allow_list)),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Show the intermediate steps of a run: calls made and their results.
    pub fn display_event(&self, event: &AgentEvent) -> Result<()> {
        if event.is_final_response() {
            return Ok(());
        }
        let mut stdout = io::stdout();
        for fragment in &event.content.fragments {
            match fragment {
                Fragment::Text(text) => {
                    execute!(
                        stdout,
                        SetForegroundColor(Colors::ASSISTANT_TEXT),
                        Print(format!("{}\n", text)),
                        ResetColor,
                    )?;
                }
                Fragment::ToolCall(call) => {
                    execute!(
                        stdout,
                        SetForegroundColor(Colors::TOOL_CALL),
                        Print(format!("[tool: {}]\n", call)),
                        ResetColor,
                    )?;
                }
                Fragment::ToolResult(envelope) => {
                    let content = envelope
                        .result
                        .as_ref()
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    let is_error = envelope
                        .result
                        .as_ref()
                        .and_then(|v| v.get("ok"))
                        .and_then(|ok| ok.as_bool())
                        == Some(false);
                    self.display_tool_result(&envelope.name, &content, is_error)?;
                }
            }
        }
        stdout.flush()?;
        Ok(())
    }

    /// Display a tool execution result.
    pub fn display_tool_result(&self, tool_name: &str, content: &str, is_error: bool) -> Result<()> {
        let mut stdout = io::stdout();
        let color = if is_error {
            Colors::ERROR
        } else {
            Colors::TOOL_RESULT
        };
        let label = if is_error { "error" } else { "result" };

        let display_content = preview(content);

        execute!(
            stdout,
            SetForegroundColor(color),
            Print(format!("  [{} {}]: {}\n", tool_name, label, display_content)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_final_answer(&self, text: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::HEADER),
            Print("=== FINAL ANSWER ===\n"),
            ResetColor,
            Print(format!("{}\n", text)),
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Show a waiting indicator. Returns a handle to stop it.
    pub fn start_spinner(&self, message: &str) -> Result<SpinnerHandle> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{} ", message)),
            ResetColor,
        )?;
        stdout.flush()?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = std::thread::spawn(move || {
            let frames = ['|', '/', '-', '\\'];
            let mut i = 0;
            while running_clone.load(Ordering::SeqCst) {
                let mut stdout = io::stdout();
                execute!(
                    stdout,
                    SetForegroundColor(Colors::DIM),
                    Print(format!("\r{} ", frames[i % frames.len()])),
                    ResetColor,
                )
                .ok();
                stdout.flush().ok();
                i += 1;
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            let mut stdout = io::stdout();
            execute!(stdout, Print("\r  \r")).ok();
            stdout.flush().ok();
        });

        Ok(SpinnerHandle {
            running,
            thread: Some(handle),
        })
    }

    /// Print an error message.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an info message.
    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

fn preview(content: &str) -> String {
    let total = content.chars().count();
    if total > RESULT_PREVIEW_CHARS {
        let head: String = content.chars().take(RESULT_PREVIEW_CHARS).collect();
        format!("{}... ({} chars total)", head, total)
    } else {
        content.to_string()
    }
}

/// Handle to a running spinner. Drop or call stop() to terminate it.
pub struct SpinnerHandle {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SpinnerHandle {
    /// Stop the spinner and wait for the line to be cleared.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
