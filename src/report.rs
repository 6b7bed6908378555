//! Rendering of result sets.
//!
//! Human output lists every dispatched device as `ok` or `failed`, every
//! platform skip as `skipped`, then a recap line. JSON output is the
//! serialized [`ResultSet`]. Rendering is a pure function of its input.

use colored::Colorize;
use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::io::IsTerminal;
use std::time::Duration;

use crate::inventory::Inventory;
use crate::outcome::{Outcome, ResultSet};
use crate::platform::{PlatformRegistry, TransportKind};

/// Output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputMode::Human),
            "json" => Ok(OutputMode::Json),
            _ => Err(format!("Unknown output mode: {}. Valid options: human, json", s)),
        }
    }
}

/// Renders results for the terminal.
#[derive(Debug, Clone)]
pub struct Reporter {
    use_color: bool,
    mode: OutputMode,
}

impl Reporter {
    /// Create a reporter. `NO_COLOR` disables color.
    pub fn new(use_color: bool, mode: OutputMode) -> Self {
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        Self { use_color, mode }
    }

    /// Plain reporter without color.
    pub fn plain(mode: OutputMode) -> Self {
        Self {
            use_color: false,
            mode,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    fn paint(&self, text: &str, style: fn(&str) -> colored::ColoredString) -> String {
        if self.use_color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Spinner shown on stderr while devices are in flight. Hidden for
    /// JSON output or when stderr is not a terminal.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.mode == OutputMode::Json || !std::io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    /// Render a result set.
    pub fn render(&self, results: &ResultSet) -> String {
        match self.mode {
            OutputMode::Json => serde_json::to_string_pretty(results)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
            OutputMode::Human => self.render_human(results),
        }
    }

    fn render_human(&self, results: &ResultSet) -> String {
        let mut out = String::new();
        let header = format!("OPERATION [{}] ", results.operation);
        let stars = "*".repeat(72usize.saturating_sub(header.len()));
        let _ = writeln!(out, "{}{}", self.paint(&header, |s| s.bold()), stars);

        for (device, outcome) in results.iter() {
            let name = self.paint(device, |s| s.bright_white().bold());
            match outcome {
                Outcome::Success(payload) => {
                    let status = self.paint("ok", |s| s.green());
                    let text = payload.to_string();
                    if text.contains('\n') {
                        let _ = writeln!(out, "{}: [{}] =>", status, name);
                        for line in text.lines() {
                            let _ = writeln!(out, "    {}", line);
                        }
                    } else {
                        let _ = writeln!(out, "{}: [{}] => {}", status, name, text);
                    }
                }
                Outcome::Failure(failure) => {
                    let status = self.paint("failed", |s| s.red().bold());
                    let _ = writeln!(
                        out,
                        "{}: [{}] => {}: {}",
                        status,
                        name,
                        failure.reason,
                        failure.detail.trim()
                    );
                }
            }
        }

        for skip in &results.skipped {
            let status = self.paint("skipped", |s| s.cyan());
            let _ = writeln!(
                out,
                "{}: [{}] => unsupported platform '{}' for {}",
                status, skip.device, skip.platform, skip.transport
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.recap_line(results));
        if let Some(finished) = results.finished_at {
            let took = (finished - results.started_at).to_std().unwrap_or_default();
            let _ = writeln!(out, "Run took {}", format_duration(took));
        }
        out
    }

    /// `name : ok=N failed=N skipped=N`
    pub fn recap_line(&self, results: &ResultSet) -> String {
        let line = format!(
            "{:<20} : ok={:<4} failed={:<4} skipped={:<4}",
            results.operation,
            results.success_count(),
            results.failure_count(),
            results.skipped_count()
        );
        if !self.use_color {
            return line;
        }
        if results.has_failures() {
            line.red().bold().to_string()
        } else {
            line.green().to_string()
        }
    }

    /// Reachability listing, one device per line.
    pub fn render_reachability(&self, reachability: &IndexMap<String, bool>) -> String {
        if self.mode == OutputMode::Json {
            return serde_json::to_string_pretty(reachability).unwrap_or_default();
        }
        let mut out = String::new();
        for (device, reachable) in reachability {
            let status = if *reachable {
                self.paint("reachable", |s| s.green())
            } else {
                self.paint("unreachable", |s| s.red().bold())
            };
            let _ = writeln!(out, "{}: [{}]", status, device);
        }
        out
    }

    /// Device table with the canonical platform per transport.
    pub fn render_devices(&self, inventory: &Inventory, registry: &PlatformRegistry) -> String {
        let rows: Vec<Vec<String>> = inventory
            .devices()
            .map(|d| {
                let mut row = vec![d.name.clone(), d.address().to_string(), d.platform.clone()];
                row.extend(TransportKind::ALL.iter().map(|t| {
                    registry
                        .normalize(&d.platform, *t)
                        .unwrap_or("-")
                        .to_string()
                }));
                row
            })
            .collect();

        if self.mode == OutputMode::Json {
            let items: Vec<_> = rows
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "name": r[0],
                        "address": r[1],
                        "platform": r[2],
                        "restconf": r[3],
                        "cli": r[4],
                        "snmp": r[5],
                    })
                })
                .collect();
            return serde_json::to_string_pretty(&items).unwrap_or_default();
        }

        let headers = ["NAME", "ADDRESS", "PLATFORM", "RESTCONF", "CLI", "SNMP"];
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let mut out = String::new();
        let header: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:<w$}", h, w = w))
            .collect();
        let _ = writeln!(out, "{}", self.paint(header.join("  ").trim_end(), |s| s.bold()));
        for row in rows {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<w$}", c, w = w))
                .collect();
            let _ = writeln!(out, "{}", line.join("  ").trim_end());
        }
        out
    }
}

/// Format a duration as a human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
