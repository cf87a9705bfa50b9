//! Output formatting for one-shot scans

use crate::scanner::ScanSnapshot;
use colored::*;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render a snapshot for the terminal
pub fn render_snapshot(snapshot: &ScanSnapshot, format: OutputFormat) -> crate::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
        OutputFormat::Text => Ok(render_text(snapshot)),
    }
}

fn render_text(snapshot: &ScanSnapshot) -> String {
    if snapshot.is_empty() {
        return format!("{}", "No services found".bright_yellow());
    }

    let mut lines = Vec::with_capacity(snapshot.len() + 1);
    lines.push(format!(
        "{:<7} {:<24} {}",
        "PORT".bold(),
        "URL".bold(),
        "TITLE".bold()
    ));

    for record in snapshot.records() {
        let mut line = format!(
            "{:<7} {:<24} {}",
            record.port.to_string().bright_green(),
            record.url.bright_cyan(),
            record.title
        );
        if let Some(ref favicon) = record.favicon {
            line.push_str(&format!(" {}", format!("[{}]", favicon).dimmed()));
        }
        lines.push(line);
    }

    lines.join("\n")
}
