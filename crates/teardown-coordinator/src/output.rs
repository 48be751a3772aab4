//! Rendering of reports for the terminal

use anyhow::Result;
use teardown_common::Report;

/// How reports are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

const NAME_WIDTH: usize = 40;

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width - 3).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Fixed-width table with one row per item and a summary line
pub fn render_table(report: &Report) -> String {
    if report.is_empty() {
        return "No cluster resources found.\n".to_string();
    }

    let mut out = format!(
        "{:<width$} {:<8} {:<12} {}\n",
        "NAME",
        "ACTION",
        "STATUS",
        "ID",
        width = NAME_WIDTH
    );
    out.push_str(&"-".repeat(NAME_WIDTH + 23 + 20));
    out.push('\n');

    for item in &report.items {
        let status = if item.action_status.as_str().is_empty() {
            "-"
        } else {
            item.action_status.as_str()
        };
        out.push_str(&format!(
            "{:<width$} {:<8} {:<12} {}\n",
            truncate(&item.name, NAME_WIDTH),
            item.action.as_str(),
            status,
            item.id,
            width = NAME_WIDTH
        ));
    }

    out.push_str(&format!("\nTotal: {}\n", report.summary()));
    out
}

pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(report)),
        OutputFormat::Json => render_json(report),
    }
}
