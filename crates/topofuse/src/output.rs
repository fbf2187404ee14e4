//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use bytesize::ByteSize;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use topofuse_core::{LinkStatus, NodeStatus, RiskLevel};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

pub fn node_status(status: NodeStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        NodeStatus::Online => text.green().to_string(),
        NodeStatus::Offline => text.red().to_string(),
        NodeStatus::Alerting => text.yellow().to_string(),
        NodeStatus::Dormant | NodeStatus::Unknown => text.dimmed().to_string(),
    }
}

pub fn link_status(status: LinkStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        LinkStatus::Up => text.green().to_string(),
        LinkStatus::Down => text.red().to_string(),
        LinkStatus::Unknown => text.dimmed().to_string(),
    }
}

pub fn risk(level: RiskLevel, color: bool) -> String {
    let text = level.to_string();
    if !color {
        return text;
    }
    match level {
        RiskLevel::Critical => text.red().bold().to_string(),
        RiskLevel::High => text.red().to_string(),
        RiskLevel::Medium => text.yellow().to_string(),
        RiskLevel::Low => text.green().to_string(),
        RiskLevel::Unknown => text.dimmed().to_string(),
    }
}

/// Human byte count (`1.0 KiB`), or `-` when absent.
pub fn bytes(value: Option<u64>) -> String {
    value.map_or_else(|| "-".into(), |b| ByteSize::b(b).to_string())
}

pub fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_owned()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable items in the chosen format.
///
/// - `table`: builds rows with `to_row`
/// - `json` / `json-compact` / `yaml`: serializes the original data
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Plain => Ok(data.iter().map(id_fn).collect::<Vec<_>>().join("\n")),
        structured => render_structured(structured, data),
    }
}

/// Render a single item. Table output uses a pre-formatted detail view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Plain => Ok(id_fn(data)),
        structured => render_structured(structured, data),
    }
}

/// JSON or YAML for any serializable value; table and plain fall back to
/// pretty JSON.
pub fn render_structured<T: serde::Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(render_err)?,
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(render_err)?,
        OutputFormat::Json | OutputFormat::Table | OutputFormat::Plain => {
            serde_json::to_string_pretty(data).map_err(render_err)?
        }
    };
    Ok(rendered)
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_err(e: impl std::fmt::Display) -> CliError {
    CliError::Render(e.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: &'static str,
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        let items = [Item { id: "a" }, Item { id: "b" }];
        let out = render_list(OutputFormat::Plain, &items, |i| Row { id: i.id }, |i| i.id.into()).unwrap();
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_structured(OutputFormat::JsonCompact, &[Item { id: "a" }]).unwrap();
        assert_eq!(out, r#"[{"id":"a"}]"#);
    }

    #[test]
    fn table_has_headers() {
        let out = render_list(OutputFormat::Table, &[Item { id: "a" }], |i| Row { id: i.id }, |i| i.id.into()).unwrap();
        assert!(out.contains("ID"));
    }

    #[test]
    fn colorless_status_is_plain_text() {
        assert_eq!(node_status(NodeStatus::Online, false), "online");
        assert_eq!(risk(RiskLevel::High, false), "high");
        assert_eq!(bytes(None), "-");
        assert_eq!(bytes(Some(1024)), ByteSize::b(1024).to_string());
    }
}
