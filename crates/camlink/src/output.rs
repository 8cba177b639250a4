//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Lists use `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use camlink_core::{ConnectionState, SessionSnapshot};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Connection state label, colored by severity when enabled.
pub fn state_label(state: ConnectionState, color: bool) -> String {
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        ConnectionState::Connected => label.green().to_string(),
        ConnectionState::Recording { uncertain: false } => label.red().bold().to_string(),
        ConnectionState::Recording { uncertain: true } => label.yellow().bold().to_string(),
        ConnectionState::Connecting => label.cyan().to_string(),
        ConnectionState::Disconnected => label.dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Render a session snapshot; `plain_fn` picks the one scripting value.
pub fn render_snapshot(
    format: &OutputFormat,
    snap: &SessionSnapshot,
    color: bool,
    plain_fn: impl Fn(&SessionSnapshot) -> String,
) -> String {
    render_single(format, snap, |s| snapshot_detail(s, color), plain_fn)
}

fn snapshot_detail(snap: &SessionSnapshot, color: bool) -> String {
    let dash = || "-".to_owned();
    let mut lines = vec![format!("State:      {}", state_label(snap.state, color))];

    if let Some(ref camera) = snap.camera {
        lines.push(format!("Address:    {}", camera.address));
        lines.push(format!("Model:      {}", camera.model));
        lines.push(format!("Firmware:   {}", camera.firmware));
        lines.push(format!("Battery:    {}%", camera.battery_percent));
    }
    lines.push(format!("Settings:   {}", snap.settings));
    lines.push(format!(
        "Preview:    {}",
        snap.preview.as_ref().map_or_else(dash, ToString::to_string)
    ));
    if let Some(ref err) = snap.last_error {
        lines.push(format!("Last error: {err}"));
    }
    lines.join("\n")
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

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"serialization failed: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use camlink_core::{CameraInfo, DeviceAddress, OperationalStatus, Settings};

    use super::*;

    fn connected() -> SessionSnapshot {
        let address = DeviceAddress::parse("192.168.42.1").unwrap();
        SessionSnapshot {
            revision: 3,
            state: ConnectionState::Connected,
            camera: Some(CameraInfo {
                address: address.clone(),
                model: "Yi4K".into(),
                firmware: "1.10.9".into(),
                battery_percent: 70,
                status: OperationalStatus::Connected,
            }),
            settings: Settings::default(),
            preview: None,
            last_error: None,
            known_addresses: vec![address],
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn detail_view_lists_camera_fields() {
        let text = render_snapshot(&OutputFormat::Table, &connected(), false, |s| {
            s.state.to_string()
        });
        assert!(text.contains("State:      connected"));
        assert!(text.contains("Model:      Yi4K"));
        assert!(text.contains("Battery:    70%"));
        assert!(text.contains("1920x1080 / high / video"));
    }

    #[test]
    fn json_view_is_structured() {
        let text = render_snapshot(&OutputFormat::JsonCompact, &connected(), false, |_| {
            String::new()
        });
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["state"]["state"], "connected");
        assert_eq!(value["camera"]["model"], "Yi4K");
        assert_eq!(value["settings"]["resolution"], "1920x1080");
    }

    #[test]
    fn plain_view_uses_the_picked_value() {
        let text = render_snapshot(&OutputFormat::Plain, &connected(), false, |s| {
            s.address().map(ToString::to_string).unwrap_or_default()
        });
        assert_eq!(text, "192.168.42.1");
    }

    #[test]
    fn uncolored_label_is_plain() {
        assert_eq!(
            state_label(ConnectionState::Recording { uncertain: true }, false),
            "recording (stop unconfirmed)"
        );
    }
}
