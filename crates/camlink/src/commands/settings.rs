//! Settings subcommand handlers.
//!
//! Operate on the `[settings]` section of the config file: the values every
//! new session starts with. Validation goes through the same rules the
//! session applies.

use serde::Serialize;
use tabled::Tabled;

use camlink_config::SettingsSection;
use camlink_core::settings::{SETTING_FIELDS, allowed_values};
use camlink_core::{Settings, SettingsPatch};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::split_pairs;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SettingEntry {
    field: &'static str,
    value: String,
    allowed: Vec<String>,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Allowed")]
    allowed: String,
}

impl From<&SettingEntry> for SettingRow {
    fn from(e: &SettingEntry) -> Self {
        Self {
            field: e.field.to_owned(),
            value: e.value.clone(),
            allowed: e.allowed.join(", "),
        }
    }
}

fn entries(settings: &Settings) -> Vec<SettingEntry> {
    SETTING_FIELDS
        .iter()
        .map(|&field| {
            let value = match field {
                "resolution" => settings.resolution.to_string(),
                "quality" => settings.quality.to_string(),
                _ => settings.mode.to_string(),
            };
            SettingEntry {
                field,
                value,
                allowed: allowed_values(field).unwrap_or_default(),
            }
        })
        .collect()
}

fn print(settings: &Settings, global: &GlobalOpts) {
    let out = output::render_list(
        &global.output,
        &entries(settings),
        |e| SettingRow::from(e),
        |e| format!("{}={}", e.field, e.value),
    );
    output::print_output(&out, global.quiet);
}

/// Validate `key=value` pairs against `base`.
fn apply_pairs(base: &Settings, pairs: &[String]) -> Result<Settings, CliError> {
    let patch = SettingsPatch::from_pairs(split_pairs(pairs)?)?;
    Ok(base.merged(&patch)?)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: SettingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load(global)?;
    let current = cfg.initial_settings()?;

    match args.command {
        SettingsCommand::Show => print(&current, global),

        SettingsCommand::Validate { pairs } => {
            let next = apply_pairs(&current, &pairs)?;
            print(&next, global);
        }

        SettingsCommand::Set { pairs } => {
            let next = apply_pairs(&current, &pairs)?;
            cfg.settings = SettingsSection {
                resolution: next.resolution.to_string(),
                quality: next.quality.to_string(),
                mode: next.mode.to_string(),
            };
            let path = config::active_config_path(global);
            config::save_config_to(&cfg, &path)?;
            tracing::info!(path = %path.display(), settings = %next, "settings saved");
            print(&next, global);
        }
    }
    Ok(())
}
