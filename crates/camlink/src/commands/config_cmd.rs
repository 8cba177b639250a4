//! Config subcommand handlers.

use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Paths {
    config: String,
    state: String,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { address, force } => {
            let path = config::active_config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: config::display(&path),
                });
            }

            // Validate before writing anything.
            if let Some(ref a) = address {
                config::parse_address(a)?;
            }
            let cfg = Config {
                address,
                ..Config::default()
            };
            config::save_config_to(&cfg, &path)?;
            output::print_output(&format!("Wrote {}", path.display()), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            // Surface invalid values here rather than on the next connect.
            config::session_config(global, &cfg, &config::State::default())?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |c| c.address.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let paths = Paths {
                config: config::display(&config::active_config_path(global)),
                state: config::display(&config::state_path()),
            };
            let out = output::render_single(
                &global.output,
                &paths,
                |p| format!("Config: {}\nState:  {}", p.config, p.state),
                |p| p.config.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
