//! Command dispatch: bridges CLI args -> session intents -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod settings;
pub mod shell;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use camlink_core::{DeviceAddress, Session, SessionSnapshot};

use crate::cli::GlobalOpts;
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Everything a device-bound command needs: flags, config, and one session.
pub struct Context<'a> {
    pub global: &'a GlobalOpts,
    pub config: Config,
    pub session: Session,
}

impl<'a> Context<'a> {
    pub fn build(global: &'a GlobalOpts) -> Result<Self, CliError> {
        let cfg = config::load(global)?;
        let state = config::load_state_or_default();
        let session_config = config::session_config(global, &cfg, &state)?;
        let session = Session::new(session_config)?;

        Ok(Self {
            global,
            config: cfg,
            session,
        })
    }

    /// Connect to `address`, else the configured address, else scan.
    pub async fn open(&self, address: Option<&str>) -> Result<Arc<SessionSnapshot>, CliError> {
        let target = match address {
            Some(a) => Some(config::parse_address(a)?),
            None => self.config.default_address()?,
        };

        match target {
            Some(address) => {
                let spinner = self.spinner(&format!("Connecting to {address}"));
                let result = self.session.connect(address.clone()).await;
                finish(spinner);
                let snap = result?;
                config::remember(&address);
                Ok(snap)
            }
            None => self.scan(self.config.scan_candidates()?).await,
        }
    }

    /// Scan `candidates` (or the default order) and connect to the hit.
    pub async fn scan(
        &self,
        candidates: Option<Vec<DeviceAddress>>,
    ) -> Result<Arc<SessionSnapshot>, CliError> {
        let spinner = self.spinner("Scanning for camera");
        let result = self.session.scan_and_connect(candidates).await;
        finish(spinner);

        let snap = result?;
        if let Some(address) = snap.address() {
            config::remember(address);
        }
        Ok(snap)
    }

    pub fn color(&self) -> bool {
        output::should_color(&self.global.color)
    }

    /// Print a snapshot; `plain_fn` picks the value for `--output plain`.
    pub fn print_snapshot(
        &self,
        snap: &SessionSnapshot,
        plain_fn: impl Fn(&SessionSnapshot) -> String,
    ) {
        let out = output::render_snapshot(&self.global.output, snap, self.color(), plain_fn);
        output::print_output(&out, self.global.quiet);
    }

    /// A stderr spinner, only when someone is watching.
    fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.global.quiet || !std::io::stderr().is_terminal() {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_owned());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

fn finish(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

/// Split `key=value` arguments.
pub fn split_pairs(args: &[String]) -> Result<Vec<(String, String)>, CliError> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                .ok_or_else(|| CliError::Validation {
                    field: "setting".into(),
                    reason: format!("expected key=value, got '{arg}'"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn pairs_are_split_and_trimmed() {
        let pairs = split_pairs(&["resolution = 1280x720".into(), "mode=photo".into()]).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("resolution".to_owned(), "1280x720".to_owned()),
                ("mode".to_owned(), "photo".to_owned()),
            ]
        );
    }

    #[test]
    fn missing_equals_is_rejected() {
        assert!(matches!(
            split_pairs(&["resolution".into()]),
            Err(CliError::Validation { .. })
        ));
    }
}
