//! Interactive shell: one session, one intent per input line.
//!
//! Reads commands from stdin until `quit` or end of input, printing the
//! resulting snapshot after each. Failures are reported and the loop goes
//! on, so the session can be inspected and retried (an unconfirmed stop
//! in particular).

use std::io::IsTerminal;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use camlink_core::{SessionSnapshot, SettingsPatch};

use crate::cli::TargetArgs;
use crate::config;
use crate::error::CliError;
use crate::output;

use super::{Context, split_pairs};

const HELP: &str = "\
connect [ADDRESS]    connect (configured address or scan when omitted)
scan [ADDRESS...]    probe addresses in order and connect to the first camera
preview              start the preview feed
stop-preview         release the preview stream
record               start recording with the current settings
stop                 stop recording
set KEY=VALUE...     change resolution, quality or mode
refresh              re-read camera info
reconnect            drop and re-establish the connection
disconnect           drop the session
status               show the current session
help                 show this list
quit                 disconnect and leave";

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Connect(Option<String>),
    Scan(Vec<String>),
    Preview,
    StopPreview,
    Record,
    Stop,
    Set(Vec<String>),
    Refresh,
    Reconnect,
    Disconnect,
    Status,
    Help,
    Quit,
}

/// `Ok(None)` for blank lines and comments.
fn parse_line(raw: &str) -> Result<Option<Line>, String> {
    let mut words = raw.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<String> = words.map(str::to_owned).collect();

    let line = match verb {
        _ if verb.starts_with('#') => return Ok(None),
        "connect" | "c" => Line::Connect(rest.into_iter().next()),
        "scan" => Line::Scan(rest),
        "preview" => Line::Preview,
        "stop-preview" => Line::StopPreview,
        "record" | "rec" => Line::Record,
        "stop" => Line::Stop,
        "set" if !rest.is_empty() => Line::Set(rest),
        "set" => return Err("usage: set KEY=VALUE...".into()),
        "refresh" => Line::Refresh,
        "reconnect" => Line::Reconnect,
        "disconnect" => Line::Disconnect,
        "status" | "s" => Line::Status,
        "help" | "?" => Line::Help,
        "quit" | "exit" | "q" => Line::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(line))
}

async fn execute(ctx: &Context<'_>, line: Line) -> Result<Arc<SessionSnapshot>, CliError> {
    let session = &ctx.session;
    match line {
        Line::Connect(address) => ctx.open(address.as_deref()).await,
        Line::Scan(addresses) if addresses.is_empty() => {
            ctx.scan(ctx.config.scan_candidates()?).await
        }
        Line::Scan(addresses) => {
            let candidates = addresses
                .iter()
                .map(String::as_str)
                .map(config::parse_address)
                .collect::<Result<Vec<_>, _>>()?;
            ctx.scan(Some(candidates)).await
        }
        Line::Preview => Ok(session.start_preview().await?),
        Line::StopPreview => Ok(session.stop_preview().await),
        Line::Record => Ok(session.start_recording().await?),
        Line::Stop => Ok(session.stop_recording().await?),
        Line::Set(pairs) => {
            let patch = SettingsPatch::from_pairs(split_pairs(&pairs)?)?;
            Ok(session.update_settings(&patch).await?)
        }
        Line::Refresh => Ok(session.refresh_info().await?),
        Line::Reconnect => Ok(session.reconnect().await?),
        Line::Disconnect => Ok(session.disconnect().await),
        Line::Status | Line::Help | Line::Quit => Ok(session.snapshot()),
    }
}

fn report(err: CliError) {
    eprintln!("{:?}", miette::Report::new(err));
}

pub async fn run(ctx: &Context<'_>, args: TargetArgs) -> Result<(), CliError> {
    let interactive = std::io::stdin().is_terminal();

    if let Some(address) = args.address.as_deref() {
        match ctx.open(Some(address)).await {
            Ok(snap) => ctx.print_snapshot(&snap, |s| s.state.to_string()),
            Err(e) => report(e),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            eprint!("camlink> ");
        }
        let Some(raw) = lines.next_line().await? else {
            break;
        };

        match parse_line(&raw) {
            Ok(None) => {}
            Ok(Some(Line::Quit)) => break,
            Ok(Some(Line::Help)) => output::print_output(HELP, ctx.global.quiet),
            Ok(Some(line)) => match execute(ctx, line).await {
                Ok(snap) => ctx.print_snapshot(&snap, |s| s.state.to_string()),
                Err(e) => report(e),
            },
            Err(msg) => eprintln!("{msg}"),
        }
    }

    if ctx.session.snapshot().is_recording() {
        tracing::warn!("leaving the shell while the camera is recording");
    }
    ctx.session.disconnect().await;
    Ok(())
}
