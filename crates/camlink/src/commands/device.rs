//! Device command handlers: one-shot intents against a single camera.

use std::time::Duration;

use camlink_core::{SettingsPatch, SessionSnapshot};

use crate::cli::{RecordArgs, ScanArgs, TargetArgs};
use crate::config;
use crate::error::CliError;

use super::Context;

fn plain_address(snap: &SessionSnapshot) -> String {
    snap.address().map(ToString::to_string).unwrap_or_default()
}

// ── info ────────────────────────────────────────────────────────────

pub async fn info(ctx: &Context<'_>, args: TargetArgs) -> Result<(), CliError> {
    let snap = ctx.open(args.address.as_deref()).await?;
    ctx.print_snapshot(&snap, |s| {
        s.camera
            .as_ref()
            .map(|c| c.model.clone())
            .unwrap_or_default()
    });
    ctx.session.disconnect().await;
    Ok(())
}

// ── scan ────────────────────────────────────────────────────────────

pub async fn scan(ctx: &Context<'_>, args: ScanArgs) -> Result<(), CliError> {
    let candidates = if args.candidates.is_empty() {
        ctx.config.scan_candidates()?
    } else {
        Some(
            args.candidates
                .iter()
                .map(String::as_str)
                .map(config::parse_address)
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    let snap = ctx.scan(candidates).await?;
    ctx.print_snapshot(&snap, plain_address);
    ctx.session.disconnect().await;
    Ok(())
}

// ── preview ─────────────────────────────────────────────────────────

pub async fn preview(ctx: &Context<'_>, args: TargetArgs) -> Result<(), CliError> {
    ctx.open(args.address.as_deref()).await?;
    let snap = ctx.session.start_preview().await?;
    ctx.print_snapshot(&snap, |s| {
        s.preview.as_ref().map(ToString::to_string).unwrap_or_default()
    });
    ctx.session.disconnect().await;
    Ok(())
}

// ── record ──────────────────────────────────────────────────────────

pub async fn record(ctx: &Context<'_>, args: RecordArgs) -> Result<(), CliError> {
    let mut patch = SettingsPatch::default();
    if let Some(r) = args.resolution {
        patch = patch.with_resolution(r);
    }
    if let Some(q) = args.quality {
        patch = patch.with_quality(q);
    }
    if let Some(m) = args.mode {
        patch = patch.with_mode(m);
    }
    // Validate before touching the camera.
    if !patch.is_empty() {
        ctx.session.update_settings(&patch).await?;
    }

    ctx.open(args.target.address.as_deref()).await?;
    let started = ctx.session.start_recording().await?;
    let duration: Duration = args.duration.into();
    if !ctx.global.quiet {
        eprintln!(
            "Recording {} for {} (Ctrl-C stops early)",
            started.settings, args.duration
        );
    }

    tokio::select! {
        () = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, stopping early");
        }
    }

    let snap = ctx.session.stop_recording().await?;
    ctx.print_snapshot(&snap, |s| s.state.to_string());
    ctx.session.disconnect().await;
    Ok(())
}
