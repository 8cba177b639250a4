mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    match cli.command {
        // Local commands never build a session
        Command::Config(args) => commands::config_cmd::handle(args, &global),
        Command::Settings(args) => commands::settings::handle(args, &global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "camlink", &mut std::io::stdout());
            Ok(())
        }

        Command::Info(args) => {
            let ctx = commands::Context::build(&global)?;
            commands::device::info(&ctx, args).await
        }
        Command::Scan(args) => {
            let ctx = commands::Context::build(&global)?;
            commands::device::scan(&ctx, args).await
        }
        Command::Preview(args) => {
            let ctx = commands::Context::build(&global)?;
            commands::device::preview(&ctx, args).await
        }
        Command::Record(args) => {
            let ctx = commands::Context::build(&global)?;
            commands::device::record(&ctx, args).await
        }
        Command::Shell(args) => {
            let ctx = commands::Context::build(&global)?;
            commands::shell::run(&ctx, args).await
        }
    }
}
