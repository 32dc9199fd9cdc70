mod cli;
mod commands;
mod config;
mod error;
mod output;
mod tabular;

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
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;
    match command {
        // Local commands don't need a server connection
        Command::Config(args) => commands::config_cmd::handle(args, &global),
        Command::ProvisionTemplate(args) => commands::provision::template(&args, &global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "vmsync", &mut std::io::stdout());
            Ok(())
        }

        command => {
            let cfg = vmsync_config::load_config()?;
            let ctx = commands::Ctx::new(&global, &cfg);

            tracing::debug!(command = ?command, "dispatching command");
            commands::dispatch(command, &ctx).await
        }
    }
}
