//! timeblock CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use timeblock_core::{TracingConfig, init_tracing};

use timeblock_client::cli::{AuthAction, Cli, Command, ConfigAction};
use timeblock_client::commands;
use timeblock_client::commands::auth::ConnectArgs;
use timeblock_client::config::ClientConfig;
use timeblock_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::for_cli(cli.debug, cli.json)) {
        eprintln!("warning: {}", e);
    }

    let json = cli.json;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, json);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = ClientConfig::load(cli.config.as_deref())?;
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);

    match cli.command {
        Command::Auth { action } => match action {
            AuthAction::Connect {
                client_id,
                client_secret,
                credentials_file,
                no_browser,
                force,
            } => {
                let args = ConnectArgs {
                    client_id,
                    client_secret,
                    credentials_file,
                    no_browser,
                    force,
                };
                commands::auth::connect(args, &config, &config_path).await
            }
            AuthAction::Status => commands::auth::status(&config, cli.json),
            AuthAction::Logout => commands::auth::logout(&config),
        },
        Command::Schedule(args) => commands::schedule::run(&args, &config, cli.json).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config, &config_path),
        },
    }
}

fn report(error: &ClientError, json: bool) {
    if json {
        let body = serde_json::json!({
            "error": { "kind": error.kind(), "message": error.to_string() }
        });
        eprintln!("{}", body);
    } else {
        eprintln!("error[{}]: {}", error.kind(), error);
    }
}
