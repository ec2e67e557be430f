//! PhraseApp CLI - Query projects and download locales from the PhraseApp API
//!
//! Thin command-line front end over the library client. With `--cache`,
//! GET responses are kept on disk and revalidated with ETags.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use phraseapp::cli::{Cli, Command, LocaleCommand, LocalesCommand, ProjectsCommand, StartupConfig};
use phraseapp::Client;

/// Sets up logging to stderr. `RUST_LOG` wins; `--debug` raises this
/// crate's level to debug.
fn init_tracing(debug: bool) {
    let default = if debug { "phraseapp=debug" } else { "phraseapp=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StartupConfig::from_cli(&cli)?;
    init_tracing(config.debug);

    let mut client = Client::new(config.credentials)?;
    if let Some(cache) = &config.cache {
        client.enable_caching(cache)?;
    }

    match cli.command {
        Command::Projects {
            action: ProjectsCommand::List { pagination },
        } => {
            let projects = client
                .projects_list(pagination.page, pagination.per_page)
                .await?;
            print_json(&projects)?;
        }
        Command::Locales {
            action: LocalesCommand::List {
                project_id,
                pagination,
            },
        } => {
            let locales = client
                .locales_list(&project_id, pagination.page, pagination.per_page)
                .await?;
            print_json(&locales)?;
        }
        Command::Locale { action } => {
            let download_params = action.download_params();
            match action {
                LocaleCommand::Show {
                    project_id,
                    locale_id,
                } => {
                    let locale = client.locale_show(&project_id, &locale_id).await?;
                    print_json(&locale)?;
                }
                LocaleCommand::Download {
                    project_id,
                    locale_id,
                    ..
                } => {
                    let params = download_params.unwrap_or_default();
                    let content = client
                        .locale_download(&project_id, &locale_id, &params)
                        .await?;
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&content)?;
                    stdout.flush()?;
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
