use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::{stdin, stdout};
use tower_lsp_server::{LspService, Server};

use reqfile_ls::error::{ReqlsError, ReqlsResult};
use reqfile_ls::ReqfileLs;
use reqfile_ls::config::{Settings, SettingsEventKind, load_settings};
use reqfile_ls::diagnostics::{Severity, has_errors, run_rules};
use reqfile_ls::intelligence::SyntaxIntelligence;
use reqfile_ls::parser::{ConfiguredBlockNames, ParsedDocument, parse};
use reqfile_ls::shadow::build_shadow_document;

/// Language server for `.bru` request files
#[derive(Parser)]
#[command(name = "reqfile-ls")]
#[command(version)]
#[command(about = "Language server for .bru request files")]
struct Cli {
    /// Configuration file applied over the user configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. `debug`, `reqfile_ls::shadow_queue=trace`); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the block tree of a request file as JSON
    Parse { file: PathBuf },
    /// Print the shadow document generated for a request file
    Shadow { file: PathBuf },
    /// Print diagnostics for a request file; exits with 1 if any is an error
    Check { file: PathBuf },
}

fn init_logging(cli_level: Option<&str>, settings: &Settings) {
    let filter = cli_level
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .or_else(|| settings.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    // stdout carries the LSP stream
    env_logger::Builder::new()
        .parse_filters(&filter)
        .target(env_logger::Target::Stderr)
        .init();
}

fn read_and_parse(file: &Path, settings: &Settings) -> ReqlsResult<(String, ParsedDocument)> {
    let text = std::fs::read_to_string(file).map_err(|source| ReqlsError::read(file, source))?;
    let names = ConfiguredBlockNames::from_settings(&settings.block_names);
    let parsed = parse(&text, &names)?;
    Ok((text, parsed))
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Information => "info",
        Severity::Hint => "hint",
    }
}

fn run_command(command: Commands, settings: &Settings) -> ReqlsResult<ExitCode> {
    match command {
        Commands::Parse { file } => {
            let (_, parsed) = read_and_parse(&file, settings)?;
            let json = serde_json::to_string_pretty(&parsed)?;
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Shadow { file } => {
            let (_, parsed) = read_and_parse(&file, settings)?;
            let source_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            print!("{}", build_shadow_document(&source_name, &parsed.blocks));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { file } => {
            let (_, parsed) = read_and_parse(&file, settings)?;
            let uri = std::path::absolute(&file)
                .ok()
                .and_then(|path| url::Url::from_file_path(path).ok())
                .map(|url| url.to_string())
                .unwrap_or_else(|| file.display().to_string());
            let diagnostics = run_rules(&uri, &parsed, &settings.diagnostics);
            for diagnostic in &diagnostics {
                let start = diagnostic.range.start();
                println!(
                    "{}:{}:{}: {}[{}]: {}",
                    file.display(),
                    start.line + 1,
                    start.character + 1,
                    severity_label(diagnostic.severity),
                    diagnostic.code,
                    diagnostic.message
                );
            }
            Ok(if has_errors(&diagnostics) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = load_settings(cli.config.as_deref(), None);
    init_logging(cli.log_level.as_deref(), &outcome.settings);
    for event in &outcome.events {
        match event.kind {
            SettingsEventKind::Info => log::info!(target: "reqfile_ls::config", "{}", event.message),
            SettingsEventKind::Warning => {
                log::warn!(target: "reqfile_ls::config", "{}", event.message)
            }
        }
    }
    let settings = outcome.settings;

    match cli.command {
        Some(command) => match run_command(command, &settings) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("Error: {}", err);
                ExitCode::FAILURE
            }
        },
        None => {
            let intelligence = match SyntaxIntelligence::new() {
                Ok(intelligence) => intelligence,
                Err(err) => {
                    eprintln!("Error: cannot load the JavaScript declarations query: {}", err);
                    return ExitCode::FAILURE;
                }
            };

            let (service, socket) = LspService::new(move |client| {
                ReqfileLs::new(client, intelligence, settings, cli.config)
            });
            Server::new(stdin(), stdout(), socket).serve(service).await;
            ExitCode::SUCCESS
        }
    }
}
