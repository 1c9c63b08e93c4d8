mod cli;
mod config;
mod graphql;
mod guard;
mod http;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use platform_obs::{ObsConfig, init_tracing};
use tracing::info;
use uuid::Uuid;

use crate::{
    cli::Verdict,
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "dealer-server", version, about = "Dealer suite authorization service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Answer one permission question; exits 1 when denied.
    Check {
        role: String,
        resource: String,
        action: String,
    },
    /// Print the permission table.
    Matrix {
        #[arg(long, help = "Only print this role")]
        role: Option<String>,
        #[arg(long, help = "Emit JSON instead of a text table")]
        json: bool,
    },
    /// Mint a development session token.
    #[command(name = "token:issue")]
    TokenIssue(TokenCommand),
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[derive(Args, Debug)]
struct TokenCommand {
    #[arg(long)]
    email: String,
    #[arg(long)]
    role: String,
    #[arg(long, help = "Session id; random when omitted")]
    id: Option<Uuid>,
    #[arg(long, help = "Override SESSION_TTL_MINUTES")]
    ttl_minutes: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => {
            let config = Arc::new(AppConfig::load()?);
            run_server(cmd, config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            role,
            resource,
            action,
        } => {
            let verdict = cli::check(&role, &resource, &action);
            println!("{}", verdict.as_str());
            Ok(match verdict {
                Verdict::Allowed => ExitCode::SUCCESS,
                Verdict::Denied => ExitCode::FAILURE,
            })
        }
        Command::Matrix { role, json } => {
            let roles = cli::select_roles(role.as_deref())?;
            if json {
                println!("{}", cli::render_json(&roles)?);
            } else {
                print!("{}", cli::render_table(&roles));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::TokenIssue(cmd) => {
            let config = AppConfig::load()?;
            let session = cli::dev_session(cmd.email, cmd.role, cmd.id);
            println!("{}", cli::mint_token(config.auth, &session, cmd.ttl_minutes)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::SchemaPrint { output } => {
            schema_print(output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let schema = graphql::build_schema();
    let state = AppState::new(config, schema);
    http::serve(cmd.into(), state).await
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = cli::schema_sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema snapshot written");
        }
        None => print!("{sdl}"),
    }
    Ok(())
}
