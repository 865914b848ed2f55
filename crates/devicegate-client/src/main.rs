//! DeviceGate CLI entry point.
//!
//! Drives the login orchestrator interactively: registration, the over-quota
//! resolution choice, session listing, and logout. The identity token is
//! acquired out of band (identity provider) and supplied via flag or env.

use clap::{Parser, Subcommand};
use dialoguer::Select;
use serde::Serialize;
use tabled::Tabled;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use devicegate_client::api::HttpSessionApi;
use devicegate_client::orchestrator::{LoginOrchestrator, LoginState, Resolution};
use devicegate_client::persist::FileSessionIdStore;
use devicegate_core::error::{AppError, ErrorKind};

use devicegate_api::dto::response::SessionResponse;
use devicegate_entity::session::SessionStatus;

mod output;

use output::OutputFormat;

/// DeviceGate client.
#[derive(Debug, Parser)]
#[command(name = "devicegate", about = "DeviceGate session client")]
struct Cli {
    /// Server base URL.
    #[arg(long, env = "DEVICEGATE_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Identity-provider bearer token.
    #[arg(long, env = "DEVICEGATE_TOKEN")]
    token: String,

    /// File holding the working session id.
    #[arg(long, env = "DEVICEGATE_SESSION_FILE", default_value = ".devicegate-session")]
    session_file: String,

    /// Output format.
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in on this device, resolving the quota interactively if needed.
    Login {
        /// Device descriptor shown to other devices.
        #[arg(long, default_value = "Terminal")]
        device_name: String,
    },
    /// List this account's sessions.
    Sessions,
    /// Show the working session and account.
    Status,
    /// Log out the working session.
    Logout,
}

/// Session display row.
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Session ID
    id: String,
    /// Device
    device: String,
    /// Status
    status: String,
    /// Issued
    issued: String,
}

impl From<&SessionResponse> for SessionRow {
    fn from(s: &SessionResponse) -> Self {
        let issued = chrono::DateTime::from_timestamp(s.issued_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| s.issued_at.to_string());

        Self {
            id: s.id.to_string(),
            device: s.device_name.clone(),
            status: s.status.to_string(),
            issued,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let api = HttpSessionApi::new(&cli.server, &cli.token);
    let persist = FileSessionIdStore::new(&cli.session_file);

    match cli.command {
        Command::Login { device_name } => {
            let mut orchestrator = LoginOrchestrator::new(api, persist, device_name);

            if orchestrator.resume().await? {
                output::print_success("Already signed in, session resumed");
                return Ok(());
            }

            orchestrator.start()?;
            orchestrator.register().await?;

            loop {
                match orchestrator.state().clone() {
                    LoginState::Resolved { session_id } => {
                        output::print_success(&format!("Signed in, session {session_id}"));
                        return Ok(());
                    }
                    LoginState::Aborted => {
                        println!("Login cancelled.");
                        return Ok(());
                    }
                    LoginState::ResolvingQuota {
                        candidate,
                        sessions,
                    } => {
                        let decision = prompt_resolution(candidate, &sessions)?;
                        if let Err(e) = orchestrator.resolve(decision).await {
                            // Transient failures re-present the same choice;
                            // the candidate stays pending on the server.
                            eprintln!("Resolution failed ({e}), try again");
                            if e.kind == ErrorKind::Unauthorized {
                                return Err(e);
                            }
                        }
                    }
                    state => {
                        return Err(AppError::internal(format!(
                            "Unexpected login state: {state:?}"
                        )));
                    }
                }
            }
        }
        Command::Sessions => {
            let mut orchestrator = LoginOrchestrator::new(api, persist, "Terminal");
            require_session(&mut orchestrator).await?;

            let sessions = orchestrator.list_sessions().await?;
            let rows: Vec<SessionRow> = sessions.iter().map(SessionRow::from).collect();
            output::print_list(&rows, cli.format);
            Ok(())
        }
        Command::Status => {
            let mut orchestrator = LoginOrchestrator::new(api, persist, "Terminal");
            require_session(&mut orchestrator).await?;

            let account = orchestrator.fetch_account().await?;
            println!("Account: {}", account.account_id);
            println!("Session: {}", account.session_id);
            Ok(())
        }
        Command::Logout => {
            let mut orchestrator = LoginOrchestrator::new(api, persist, "Terminal");
            require_session(&mut orchestrator).await?;

            orchestrator.logout().await?;
            output::print_success("Logged out");
            Ok(())
        }
    }
}

/// Resume the persisted session or explain how to sign in.
async fn require_session(
    orchestrator: &mut LoginOrchestrator<HttpSessionApi, FileSessionIdStore>,
) -> Result<(), AppError> {
    if orchestrator.resume().await? {
        Ok(())
    } else {
        Err(AppError::unauthorized(
            "No working session. Run `devicegate login` first.",
        ))
    }
}

/// Present the candidate and the session list, accept exactly one decision.
fn prompt_resolution(
    candidate: Uuid,
    sessions: &[SessionResponse],
) -> Result<Resolution, AppError> {
    println!("This account is at its device limit. Current sessions:");
    let rows: Vec<SessionRow> = sessions.iter().map(SessionRow::from).collect();
    output::print_list(&rows, OutputFormat::Table);

    let targets: Vec<&SessionResponse> = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Active && s.id != candidate)
        .collect();

    let mut items: Vec<String> = targets
        .iter()
        .map(|s| format!("Sign out \"{}\" and continue here", s.device_name))
        .collect();
    items.push("Cancel this login".to_string());

    let choice = Select::new()
        .with_prompt("Choose how to continue")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

    if choice < targets.len() {
        Ok(Resolution::ForceActivate {
            target: targets[choice].id,
        })
    } else {
        Ok(Resolution::Cancel)
    }
}
