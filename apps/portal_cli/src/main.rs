mod config;
mod terminal;

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ApiClient, CookieSessionStore, CredentialTransport, MemorySessionStore, Outcome,
    PersistentSessionStore, SessionController, SessionStorageKind, SessionStore, View,
};
use shared::domain::{ObjectId, ObjectType};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{load_settings, Settings},
    terminal::TerminalUi,
};

#[derive(Parser, Debug)]
#[command(name = "portal", version, about = "Estate portal client")]
struct Cli {
    /// Backend base url, e.g. http://localhost:8080
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    profile_path: Option<String>,
    /// `bearer` or `cookie`
    #[arg(long, global = true)]
    credential_transport: Option<CredentialTransport>,
    /// `persistent`, `memory` or `cookie`
    #[arg(long, global = true)]
    session_storage: Option<SessionStorageKind>,
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Answer yes to confirmation prompts.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account; a verification code is emailed.
    Register {
        username: String,
        email: String,
        password: String,
    },
    VerifyEmail {
        email: String,
        code: String,
    },
    ResendVerification {
        email: String,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    Profile,
    /// Check the stored session against the backend.
    Validate,
    ForgotPassword {
        email: String,
    },
    ResetPassword {
        token: String,
        new_password: String,
    },
    /// List objects, optionally the children of one object or one type only.
    Objects {
        #[arg(long, conflicts_with = "object_type")]
        parent: Option<i64>,
        #[arg(long = "type", value_name = "TYPE")]
        object_type: Option<ObjectType>,
    },
    Create {
        name: String,
        #[arg(long = "type", value_name = "TYPE")]
        object_type: ObjectType,
        #[arg(long)]
        parent: Option<i64>,
    },
    Delete {
        id: i64,
    },
}

impl Cli {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = &self.api_url {
            settings.api_base_url = v.clone();
        }
        if let Some(v) = &self.profile_path {
            settings.profile_path = v.clone();
        }
        if let Some(v) = self.credential_transport {
            settings.credential_transport = v;
        }
        if let Some(v) = self.session_storage {
            settings.session_storage = v;
        }
        if let Some(v) = &self.database_url {
            settings.database_url = v.clone();
        }
        if let Some(v) = self.timeout_secs {
            settings.request_timeout_secs = (v > 0).then_some(v);
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    cli.apply_to(&mut settings);
    debug!(
        api_url = %settings.api_base_url,
        transport = %settings.credential_transport,
        storage = %settings.session_storage,
        "settings loaded"
    );

    let api = ApiClient::new(&settings.api_config()).context("invalid api settings")?;
    let store = open_session_store(&settings).await?;
    let ui = Arc::new(TerminalUi::new(cli.yes));
    let controller = SessionController::new(api, store, ui.clone());
    let state = controller.restore().await;
    debug!(?state, "session restored");

    let outcome = run(&controller, cli.command).await;
    let outcome = match ui.take_navigation() {
        Some(View::Profile) if outcome.is_done() => controller.load_profile().await,
        Some(View::Objects) if outcome.is_done() => controller.load_resource_list().await,
        _ => outcome,
    };

    Ok(match outcome {
        Outcome::Done | Outcome::Cancelled => ExitCode::SUCCESS,
        Outcome::Failed(_) => ExitCode::FAILURE,
    })
}

async fn run(controller: &SessionController, command: Command) -> Outcome {
    match command {
        Command::Register {
            username,
            email,
            password,
        } => controller.register(&username, &email, &password).await,
        Command::VerifyEmail { email, code } => controller.verify_email(&email, &code).await,
        Command::ResendVerification { email } => controller.resend_verification(&email).await,
        Command::Login { username, password } => controller.login(&username, &password).await,
        Command::Logout => {
            // The process must not exit before the notification goes out.
            if !controller.logout().await.settled().await {
                debug!("logout not acknowledged by server");
            }
            Outcome::Done
        }
        Command::Profile => controller.load_profile().await,
        Command::Validate => {
            let outcome = controller.validate_session().await;
            if outcome.is_done() {
                println!("Session is valid.");
            }
            outcome
        }
        Command::ForgotPassword { email } => controller.forgot_password(&email).await,
        Command::ResetPassword {
            token,
            new_password,
        } => controller.reset_password(&token, &new_password).await,
        Command::Objects {
            parent: Some(parent),
            ..
        } => controller.load_children(ObjectId(parent)).await,
        Command::Objects {
            object_type: Some(object_type),
            ..
        } => controller.load_resources_by_type(object_type).await,
        Command::Objects { .. } => controller.load_resource_list().await,
        Command::Create {
            name,
            object_type,
            parent,
        } => {
            controller
                .create_resource(&name, object_type, parent.map(ObjectId))
                .await
        }
        Command::Delete { id } => controller.delete_resource(ObjectId(id)).await,
    }
}

async fn open_session_store(settings: &Settings) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match settings.session_storage {
        SessionStorageKind::Persistent => Arc::new(
            PersistentSessionStore::open(&settings.database_url)
                .await
                .with_context(|| {
                    format!("failed to open session database '{}'", settings.database_url)
                })?,
        ),
        SessionStorageKind::Memory => {
            warn!("memory session storage does not outlive this command");
            Arc::new(MemorySessionStore::new())
        }
        SessionStorageKind::Cookie => {
            warn!("cookie session storage does not outlive this command");
            Arc::new(CookieSessionStore::new(&settings.api_base_url)?)
        }
    };
    Ok(store)
}
