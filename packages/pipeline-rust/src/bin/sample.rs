//! Sample host: registers a handful of commands and dispatches one of them
//! for the identity given on the command line.
//!
//! ```text
//! conduit-sample --user-id 5f0c... --role Admin admin-ping
//! conduit-sample register-email ""
//! RUST_LOG=debug conduit-sample --log-format json ping --fail
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use conduit_pipeline::telemetry::{self, LogFormat};
use conduit_pipeline::{
    AccessRequirement, Anonymous, CallContext, Handler, Identity, Mediator, Outcome, PipelineConfig,
    PipelineError, Principal, Request, ValidationFailure, Validator,
};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Unrestricted. Fails with an unexpected fault when asked to.
#[derive(Debug)]
struct Ping {
    should_fail: bool,
}

impl Request for Ping {
    type Response = Outcome;
}

struct PingHandler;

#[async_trait]
impl Handler<Ping> for PingHandler {
    async fn handle(&self, request: Ping, _cancellation: CancellationToken) -> anyhow::Result<Outcome> {
        if request.should_fail {
            anyhow::bail!("SomeSortOfError");
        }
        Ok(Outcome::success())
    }
}

/// Any authenticated caller.
#[derive(Debug)]
struct AuthorizedPing {
    should_fail: bool,
}

impl Request for AuthorizedPing {
    type Response = Outcome;
}

/// Callers in the `Admin` role.
#[derive(Debug)]
struct AdminPing {
    should_fail: bool,
}

impl Request for AdminPing {
    type Response = Outcome;
}

/// Answers both restricted pings with a modeled error when asked to fail.
struct RestrictedPingHandler;

#[async_trait]
impl Handler<AuthorizedPing> for RestrictedPingHandler {
    async fn handle(&self, request: AuthorizedPing, _cancellation: CancellationToken) -> anyhow::Result<Outcome> {
        Ok(modeled(request.should_fail))
    }
}

#[async_trait]
impl Handler<AdminPing> for RestrictedPingHandler {
    async fn handle(&self, request: AdminPing, _cancellation: CancellationToken) -> anyhow::Result<Outcome> {
        Ok(modeled(request.should_fail))
    }
}

fn modeled(should_fail: bool) -> Outcome {
    if should_fail {
        Outcome::error(["SomeSortOfError"])
    } else {
        Outcome::success()
    }
}

#[derive(Debug)]
struct RegisterEmail {
    email: String,
}

impl Request for RegisterEmail {
    type Response = Outcome;
}

struct RegisterEmailHandler;

#[async_trait]
impl Handler<RegisterEmail> for RegisterEmailHandler {
    async fn handle(&self, request: RegisterEmail, _cancellation: CancellationToken) -> anyhow::Result<Outcome> {
        tracing::info!(email = %request.email, "email registered");
        Ok(Outcome::created(None))
    }
}

/// Email must be present and look like an address.
struct EmailValidator {
    pattern: Regex,
}

impl EmailValidator {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?,
        })
    }
}

#[async_trait]
impl Validator<RegisterEmail> for EmailValidator {
    async fn validate(&self, request: &RegisterEmail, _cancellation: &CancellationToken) -> Vec<ValidationFailure> {
        if request.email.trim().is_empty() {
            vec![ValidationFailure::new("Email", "must not be empty").with_code("NotEmptyValidator")]
        } else if !self.pattern.is_match(&request.email) {
            vec![ValidationFailure::new("Email", "is not a valid email address").with_code("EmailValidator")]
        } else {
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "conduit-sample", about = "Dispatch a sample command through the conduit pipeline")]
struct Cli {
    /// Caller id. Omit to call anonymously.
    #[arg(long, env = "CONDUIT_USER_ID")]
    user_id: Option<Uuid>,

    /// Roles of the caller (repeat or comma-separate).
    #[arg(long = "role", env = "CONDUIT_ROLES", value_delimiter = ',')]
    roles: Vec<String>,

    /// JSON file with pipeline switches; missing keys stay enabled.
    #[arg(long, env = "CONDUIT_PIPELINE_CONFIG")]
    pipeline_config: Option<PathBuf>,

    #[arg(long, env = "CONDUIT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Unrestricted; `--fail` makes the handler fault.
    Ping {
        #[arg(long)]
        fail: bool,
    },
    /// Requires authentication; `--fail` returns a modeled error.
    AuthorizedPing {
        #[arg(long)]
        fail: bool,
    },
    /// Requires the `Admin` role; `--fail` returns a modeled error.
    AdminPing {
        #[arg(long)]
        fail: bool,
    },
    /// Validated: the email must be present and well formed.
    RegisterEmail { email: String },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading pipeline config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing pipeline config {}", path.display()))
}

fn build_mediator(config: PipelineConfig) -> anyhow::Result<Mediator> {
    Ok(Mediator::builder()
        .config(config)
        .handler::<Ping, _>(PingHandler)
        .handler::<AuthorizedPing, _>(RestrictedPingHandler)
        .require::<AuthorizedPing>(AccessRequirement::authenticated())
        .handler::<AdminPing, _>(RestrictedPingHandler)
        .require::<AdminPing>(AccessRequirement::from_csv("Admin"))
        .handler::<RegisterEmail, _>(RegisterEmailHandler)
        .validator::<RegisterEmail, _>(EmailValidator::new()?)
        .build())
}

fn caller(user_id: Option<Uuid>, roles: Vec<String>) -> Arc<dyn Identity> {
    match user_id {
        Some(id) => Arc::new(Principal::new(id).with_roles(roles)),
        None => Arc::new(Anonymous),
    }
}

async fn dispatch(mediator: &Mediator, command: Command, ctx: CallContext) -> Result<Outcome, PipelineError> {
    match command {
        Command::Ping { fail } => mediator.send(Ping { should_fail: fail }, ctx).await,
        Command::AuthorizedPing { fail } => mediator.send(AuthorizedPing { should_fail: fail }, ctx).await,
        Command::AdminPing { fail } => mediator.send(AdminPing { should_fail: fail }, ctx).await,
        Command::RegisterEmail { email } => mediator.send(RegisterEmail { email }, ctx).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_format)?;

    let mediator = build_mediator(load_config(cli.pipeline_config.as_ref())?)?;
    let ctx = CallContext::new(caller(cli.user_id, cli.roles), CancellationToken::new());

    let outcome = dispatch(&mediator, cli.command, ctx).await?;
    println!("{}", outcome.status());
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
