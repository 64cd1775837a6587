//! Gianged Departments - command-line access to the department hierarchy engine.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

use gianged_departments as app;

use app::audit::{AuditLog, TracingAuditSink};
use app::auth::{self, AuthContext, Role};
use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::db;
use app::models::{CreateDepartment, DepartmentColor, UpdateDepartment};
use app::{AppError, DepartmentService};

/// Manage an organization's departments.
#[derive(Parser)]
#[command(name = "gianged-departments", version)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    actor: ActorArgs,

    #[command(subcommand)]
    command: Command,
}

/// Who is acting. Without `--org` and `--member` the request is unauthenticated.
#[derive(Args)]
struct ActorArgs {
    #[arg(long, global = true)]
    org: Option<Uuid>,
    #[arg(long, global = true)]
    member: Option<Uuid>,
    /// Account id recorded in audit entries (defaults to the member id)
    #[arg(long, global = true)]
    account: Option<Uuid>,
    #[arg(long, global = true, default_value = "member")]
    role: Role,
}

impl ActorArgs {
    fn context(&self) -> Option<AuthContext> {
        let (organization_id, member_id) = (self.org?, self.member?);
        Some(AuthContext {
            organization_id,
            role: self.role,
            member_id,
            account_id: self.account.unwrap_or(member_id),
        })
    }
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init,
    /// Show a department with children, members and counts
    Show { id: Uuid },
    /// List departments
    List {
        #[arg(long)]
        active_only: bool,
    },
    /// Print the department forest
    Tree,
    /// Create a department (admin)
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        parent: Option<Uuid>,
        #[arg(long)]
        head: Option<Uuid>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<DepartmentColor>,
        #[arg(long, default_value_t = 0)]
        order: i32,
    },
    /// Change fields of a department
    Update(UpdateArgs),
    /// Delete a department, promoting its children (admin)
    Delete { id: Uuid },
}

#[derive(Args)]
struct UpdateArgs {
    id: Uuid,
    #[arg(long)]
    name: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    description: Option<String>,
    #[arg(long)]
    clear_description: bool,
    #[arg(long, conflicts_with = "clear_color")]
    color: Option<DepartmentColor>,
    #[arg(long)]
    clear_color: bool,
    #[arg(long, conflicts_with = "clear_head")]
    head: Option<Uuid>,
    #[arg(long)]
    clear_head: bool,
    #[arg(long, conflicts_with = "root")]
    parent: Option<Uuid>,
    /// Make the department a root
    #[arg(long)]
    root: bool,
    #[arg(long)]
    order: Option<i32>,
    #[arg(long)]
    active: Option<bool>,
}

/// Turn a value flag and its clear flag into a patch slot.
fn nullable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

impl From<UpdateArgs> for UpdateDepartment {
    fn from(args: UpdateArgs) -> Self {
        Self {
            name: args.name,
            description: nullable(args.description, args.clear_description),
            color: nullable(args.color, args.clear_color),
            head_id: nullable(args.head, args.clear_head),
            parent_id: nullable(args.parent, args.root),
            display_order: args.order,
            is_active: args.active,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AppError>() {
                Some(app_err) => eprintln!("{}: {app_err}", app_err.kind()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = load_config(&config_path)?;
    let _log_guard = init_logging(&config.logging)?;
    tracing::info!("Config path: {:?}", config_path);

    if let Command::Init = cli.command {
        config.save(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let ctx = auth::require(cli.actor.context())?;

    let conn = db::connect(&config.database.connection_string())
        .await
        .context("Failed to connect to database")?;
    if let Ok(version) = db::get_version(&conn).await {
        tracing::info!("Database: {}", version);
    }
    if let Ok(counts) = db::get_table_counts(&conn).await {
        tracing::debug!(
            "Tables: {} departments, {} members, {} jobs",
            counts.departments,
            counts.members,
            counts.jobs
        );
    }

    let (audit, audit_writer) = if config.audit.enabled {
        let (log, handle) = AuditLog::spawn(Arc::new(TracingAuditSink));
        (log, Some(handle))
    } else {
        (AuditLog::disabled(), None)
    };
    let service = DepartmentService::new(conn, config.hierarchy.clone(), audit);

    let outcome = execute(&service, &ctx, cli.command).await;

    // Let queued audit entries drain before exiting.
    drop(service);
    if let Some(handle) = audit_writer {
        let _ = handle.await;
    }
    outcome
}

async fn execute(service: &DepartmentService, ctx: &AuthContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init => Ok(()),
        Command::Show { id } => print_json(&service.get(ctx, id).await?),
        Command::List { active_only } => print_json(&service.list(ctx, active_only).await?),
        Command::Tree => print_json(&service.forest(ctx).await?),
        Command::Create {
            name,
            parent,
            head,
            description,
            color,
            order,
        } => {
            let data = CreateDepartment {
                name,
                description,
                color,
                parent_id: parent,
                head_id: head,
                display_order: order,
            };
            print_json(&service.create(ctx, data).await?)
        }
        Command::Update(args) => {
            let id = args.id;
            print_json(&service.update(ctx, id, args.into()).await?)
        }
        Command::Delete { id } => print_json(&service.delete(ctx, id).await?),
    }
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    match AppConfig::try_load(path) {
        ConfigLoadResult::Loaded(config) => Ok(config),
        ConfigLoadResult::Missing => Ok(AppConfig::default()),
        ConfigLoadResult::Invalid(e) => Err(anyhow!(e).context(format!("Invalid config {}", path.display()))),
    }
}

/// Console logging, plus a daily-rolling file when a log directory is set.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gianged-departments.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_args_to_patch() {
        let cli = Cli::parse_from([
            "gianged-departments",
            "update",
            "00000000-0000-0000-0000-000000000001",
            "--name",
            "Ops",
            "--root",
            "--clear-color",
            "--active",
            "false",
        ]);
        let Command::Update(args) = cli.command else {
            panic!("expected update");
        };
        let patch = UpdateDepartment::from(args);
        assert_eq!(patch.name.as_deref(), Some("Ops"));
        assert_eq!(patch.parent_id, Some(None));
        assert_eq!(patch.color, Some(None));
        assert_eq!(patch.head_id, None);
        assert_eq!(patch.is_active, Some(false));
    }

    #[test]
    fn test_actor_requires_org_and_member() {
        let cli = Cli::parse_from(["gianged-departments", "tree", "--org", "00000000-0000-0000-0000-000000000001"]);
        assert!(cli.actor.context().is_none());

        let cli = Cli::parse_from([
            "gianged-departments",
            "--org",
            "00000000-0000-0000-0000-000000000001",
            "--member",
            "00000000-0000-0000-0000-000000000002",
            "--role",
            "admin",
            "tree",
        ]);
        let ctx = cli.actor.context().unwrap();
        assert!(ctx.is_admin());
        assert_eq!(ctx.account_id, ctx.member_id);
    }
}
