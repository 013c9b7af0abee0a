//! AgriServe access-control CLI
//!
//! Evaluate decisions, redact records and scrub text from the command line.

use agriserve_access::{
    AccessConfig, AccessGuard, ConfigLoader, Record, RequestContext, Table, can_access_admin_data,
    can_access_payments, can_access_pii, can_query_table, scrub_pii,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agriserve-access")]
#[command(version, about = "AgriServe assistant access control", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project directory holding agriserve.toml (defaults to the current dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an access decision for a caller
    Check {
        /// Request context as JSON
        #[arg(short, long)]
        context: String,

        #[command(subcommand)]
        target: CheckTarget,
    },

    /// Apply the PII policy to a record and audit the access
    Redact {
        /// Request context as JSON
        #[arg(short, long)]
        context: String,

        /// Record as a JSON object
        #[arg(short, long)]
        record: String,

        /// Owner of the record
        #[arg(short, long)]
        owner: Option<String>,

        /// Resource recorded in the audit event
        #[arg(long)]
        resource: Option<String>,
    },

    /// List queryable tables and their access class
    Tables,

    /// Replace emails and phone numbers in free text
    Scrub {
        /// Text to scrub
        text: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum CheckTarget {
    /// Access to another user's personal data
    Pii {
        /// Owner of the data
        #[arg(short, long)]
        owner: Option<String>,
    },
    /// Access to payment records
    Payments {
        /// Owner of the payments
        #[arg(short, long)]
        owner: Option<String>,
    },
    /// Access to operator data
    Admin,
    /// Permission to query a table
    Table {
        /// Table name
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::new().with_project_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("Failed to load configuration")?;

    // Setup logging; RUST_LOG wins over the configured level
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid logging level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { context, target } => check(&context, &target)?,
        Commands::Redact {
            context,
            record,
            owner,
            resource,
        } => redact(&config, &context, &record, owner.as_deref(), resource)?,
        Commands::Tables => list_tables(),
        Commands::Scrub { text } => scrub(&text),
        Commands::Config => {
            print!("{}", config.to_toml().context("Failed to render configuration")?);
        }
    }

    Ok(())
}

fn parse_context(json: &str) -> Result<RequestContext> {
    serde_json::from_str(json).context("Failed to parse request context JSON")
}

fn parse_record(json: &str) -> Result<Record> {
    match serde_json::from_str(json).context("Failed to parse record JSON")? {
        serde_json::Value::Object(record) => Ok(record),
        other => bail!("Record must be a JSON object, got: {other}"),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

fn check(context: &str, target: &CheckTarget) -> Result<()> {
    let ctx = parse_context(context)?;

    let decision = match target {
        CheckTarget::Pii { owner } => can_access_pii(&ctx, owner.as_deref()),
        CheckTarget::Payments { owner } => can_access_payments(&ctx, owner.as_deref()),
        CheckTarget::Admin => can_access_admin_data(&ctx),
        CheckTarget::Table { name } => can_query_table(&ctx, name),
    };

    debug!(allowed = decision.allowed, reason = %decision.reason, "Decision evaluated");
    print_json(&decision)
}

fn redact(
    config: &AccessConfig,
    context: &str,
    record: &str,
    owner: Option<&str>,
    resource: Option<String>,
) -> Result<()> {
    let ctx = parse_context(context)?;
    let record = parse_record(record)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let outcome = runtime.block_on(async {
        let (guard, worker) =
            AccessGuard::from_config(config).context("Failed to set up access guard")?;
        let guard = match resource {
            Some(resource) => guard.with_resource(resource),
            None => guard,
        };

        let result = guard.apply_pii_policy(&record, &ctx, owner);

        if let Some(worker) = worker {
            guard.shutdown(worker).await;
            info!(store = %config.audit.store_path.display(), "Audit trail flushed");
        }

        print_json(&result)
    });

    // Inserts abandoned after their timeout must not hold the process open.
    runtime.shutdown_timeout(config.audit.write_timeout());
    outcome
}

fn list_tables() {
    println!("{:<18} ACCESS", "TABLE");
    for table in Table::ALL {
        println!("{:<18} {:?}", table.name(), table.access());
    }
}

fn scrub(text: &str) {
    let result = scrub_pii(text);
    if result.found_pii() {
        info!(
            emails = result.emails,
            phones = result.phones,
            "PII scrubbed from text"
        );
    }
    println!("{}", result.scrubbed);
}
