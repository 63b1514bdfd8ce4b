//! Graphseed CLI
//!
//! Seeds a Gremlin Server graph:
//! - creating the graph, its schema and composite indexes (waiting for
//!   each index to become `ENABLED`)
//! - bulk-loading vertex/edge records in batches
//! - reading back a bounded sample and optionally tearing the graph down

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use graphseed_gremlin::{
    ElementKind, HttpSession, IndexSpec, PropertyMap, RemoteSession, ScriptBuilder,
};
use graphseed_load::{CancelFlag, IndexPoller, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod render;

use config::{ConnectionArgs, QueryArgs, RunArgs};

#[derive(Parser)]
#[command(name = "graphseed")]
#[command(
    author,
    version,
    about = "Graphseed: schema, index and data seeding for Gremlin Server graphs"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, optionally create and load, read back, optionally drop.
    Run(RunArgs),

    /// Print the schema and index requests as JSON without connecting.
    Schema {
        /// Schema definition (JSON); defaults to the sample `person` schema.
        #[arg(long, env = "SCHEMA_FILE")]
        schema_file: Option<PathBuf>,
    },

    /// Print the current status of one composite index.
    Status {
        /// Indexed property name.
        property: String,

        /// Element kind: vertex|edge.
        #[arg(long, default_value = "vertex", value_parser = ElementKind::parse)]
        element: ElementKind,
    },

    /// Run only the read-back query.
    Query(QueryArgs),
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// First SIGINT/SIGTERM stops the run at its next poll, batch or read query;
/// a second one exits.
#[cfg(all(unix, feature = "signals"))]
fn install_interrupt_handler(cancel: &CancelFlag) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::flag;

    for signal in [SIGINT, SIGTERM] {
        flag::register_conditional_shutdown(signal, 130, cancel.as_arc())
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
        flag::register(signal, cancel.as_arc())
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }
    Ok(())
}

#[cfg(not(all(unix, feature = "signals")))]
fn install_interrupt_handler(_cancel: &CancelFlag) -> Result<()> {
    Ok(())
}

fn print_row(row: &PropertyMap) {
    println!("{}", render::render_row(row));
}

fn cmd_run(connection: &ConnectionArgs, args: &RunArgs, cancel: CancelFlag) -> Result<()> {
    let config = args.run_config(&connection.graph)?;
    let poller = IndexPoller::new(config.wait).with_cancel(cancel);
    let mut orchestrator = Orchestrator::with_poller(config, poller);

    let report = orchestrator
        .run(&connection.session_config(), &mut print_row)
        .with_context(|| format!("run against graph `{}` failed", connection.graph))?;
    println!("{}", render::render_report(&report));
    Ok(())
}

fn cmd_schema(graph: &str, schema_file: Option<&PathBuf>) -> Result<()> {
    let schema = config::resolve_schema(schema_file)?;
    let scripts = ScriptBuilder::new(graph);

    let mut requests = vec![scripts.create_graph(), scripts.define_schema(&schema)];
    for index in &schema.indexes {
        requests.push(scripts.build_index(index));
        requests.push(scripts.register_index(index));
        requests.push(scripts.reindex(index));
    }
    println!("{}", serde_json::to_string_pretty(&requests)?);
    Ok(())
}

fn cmd_status(connection: &ConnectionArgs, index: &IndexSpec) -> Result<()> {
    let mut session = HttpSession::connect(connection.session_config())
        .context("failed to connect")?;
    let scripts = ScriptBuilder::new(&connection.graph);
    let status = session
        .submit(&scripts.index_status(index))
        .and_then(|rs| rs.one_string())
        .with_context(|| format!("failed to read status of index `{}`", index.name()))?;
    session.close()?;
    println!("{} {}", index.name().bold(), status);
    Ok(())
}

fn cmd_query(connection: &ConnectionArgs, args: &QueryArgs) -> Result<()> {
    let mut session = HttpSession::connect(connection.session_config())
        .context("failed to connect")?;
    let scripts = ScriptBuilder::new(&connection.graph);
    let rows = session
        .submit(&scripts.read_vertices(&args.label, args.limit))
        .and_then(|rs| rs.property_maps())
        .context("read query failed")?;
    session.close()?;
    for row in &rows {
        print_row(row);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let cancel = CancelFlag::new();
    let result = install_interrupt_handler(&cancel).and_then(|()| match &cli.command {
        Commands::Run(args) => cmd_run(&cli.connection, args, cancel.clone()),
        Commands::Schema { schema_file } => cmd_schema(&cli.connection.graph, schema_file.as_ref()),
        Commands::Status { property, element } => cmd_status(
            &cli.connection,
            &IndexSpec {
                property: property.clone(),
                element: *element,
                unique: false,
            },
        ),
        Commands::Query(args) => cmd_query(&cli.connection, args),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
