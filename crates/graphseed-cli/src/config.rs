//! Command-line and environment configuration.
//!
//! Every option can come from a flag or from its environment variable;
//! flags win.

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use graphseed_gremlin::session::{DEFAULT_HOST, DEFAULT_PORT};
use graphseed_gremlin::{SchemaSpec, SerializerFormat, SessionConfig};
use graphseed_load::index::DEFAULT_POLL_INTERVAL;
use graphseed_load::orchestrator::{DEFAULT_QUERY_LABEL, DEFAULT_QUERY_LIMIT};
use graphseed_load::{default_schema, load_schema, RunConfig, WaitPolicy, DEFAULT_BATCH_SIZE};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Graph name; its traversal source is `<graph>_traversal`.
    #[arg(long, env = "GRAPH_NAME", default_value = "testgraph", global = true)]
    pub graph: String,

    #[arg(long, env = "GREMLIN_HOST", default_value = DEFAULT_HOST, global = true)]
    pub host: String,

    #[arg(long, env = "GREMLIN_PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    #[arg(long, env = "GREMLIN_USERNAME", global = true)]
    pub username: Option<String>,

    #[arg(long, env = "GREMLIN_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Connect over https.
    #[arg(
        long,
        env = "GREMLIN_TLS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub tls: bool,

    /// Result serializer: graphson-v1|graphson-v2|graphson-v3.
    #[arg(
        long,
        env = "GREMLIN_FORMAT",
        default_value = "graphson-v2",
        value_parser = SerializerFormat::parse,
        global = true
    )]
    pub format: SerializerFormat,

    /// Per-request timeout in seconds (0 = no timeout).
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub request_timeout_secs: u64,
}

impl ConnectionArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            host: self.host.clone(),
            port: self.port,
            tls: self.tls,
            username: self.username.clone().filter(|u| !u.is_empty()),
            password: self.password.clone().filter(|p| !p.is_empty()),
            format: self.format,
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Vertex label for the read-back query.
    #[arg(long, env = "QUERY_LABEL", default_value = DEFAULT_QUERY_LABEL)]
    pub label: String,

    /// Maximum number of rows to read back.
    #[arg(long, env = "QUERY_LIMIT", default_value_t = DEFAULT_QUERY_LIMIT)]
    pub limit: u64,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Create the graph, its schema and indexes, then load data.
    #[arg(
        long,
        env = "CREATE_GRAPH",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub create: bool,

    /// Drop every vertex (and its edges) after the read query.
    #[arg(
        long,
        env = "DROP_GRAPH",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub drop: bool,

    /// Drop every element and then the graph itself.
    #[arg(
        long,
        env = "PURGE_GRAPH",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub purge: bool,

    /// Vertex records, one Gremlin mutation per line (defaults to built-in sample data).
    #[arg(long, env = "VERTEX_FILE")]
    pub vertex_file: Option<PathBuf>,

    /// Edge records, loaded after the vertices.
    #[arg(long, env = "EDGE_FILE")]
    pub edge_file: Option<PathBuf>,

    /// Schema definition (JSON); defaults to the sample `person` schema.
    #[arg(long, env = "SCHEMA_FILE")]
    pub schema_file: Option<PathBuf>,

    /// Records per round trip.
    #[arg(
        long,
        env = "BATCH_SIZE",
        default_value_t = DEFAULT_BATCH_SIZE as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub batch_size: u64,

    /// Placeholder in data records rewritten to the traversal source.
    #[arg(long, env = "RECORD_TOKEN")]
    pub token: Option<String>,

    /// Seconds between index status reads.
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = DEFAULT_POLL_INTERVAL.as_secs()
    )]
    pub poll_interval_secs: u64,

    /// Give up waiting on an index after this many seconds (default: wait forever).
    #[arg(long, env = "POLL_TIMEOUT_SECS")]
    pub poll_timeout_secs: Option<u64>,

    #[command(flatten)]
    pub query: QueryArgs,
}

impl RunArgs {
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: self.poll_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn run_config(&self, graph: &str) -> Result<RunConfig> {
        let mut config = RunConfig::new(graph);
        config.create = self.create;
        config.drop = self.drop;
        config.drop_graph = self.purge;
        config.vertex_file = self.vertex_file.clone();
        config.edge_file = self.edge_file.clone();
        config.schema = resolve_schema(self.schema_file.as_ref())?;
        config.batch_size = usize::try_from(self.batch_size).context("--batch-size is too large")?;
        config.token = self.token.clone().filter(|t| !t.is_empty());
        config.wait = self.wait_policy();
        config.query_label = self.query.label.clone();
        config.query_limit = self.query.limit;
        Ok(config)
    }
}

pub fn resolve_schema(path: Option<&PathBuf>) -> Result<SchemaSpec> {
    match path {
        Some(path) => Ok(load_schema(path)?),
        None => Ok(default_schema()),
    }
}
