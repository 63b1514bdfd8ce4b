//! Session orchestration: one connection, phases in fixed order, guaranteed
//! release.

use crate::batch::{BatchLoader, LoadError, LoadStats, TokenRewriter, DEFAULT_BATCH_SIZE};
use crate::index::{IndexPoller, PollError, Sleeper, ThreadSleeper, WaitPolicy};
use crate::records::LineSource;
use crate::schema::{default_schema, validate_schema, SchemaError};
use graphseed_gremlin::{
    GremlinError, HttpSession, PropertyMap, RemoteSession, SchemaSpec, ScriptBuilder,
    SessionConfig,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_QUERY_LABEL: &str = "person";
pub const DEFAULT_QUERY_LIMIT: u64 = 10;

/// Opens remote sessions.
pub trait Connector {
    type Session: RemoteSession;

    fn connect(&self) -> Result<Self::Session, GremlinError>;
}

impl Connector for SessionConfig {
    type Session = HttpSession;

    fn connect(&self) -> Result<HttpSession, GremlinError> {
        HttpSession::connect(self.clone())
    }
}

/// Receives the rows of the read-back query.
pub trait RecordSink {
    fn emit(&mut self, row: &PropertyMap);
}

impl<F: FnMut(&PropertyMap)> RecordSink for F {
    fn emit(&mut self, row: &PropertyMap) {
        self(row)
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub graph: String,
    /// Create the graph, its schema and indexes, then load data.
    pub create: bool,
    /// Drop every element after the read query.
    pub drop: bool,
    /// Also drop the graph itself (implies `drop`).
    pub drop_graph: bool,
    /// Vertex records; the built-in sample is loaded when absent.
    pub vertex_file: Option<PathBuf>,
    pub edge_file: Option<PathBuf>,
    pub schema: SchemaSpec,
    pub batch_size: usize,
    /// Placeholder rewritten to the traversal source (`g.` by default).
    pub token: Option<String>,
    pub wait: WaitPolicy,
    pub query_label: String,
    pub query_limit: u64,
}

impl RunConfig {
    pub fn new(graph: &str) -> Self {
        Self {
            graph: graph.to_string(),
            create: false,
            drop: false,
            drop_graph: false,
            vertex_file: None,
            edge_file: None,
            schema: default_schema(),
            batch_size: DEFAULT_BATCH_SIZE,
            token: None,
            wait: WaitPolicy::default(),
            query_label: DEFAULT_QUERY_LABEL.to_string(),
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to connect: {0}")]
    Connect(#[source] GremlinError),
    #[error("{phase} failed: {source}")]
    Remote {
        phase: &'static str,
        #[source]
        source: GremlinError,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Index(#[from] PollError),
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("loading {what} failed: {source}")]
    Load {
        what: String,
        #[source]
        source: LoadError,
    },
    #[error("failed to close session: {0}")]
    Close(#[source] GremlinError),
    #[error("run cancelled before the {0}")]
    Cancelled(&'static str),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub vertices: LoadStats,
    pub edges: LoadStats,
    pub indexes_enabled: usize,
    pub rows_read: usize,
    pub dropped: bool,
}

impl RunReport {
    /// Round trips spent on data records.
    pub fn data_submissions(&self) -> usize {
        self.vertices.batches + self.edges.batches
    }
}

pub struct Orchestrator<Sl = ThreadSleeper> {
    config: RunConfig,
    poller: IndexPoller<Sl>,
}

impl Orchestrator<ThreadSleeper> {
    pub fn new(config: RunConfig) -> Self {
        let poller = IndexPoller::new(config.wait);
        Self { config, poller }
    }
}

impl<Sl: Sleeper> Orchestrator<Sl> {
    pub fn with_poller(config: RunConfig, poller: IndexPoller<Sl>) -> Self {
        Self { config, poller }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Connect, run every configured phase, and close the session on every
    /// exit path.
    pub fn run<C, K>(&mut self, connector: &C, sink: &mut K) -> Result<RunReport, RunError>
    where
        C: Connector,
        K: RecordSink + ?Sized,
    {
        if self.config.create {
            validate_schema(&self.config.schema)?;
        }

        let mut session = connector.connect().map_err(RunError::Connect)?;
        let outcome = self.run_on(&mut session, sink);
        let closed = session.close();

        match (outcome, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(RunError::Close(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "failed to close session after error");
                Err(e)
            }
        }
    }

    /// Run the phases on an already open session. The session is left open.
    pub fn run_on<S, K>(&mut self, session: &mut S, sink: &mut K) -> Result<RunReport, RunError>
    where
        S: RemoteSession + ?Sized,
        K: RecordSink + ?Sized,
    {
        let scripts = ScriptBuilder::new(&self.config.graph);
        let mut report = RunReport::default();

        if self.config.create {
            self.initialize(session, &scripts, &mut report)?;
        }

        if self.poller.cancel_flag().is_cancelled() {
            return Err(RunError::Cancelled("read query"));
        }
        info!(
            label = %self.config.query_label,
            limit = self.config.query_limit,
            "reading back vertices"
        );
        let rows = session
            .submit(&scripts.read_vertices(&self.config.query_label, self.config.query_limit))
            .and_then(|rs| rs.property_maps())
            .map_err(|source| RunError::Remote {
                phase: "read query",
                source,
            })?;
        for row in &rows {
            sink.emit(row);
        }
        report.rows_read = rows.len();

        if self.config.drop || self.config.drop_graph {
            info!(graph = %self.config.graph, "dropping all elements");
            phase(session, "drop elements", &scripts.drop_all())?;
            if self.config.drop_graph {
                phase(session, "drop graph", &scripts.drop_graph())?;
            }
            report.dropped = true;
        }

        Ok(report)
    }

    fn initialize<S>(
        &mut self,
        session: &mut S,
        scripts: &ScriptBuilder,
        report: &mut RunReport,
    ) -> Result<(), RunError>
    where
        S: RemoteSession + ?Sized,
    {
        info!(graph = %self.config.graph, "creating graph");
        phase(session, "create graph", &scripts.create_graph())?;
        phase(session, "define schema", &scripts.define_schema(&self.config.schema))?;

        for index in &self.config.schema.indexes {
            self.poller.activate(session, scripts, index)?;
            report.indexes_enabled += 1;
        }

        let rewriter = match self.config.token.as_deref() {
            Some(token) => TokenRewriter::new(token, &format!("{}.", scripts.traversal_source())),
            None => TokenRewriter::for_source(scripts.traversal_source()),
        };
        let loader = BatchLoader::new(self.config.batch_size, rewriter)
            .map_err(|source| RunError::Load {
                what: "records".to_string(),
                source,
            })?
            .with_cancel(self.poller.cancel_flag().clone());

        report.vertices = match self.config.vertex_file.as_deref() {
            Some(path) => load_file(&loader, session, path)?,
            None => loader
                .load(session, LineSource::sample())
                .map_err(|source| RunError::Load {
                    what: "sample vertices".to_string(),
                    source,
                })?,
        };
        if let Some(path) = self.config.edge_file.as_deref() {
            report.edges = load_file(&loader, session, path)?;
        }
        Ok(())
    }
}

fn phase<S>(
    session: &mut S,
    name: &'static str,
    request: &graphseed_gremlin::ScriptRequest,
) -> Result<(), RunError>
where
    S: RemoteSession + ?Sized,
{
    session
        .submit(request)
        .map(|_| ())
        .map_err(|source| RunError::Remote {
            phase: name,
            source,
        })
}

fn load_file<S>(loader: &BatchLoader, session: &mut S, path: &Path) -> Result<LoadStats, RunError>
where
    S: RemoteSession + ?Sized,
{
    let source = LineSource::open(path).map_err(|source| RunError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loading records");
    loader.load(session, source).map_err(|source| RunError::Load {
        what: path.display().to_string(),
        source,
    })
}
