//! Batched submission of data records.

use crate::index::CancelFlag;
use graphseed_gremlin::{GremlinError, RemoteSession, ScriptRequest};
use std::io;
use tracing::{debug, info};

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Joins the records of one batch into a single script.
pub const RECORD_DELIMITER: &str = ";\n";

/// Default placeholder for the traversal source in data files.
pub const DEFAULT_TOKEN: &str = "g.";

/// Steps that already make a traversal execute. Any other record gets
/// `.iterate()` appended, since the server only iterates a script's last
/// statement on its own.
const TERMINAL_STEPS: [&str; 5] = [".iterate()", ".next()", ".toList()", ".toSet()", ".hasNext()"];

/// The statement submitted for one record: trailing `;` removed and a
/// terminal step appended when the record has none.
pub fn terminated(record: &str) -> String {
    let record = record.trim_end().trim_end_matches(';').trim_end();
    if TERMINAL_STEPS.iter().any(|step| record.ends_with(step)) {
        record.to_string()
    } else {
        format!("{record}.iterate()")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error("failed to read record {record}: {source}")]
    Io {
        record: usize,
        #[source]
        source: io::Error,
    },
    #[error("batch {batch} (records {first}..={last}) rejected: {source}")]
    Remote {
        batch: usize,
        first: usize,
        last: usize,
        #[source]
        source: GremlinError,
    },
    #[error("loading cancelled after {batches} batch(es)")]
    Cancelled { batches: usize },
}

/// Rewrites the traversal-source placeholder in each record.
///
/// Every occurrence of `token` is replaced, once per record; data files are
/// trusted not to contain the token anywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRewriter {
    token: String,
    replacement: String,
}

impl TokenRewriter {
    pub fn new(token: &str, replacement: &str) -> Self {
        Self {
            token: token.to_string(),
            replacement: replacement.to_string(),
        }
    }

    /// `g.` becomes `<source>.`.
    pub fn for_source(source: &str) -> Self {
        Self::new(DEFAULT_TOKEN, &format!("{source}."))
    }

    pub fn rewrite(&self, record: &str) -> String {
        if self.token.is_empty() {
            return record.to_string();
        }
        record.replace(&self.token, &self.replacement)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub records: usize,
    pub batches: usize,
}

#[derive(Debug, Clone)]
pub struct BatchLoader {
    batch_size: usize,
    rewriter: TokenRewriter,
    cancel: CancelFlag,
}

impl BatchLoader {
    pub fn new(batch_size: usize, rewriter: TokenRewriter) -> Result<Self, LoadError> {
        if batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }
        Ok(Self {
            batch_size,
            rewriter,
            cancel: CancelFlag::new(),
        })
    }

    /// Stop before the next batch once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Stream `records` to the session, `batch_size` records per round trip.
    ///
    /// Records keep their source order and are never split across batches;
    /// a trailing partial batch is always submitted. Every record is
    /// submitted as its own terminated statement (see [`terminated`]).
    pub fn load<S, I>(&self, session: &mut S, records: I) -> Result<LoadStats, LoadError>
    where
        S: RemoteSession + ?Sized,
        I: IntoIterator<Item = io::Result<String>>,
    {
        let mut stats = LoadStats::default();
        let mut pending: Vec<String> = Vec::with_capacity(self.batch_size);

        for record in records {
            let record = record.map_err(|source| LoadError::Io {
                record: stats.records + pending.len() + 1,
                source,
            })?;
            pending.push(terminated(&self.rewriter.rewrite(&record)));
            if pending.len() == self.batch_size {
                self.flush(session, &mut pending, &mut stats)?;
            }
        }
        if !pending.is_empty() {
            self.flush(session, &mut pending, &mut stats)?;
        }

        info!(
            records = stats.records,
            batches = stats.batches,
            batch_size = self.batch_size,
            "loaded records"
        );
        Ok(stats)
    }

    fn flush<S>(
        &self,
        session: &mut S,
        pending: &mut Vec<String>,
        stats: &mut LoadStats,
    ) -> Result<(), LoadError>
    where
        S: RemoteSession + ?Sized,
    {
        if self.cancel.is_cancelled() {
            return Err(LoadError::Cancelled {
                batches: stats.batches,
            });
        }
        let batch = stats.batches + 1;
        let first = stats.records + 1;
        let last = stats.records + pending.len();

        let request = ScriptRequest::new(pending.join(RECORD_DELIMITER));
        session
            .submit(&request)
            .map_err(|source| LoadError::Remote {
                batch,
                first,
                last,
                source,
            })?;
        debug!(batch, first, last, "submitted batch");

        stats.batches = batch;
        stats.records = last;
        pending.clear();
        Ok(())
    }
}
