//! In-memory session for tests.

use crate::error::GremlinError;
use crate::graphson::ResultSet;
use crate::request::ScriptRequest;
use crate::session::RemoteSession;
use serde_json::Value;
use std::collections::VecDeque;

type Responder = Box<dyn FnMut(&ScriptRequest) -> Result<ResultSet, GremlinError> + Send>;

/// Records every submission and answers through a caller-supplied closure.
pub struct ScriptedSession {
    responder: Responder,
    submitted: Vec<ScriptRequest>,
    closed: bool,
}

impl ScriptedSession {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&ScriptRequest) -> Result<ResultSet, GremlinError> + Send + 'static,
    {
        Self {
            responder: Box::new(responder),
            submitted: Vec::new(),
            closed: false,
        }
    }

    /// Every request succeeds with an empty result.
    pub fn accepting() -> Self {
        Self::new(|_| Ok(ResultSet::default()))
    }

    /// Index-status reads walk `statuses` in order (the last one repeats);
    /// `valueMap` reads return `rows`; everything else succeeds empty.
    pub fn with_statuses(statuses: &[&str], rows: Vec<Value>) -> Self {
        let mut queue: VecDeque<String> = statuses.iter().map(|s| s.to_string()).collect();
        Self::new(move |req| {
            if req.gremlin.contains("getIndexStatus") {
                let status = if queue.len() > 1 {
                    queue.pop_front().unwrap_or_default()
                } else {
                    queue.front().cloned().unwrap_or_default()
                };
                Ok(ResultSet::new(vec![Value::String(status)]))
            } else if req.gremlin.contains("valueMap") {
                Ok(ResultSet::new(rows.clone()))
            } else {
                Ok(ResultSet::default())
            }
        })
    }

    pub fn submitted(&self) -> &[ScriptRequest] {
        &self.submitted
    }

    /// Submissions whose script text contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.submitted
            .iter()
            .filter(|r| r.gremlin.contains(needle))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RemoteSession for ScriptedSession {
    fn submit(&mut self, request: &ScriptRequest) -> Result<ResultSet, GremlinError> {
        if self.closed {
            return Err(GremlinError::Closed);
        }
        self.submitted.push(request.clone());
        (self.responder)(request)
    }

    fn close(&mut self) -> Result<(), GremlinError> {
        self.closed = true;
        Ok(())
    }
}
