//! Index activation.
//!
//! The engine builds and registers composite indexes asynchronously and
//! refuses to serve an index before it is `ENABLED`. Activation drives one
//! index through that lifecycle:
//!
//! 1. build the composite index
//! 2. request registration, then poll until the status reads `REGISTERED`
//! 3. request a reindex, then poll until the status reads `ENABLED`
//!
//! Status strings are compared for exact equality against those two
//! targets only; every other value means "not yet". Polling sleeps a fixed
//! interval before each read and can be bounded by a timeout or stopped
//! through a [`CancelFlag`].

use graphseed_gremlin::{GremlinError, IndexSpec, RemoteSession, ScriptBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

pub const STATUS_REGISTERED: &str = "REGISTERED";
pub const STATUS_ENABLED: &str = "ENABLED";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    /// Upper bound on the time spent sleeping between status reads.
    /// `None` waits as long as it takes.
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Shared stop request, set from a signal handler or another thread.
///
/// Checked by the index poller before every sleep and status read, by the
/// batch loader before every batch, and by the orchestrator before the read
/// query.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for registration with signal handlers.
    pub fn as_arc(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("index `{index}`: {action} failed: {source}")]
    Remote {
        index: String,
        action: &'static str,
        #[source]
        source: GremlinError,
    },
    #[error(
        "index `{index}` did not reach {target} within {waited:?} (last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    TimedOut {
        index: String,
        target: &'static str,
        last_status: Option<String>,
        waited: Duration,
    },
    #[error("waiting for index `{index}` to reach {target} was cancelled")]
    Cancelled { index: String, target: &'static str },
}

/// Status reads needed in each polling phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub registered_after: usize,
    pub enabled_after: usize,
}

pub struct IndexPoller<Sl = ThreadSleeper> {
    policy: WaitPolicy,
    sleeper: Sl,
    cancel: CancelFlag,
}

impl IndexPoller<ThreadSleeper> {
    pub fn new(policy: WaitPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }
}

impl<Sl: Sleeper> IndexPoller<Sl> {
    pub fn with_sleeper(policy: WaitPolicy, sleeper: Sl) -> Self {
        Self {
            policy,
            sleeper,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn sleeper(&self) -> &Sl {
        &self.sleeper
    }

    /// Build, register and enable `index`; returns once it is `ENABLED`.
    pub fn activate<S>(
        &mut self,
        session: &mut S,
        scripts: &ScriptBuilder,
        index: &IndexSpec,
    ) -> Result<Activation, PollError>
    where
        S: RemoteSession + ?Sized,
    {
        let name = index.name();
        info!(index = %name, property = %index.property, "activating index");

        send(session, &name, "build", &scripts.build_index(index))?;
        send(session, &name, "register", &scripts.register_index(index))?;
        let registered_after = self.await_status(session, scripts, index, STATUS_REGISTERED)?;

        send(session, &name, "reindex", &scripts.reindex(index))?;
        let enabled_after = self.await_status(session, scripts, index, STATUS_ENABLED)?;

        info!(
            index = %name,
            registered_after,
            enabled_after,
            "index enabled"
        );
        Ok(Activation {
            registered_after,
            enabled_after,
        })
    }

    /// Sleep, read the status, repeat until it equals `target` exactly.
    /// Returns the number of status reads performed.
    pub fn await_status<S>(
        &mut self,
        session: &mut S,
        scripts: &ScriptBuilder,
        index: &IndexSpec,
        target: &'static str,
    ) -> Result<usize, PollError>
    where
        S: RemoteSession + ?Sized,
    {
        let name = index.name();
        let request = scripts.index_status(index);
        let mut polls = 0;
        let mut waited = Duration::ZERO;
        let mut last_status: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled {
                    index: name,
                    target,
                });
            }
            if let Some(limit) = self.policy.timeout {
                if waited >= limit {
                    return Err(PollError::TimedOut {
                        index: name,
                        target,
                        last_status,
                        waited,
                    });
                }
            }

            self.sleeper.sleep(self.policy.interval);
            waited += self.policy.interval;
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled {
                    index: name,
                    target,
                });
            }

            let status = session
                .submit(&request)
                .and_then(|rs| rs.one_string())
                .map_err(|source| PollError::Remote {
                    index: name.clone(),
                    action: "status read",
                    source,
                })?;
            polls += 1;
            debug!(index = %name, %status, target, polls, "observed index status");

            if status == target {
                return Ok(polls);
            }
            last_status = Some(status);
        }
    }
}

fn send<S>(
    session: &mut S,
    index: &str,
    action: &'static str,
    request: &graphseed_gremlin::ScriptRequest,
) -> Result<(), PollError>
where
    S: RemoteSession + ?Sized,
{
    session
        .submit(request)
        .map(|_| ())
        .map_err(|source| PollError::Remote {
            index: index.to_string(),
            action,
            source,
        })
}
