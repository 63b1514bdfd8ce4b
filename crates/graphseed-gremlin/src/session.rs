//! Remote sessions against a Gremlin Server.

use crate::error::GremlinError;
use crate::graphson::ResultSet;
use crate::request::ScriptRequest;
use crate::script::ScriptBuilder;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8182;

/// The only seam between client logic and the remote engine.
pub trait RemoteSession {
    /// Submit one script and wait for its full result.
    fn submit(&mut self, request: &ScriptRequest) -> Result<ResultSet, GremlinError>;

    /// Release the session. Further submissions fail with [`GremlinError::Closed`].
    fn close(&mut self) -> Result<(), GremlinError>;
}

impl<S: RemoteSession + ?Sized> RemoteSession for &mut S {
    fn submit(&mut self, request: &ScriptRequest) -> Result<ResultSet, GremlinError> {
        (**self).submit(request)
    }

    fn close(&mut self) -> Result<(), GremlinError> {
        (**self).close()
    }
}

impl<S: RemoteSession + ?Sized> RemoteSession for Box<S> {
    fn submit(&mut self, request: &ScriptRequest) -> Result<ResultSet, GremlinError> {
        (**self).submit(request)
    }

    fn close(&mut self) -> Result<(), GremlinError> {
        (**self).close()
    }
}

/// GraphSON flavour negotiated through the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializerFormat {
    GraphsonV1,
    #[default]
    GraphsonV2,
    GraphsonV3,
}

impl SerializerFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graphson-v1" | "v1" | "1" => Ok(Self::GraphsonV1),
            "graphson-v2" | "v2" | "2" => Ok(Self::GraphsonV2),
            "graphson-v3" | "v3" | "3" => Ok(Self::GraphsonV3),
            other => Err(format!(
                "unknown serializer `{other}` (expected graphson-v1|graphson-v2|graphson-v3)"
            )),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            SerializerFormat::GraphsonV1 => "application/vnd.gremlin-v1.0+json",
            SerializerFormat::GraphsonV2 => "application/vnd.gremlin-v2.0+json",
            SerializerFormat::GraphsonV3 => "application/vnd.gremlin-v3.0+json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub format: SerializerFormat,
    /// Per-request timeout (None = wait for the server indefinitely).
    pub request_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: false,
            username: None,
            password: None,
            format: SerializerFormat::default(),
            request_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl SessionConfig {
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}/", self.host.trim(), self.port)
    }
}

/// Session over the Gremlin Server HTTP endpoint.
///
/// Each [`RemoteSession::submit`] is one `POST /` round trip. The session is
/// released by [`RemoteSession::close`] or, failing that, on drop.
pub struct HttpSession {
    client: Client,
    url: String,
    config: SessionConfig,
    submissions: u64,
    open: bool,
}

impl HttpSession {
    /// Build the client and verify the server answers a probe script.
    pub fn connect(config: SessionConfig) -> Result<Self, GremlinError> {
        if config.host.trim().is_empty() {
            return Err(GremlinError::Config("host is empty".to_string()));
        }
        if config.password.is_some() && config.username.is_none() {
            return Err(GremlinError::Config(
                "a password was given without a username".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GremlinError::Client(e.to_string()))?;

        let mut session = Self {
            url: config.endpoint_url(),
            client,
            config,
            submissions: 0,
            open: true,
        };
        session.submit(&ScriptBuilder::probe())?;
        info!(
            url = %session.url,
            format = session.config.format.mime_type(),
            "connected to gremlin server"
        );
        Ok(session)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl RemoteSession for HttpSession {
    fn submit(&mut self, request: &ScriptRequest) -> Result<ResultSet, GremlinError> {
        if !self.open {
            return Err(GremlinError::Closed);
        }

        let mut http = self
            .client
            .post(&self.url)
            .header(ACCEPT, self.config.format.mime_type())
            .header(CONTENT_TYPE, "application/json")
            .json(request);
        if let Some(user) = self.config.username.as_deref() {
            http = http.basic_auth(user, self.config.password.as_deref());
        }

        let resp = http.send().map_err(|source| GremlinError::Transport {
            url: self.url.clone(),
            source,
        })?;
        self.submissions += 1;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GremlinError::Unauthorized {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let text = resp.text().map_err(|source| GremlinError::Transport {
            url: self.url.clone(),
            source,
        })?;
        debug!(
            status = status.as_u16(),
            bytes = text.len(),
            bindings = request.bindings.len(),
            "gremlin round trip"
        );

        let body: serde_json::Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(GremlinError::InvalidResponse(format!(
                    "body is not JSON: {e}"
                )))
            }
            Err(_) => {
                return Err(GremlinError::Server {
                    code: status.as_u16(),
                    message: text,
                })
            }
        };

        if !status.is_success() {
            // Script errors come back as HTTP 5xx with a bare `message` field.
            let message = body
                .get("message")
                .or_else(|| body.get("status").and_then(|s| s.get("message")))
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(GremlinError::Server {
                code: status.as_u16(),
                message,
            });
        }

        ResultSet::from_response(body)
    }

    fn close(&mut self) -> Result<(), GremlinError> {
        if self.open {
            self.open = false;
            info!(
                url = %self.url,
                submissions = self.submissions,
                "closed gremlin session"
            );
        }
        Ok(())
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            debug!(url = %self.url, "released gremlin session on drop");
        }
    }
}
