//! Graphseed Gremlin: the remote engine boundary
//!
//! Everything that talks to a Gremlin Server lives here:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      GREMLIN BOUNDARY                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌───────────────┐   ScriptRequest   ┌────────────────────┐  │
//! │  │ ScriptBuilder │──────────────────►│   RemoteSession    │  │
//! │  │ (typed DDL)   │                   │  (HttpSession)     │  │
//! │  └───────────────┘                   └─────────┬──────────┘  │
//! │                                                │ POST /      │
//! │                                                ▼             │
//! │  ┌───────────────┐     ResultSet     ┌────────────────────┐  │
//! │  │   caller      │◄──────────────────│  GraphSON decoder  │  │
//! │  └───────────────┘                   └────────────────────┘  │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Parameterized**: user-supplied names travel as request bindings,
//!   never spliced into script text
//! - **Format-agnostic results**: GraphSON v1/v2/v3 typed wrappers are
//!   stripped into plain JSON values
//! - **Scoped release**: sessions are closed explicitly or on drop

pub mod error;
pub mod graphson;
pub mod mock;
pub mod request;
pub mod script;
pub mod session;

pub use error::GremlinError;
pub use graphson::{PropertyMap, ResultSet};
pub use request::ScriptRequest;
pub use script::{
    traversal_source, ElementKind, IndexSpec, PropertyKey, PropertyType, SchemaSpec,
    ScriptBuilder,
};
pub use session::{HttpSession, RemoteSession, SerializerFormat, SessionConfig};
