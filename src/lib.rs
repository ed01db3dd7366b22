//! X Protocol session engine and CRUD/SQL builder pipeline.
//!
//! Layering (lowest to highest): [`wire`] (frame transport) → [`proto`]
//! (message codec) → [`session`] (handshake & lifecycle) → [`result`]
//! (per-statement receive state machine) → [`builder`] (CRUD/SQL
//! fluent builders).

pub mod builder;
pub mod constant;
pub mod error;
pub mod opts;
pub mod proto;
pub mod result;
pub mod session;
pub mod value;
pub mod wire;

pub use builder::{Delete, Find, Insert, Sql, Update};
pub use error::{Error, Result};
pub use opts::{AuthMethod, Opts, TlsMode, TlsOptions};
pub use result::{ResultHandle, ResultStream};
pub use session::{Crud, Namespace, Session};
pub use value::Value;
