//! Shared types for the transfer coordinator: the error taxonomy every crate in
//! this workspace propagates with `?`, the typed process configuration, and the
//! identifier/secret newtypes that flow through the HTTP surface.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::AppConfig;
pub use errors::{ErrorKind, XferError, XferResult};
pub use ids::{FileId, Nonce, OwnerToken};
