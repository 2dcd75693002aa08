//! Axum HTTP surface for the transfer coordinator: route table, request/response
//! bodies, and the error-to-response mapping.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build;
pub use state::AppState;
