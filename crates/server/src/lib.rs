//! HTTP API for the embedsearch pipeline.
//!
//! - `POST /search` with `{ "q": "...", "use_local": false }` returns the closest documents
//! - `POST /embed` with `{ "files": ["a.json", ...] }` indexes files, reporting each one
//! - `POST /index` with `{ "id": "...", "content": ... }` indexes one inline document
//! - `GET /health` and `GET /ready` are liveness and readiness probes
//!
//! Errors are returned as `{ "error": { "code", "message" } }`.
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
