//! `docchat-server` serves streamed, document-grounded answers over HTTP.
//! Answers go out as SSE; conversation memory and ingestion are plain JSON
//! endpoints.

pub mod config;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::{ConfigError, ServerConfig, VectorStoreKind};
pub use server::{app_router, ingest_on_startup, run_server};
pub use state::{AppState, IngestError};
