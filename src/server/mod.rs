pub mod api_error;
mod client_identity;
pub mod config;
mod http_layers;
pub mod metrics;
mod pagination;
pub mod server;
mod songs_routes;
pub mod state;
mod upload_routes;

pub use api_error::{ApiError, Envelope};
pub use client_identity::ClientIdentity;
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, make_metrics_app, run_server, serve};
pub use state::ServerState;
