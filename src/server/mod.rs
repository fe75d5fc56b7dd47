pub mod config;
mod http_layers;
mod jobs_routes;
pub mod metrics;
pub mod server;
pub mod state;
mod stats_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use state::ServerState;
