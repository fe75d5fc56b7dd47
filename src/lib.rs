//! Monthly statistics server: keeps a local, query-friendly copy of artist, content and
//! community statistics pulled from the upstream services, and serves rankings over it.

pub mod background_jobs;
pub mod config;
pub mod period;
pub mod server;
pub mod server_store;
pub mod sqlite_persistence;
pub mod stats;
pub mod stats_store;
pub mod upstream;
