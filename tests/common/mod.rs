//! Common test infrastructure for end-to-end tests
//!
//! Each test spawns an isolated stats server backed by temporary databases and a fake
//! upstream service whose data the test controls.
//!
//! # Example
//!
//! ```no_run
//! use common::{TestClient, TestServer};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let server = TestServer::spawn().await;
//!     server.upstream.put_artist(1, 120.0, 4.5);
//!     let client = TestClient::new(server.base_url.clone());
//!     let response = client.sync_artist(1).await;
//!     assert_eq!(response.status(), 200);
//! }
//! ```

pub mod client;
pub mod constants;
pub mod server;
pub mod upstream;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use server::TestServer;
#[allow(unused_imports)]
pub use upstream::FakeUpstream;
