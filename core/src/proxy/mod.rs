//! Proxy module - signing reverse proxy to a single Gonka endpoint

pub mod auth;
pub mod clock;
pub mod handlers;
pub mod model_cache;
pub mod server;
pub mod signer;
pub mod upstream;

pub use clock::HybridClock;
pub use model_cache::ModelCache;
pub use server::{build_router, AppState, ProxyServer};
pub use signer::{RequestSigner, SignedEnvelope};
pub use upstream::{UpstreamClient, UpstreamHandle};
