//! HTTP gateway for the Sourcer services.
//!
//! Three binaries share this crate: `sourcer-embed`, `sourcer-search` and
//! `sourcer-rerank`. Each builds its router from [`gateway`], opens the
//! socket immediately, and initializes dependencies in the background
//! (readiness reports `initializing` until they come up).

pub mod gateway;
