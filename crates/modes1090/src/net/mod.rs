//! C8 — network multiplexer: raw-in/raw-out, sbs-in/sbs-out and HTTP.
//!
//! Re-architected from `spec.md` ss4.8's single-threaded reactor into
//! per-service `tokio::net::TcpListener` accept loops plus
//! `tokio::sync::broadcast` fan-out, per ss9's explicitly licensed
//! redesign ("either admissible concurrency model as long as the
//! data-ordering/handoff contract holds"). Each service is independent:
//! one failing to bind does not bring down the others, matching the
//! per-service `last_err` isolation the spec describes.

pub mod http;
pub mod raw;
pub mod sbs;
