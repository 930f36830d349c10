//! Speech service clients.
//!
//! This module contains implementations of [`SynthesisClient`](crate::SynthesisClient).
//!
//! # Available Clients
//!
//! Enable clients via Cargo features:
//! - `edge-cli` - Microsoft Edge online voices through the `edge-tts` executable

#[cfg(feature = "edge-cli")]
pub mod edge_cli;
