//! steplog function host library.
//!
//! This library exposes the handler and startup helpers for integration testing.
//! In production, `steplog-lambda` is used as a binary (main.rs).

pub mod bootstrap;
pub mod handler;
pub mod logging;

pub use handler::{BatchItemFailure, BatchResponse, handle};
