//! Logging trait for Botpress client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to
//! observe all API interactions passing through the [`crate::Botpress`]
//! client: outgoing requests, their outcomes, and individual listen-stream
//! chunks. All hooks default to no-ops so implementations opt into what
//! they care about.

use crate::error::Error;

/// A trait for logging Botpress client operations.
pub trait ClientLogger: Send + Sync {
    /// Log an outgoing request before any attempt is made.
    fn log_request(&self, method: &str, path: &str) {
        _ = method;
        _ = path;
    }

    /// Log a request that completed successfully (possibly after retries).
    fn log_success(&self, method: &str, path: &str) {
        _ = method;
        _ = path;
    }

    /// Log a request that failed after the retry budget was exhausted.
    fn log_error(&self, method: &str, path: &str, error: &Error) {
        _ = method;
        _ = path;
        _ = error;
    }

    /// Log one normalized chunk produced by a listen stream.
    fn log_listen_chunk(&self, conversation_id: &str, chunk: &str) {
        _ = conversation_id;
        _ = chunk;
    }
}

/// A logger that writes one line per interaction to stderr.
///
/// Installed by the chat binary's `--verbose` flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrLogger;

impl ClientLogger for StderrLogger {
    fn log_request(&self, method: &str, path: &str) {
        eprintln!("palaver: {method} {path}");
    }

    fn log_success(&self, method: &str, path: &str) {
        eprintln!("palaver: {method} {path} ok");
    }

    fn log_error(&self, method: &str, path: &str, error: &Error) {
        eprintln!("palaver: {method} {path} failed: {error}");
    }

    fn log_listen_chunk(&self, conversation_id: &str, chunk: &str) {
        eprintln!("palaver: listen {conversation_id}: {chunk}");
    }
}
