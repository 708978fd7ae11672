// Public modules
pub mod cache;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod poll;
pub mod render;
pub mod retry;
pub mod sse;
pub mod types;
pub mod utils;

// Re-exports
pub use cache::KeyedCache;
pub use client::{Botpress, DEFAULT_MESSAGE_LIMIT};
pub use client_logger::{ClientLogger, StderrLogger};
pub use error::{Error, Result};
pub use poll::{MessageSource, PollOutcome, PollState, ReplyPoller};
pub use render::payload_to_markdown;
pub use retry::{NoopSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use types::*;
