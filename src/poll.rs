//! Reply polling.
//!
//! After sending a user message, the caller repeatedly re-reads the newest
//! messages (bypassing the cache) until a message from another sender shows
//! up or the attempt budget runs out. This is a client-driven, at-least-once
//! protocol chosen over a persistent stream so no connection is held open
//! per active chat; the cost is up to one poll interval of added latency and
//! redundant reads.
//!
//! The loop is modeled as an explicit state machine
//! (`Sending → Polling(attempts_remaining) → Delivered | TimedOut`) driven
//! through the [`Sleeper`] seam, so tests run it without wall-clock delays.
//! Only one poller may be active per conversation at a time; concurrent
//! pollers would race on cache eviction and population.

use std::time::Duration;

use crate::client::Botpress;
use crate::error::Result;
use crate::observability::{POLL_ATTEMPTS, POLL_DELIVERIES, POLL_TIMEOUTS};
use crate::retry::Sleeper;
use crate::types::Message;

/// Delay between polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Poll attempts before giving up (with the default interval, ~10 seconds).
pub const MAX_POLL_ATTEMPTS: u32 = 20;

/// Messages fetched per poll; only the newest matters, but a small window
/// keeps the read cheap while tolerating interleaved traffic.
pub const POLL_FETCH_LIMIT: u32 = 5;

/// Where replies come from.
///
/// [`Botpress`] is the production implementation; tests substitute a
/// scripted one.
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    /// Post a text message to a conversation.
    async fn post_text(&self, conversation_id: &str, text: &str) -> Result<Message>;

    /// Fetch the newest messages in a conversation, newest first, bypassing
    /// any cache.
    async fn latest_messages(&self, conversation_id: &str, limit: u32) -> Result<Vec<Message>>;
}

#[async_trait::async_trait]
impl MessageSource for Botpress {
    async fn post_text(&self, conversation_id: &str, text: &str) -> Result<Message> {
        self.create_message(text, conversation_id).await
    }

    async fn latest_messages(&self, conversation_id: &str, limit: u32) -> Result<Vec<Message>> {
        self.list_messages(conversation_id, limit, true).await
    }
}

/// The poller's state.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// The user message has not been posted yet.
    Sending,
    /// Waiting for a reply, with this many polls left.
    Polling {
        /// Poll attempts remaining before timing out.
        attempts_remaining: u32,
    },
    /// A reply arrived.
    Delivered(Box<Message>),
    /// The attempt budget ran out without a reply.
    TimedOut,
}

/// The terminal result of one send-and-poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The assistant's reply.
    Delivered(Message),
    /// No reply arrived within the attempt budget.
    TimedOut {
        /// How many polls were made.
        attempts: u32,
    },
}

impl PollOutcome {
    /// Returns the delivered message, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            PollOutcome::Delivered(message) => Some(message),
            PollOutcome::TimedOut { .. } => None,
        }
    }
}

/// Drives the send-then-poll protocol for assistant replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyPoller {
    interval: Duration,
    max_attempts: u32,
    fetch_limit: u32,
}

impl ReplyPoller {
    /// Creates a poller with the default interval and attempt budget.
    pub fn new() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
            fetch_limit: POLL_FETCH_LIMIT,
        }
    }

    /// Sets the delay between polls.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the poll attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Posts `text` to the conversation and polls until a message from a
    /// sender other than `local_user_id` appears, or the budget runs out.
    ///
    /// The sender test alone decides delivery: a reply whose normalized
    /// text is empty still counts. Errors from the underlying source (after
    /// its own transport retries) abort the cycle.
    pub async fn send_and_poll<S>(
        &self,
        source: &S,
        sleeper: &dyn Sleeper,
        conversation_id: &str,
        local_user_id: &str,
        text: &str,
    ) -> Result<PollOutcome>
    where
        S: MessageSource + ?Sized,
    {
        let mut state = PollState::Sending;
        loop {
            state = match state {
                PollState::Sending => {
                    source.post_text(conversation_id, text).await?;
                    PollState::Polling {
                        attempts_remaining: self.max_attempts,
                    }
                }
                PollState::Polling {
                    attempts_remaining: 0,
                } => PollState::TimedOut,
                PollState::Polling { attempts_remaining } => {
                    sleeper.sleep(self.interval).await;
                    POLL_ATTEMPTS.click();
                    let messages = source
                        .latest_messages(conversation_id, self.fetch_limit)
                        .await?;
                    match messages.into_iter().next() {
                        Some(newest) if !newest.is_from(local_user_id) => {
                            PollState::Delivered(Box::new(newest))
                        }
                        _ => PollState::Polling {
                            attempts_remaining: attempts_remaining - 1,
                        },
                    }
                }
                PollState::Delivered(message) => {
                    POLL_DELIVERIES.click();
                    return Ok(PollOutcome::Delivered(*message));
                }
                PollState::TimedOut => {
                    POLL_TIMEOUTS.click();
                    return Ok(PollOutcome::TimedOut {
                        attempts: self.max_attempts,
                    });
                }
            };
        }
    }
}

impl Default for ReplyPoller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::retry::NoopSleeper;

    fn message(id: &str, user_id: &str, text: &str) -> Message {
        serde_json::from_str(&format!(
            r#"{{"id":"{id}","userId":"{user_id}","payload":{{"type":"text","text":"{text}"}}}}"#
        ))
        .unwrap()
    }

    /// A scripted source: each poll pops the next message list; the last
    /// list repeats once the script is exhausted.
    struct ScriptedSource {
        lists: Mutex<VecDeque<Vec<Message>>>,
        last: Mutex<Vec<Message>>,
        polls: AtomicU32,
        posts: AtomicU32,
    }

    impl ScriptedSource {
        fn new(lists: Vec<Vec<Message>>) -> Self {
            Self {
                lists: Mutex::new(lists.into_iter().collect()),
                last: Mutex::new(Vec::new()),
                polls: AtomicU32::new(0),
                posts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl MessageSource for ScriptedSource {
        async fn post_text(&self, _: &str, text: &str) -> Result<Message> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            Ok(message("msg-posted", "user-1", text))
        }

        async fn latest_messages(&self, _: &str, _: u32) -> Result<Vec<Message>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut lists = self.lists.lock().unwrap();
            match lists.pop_front() {
                Some(list) => {
                    *self.last.lock().unwrap() = list.clone();
                    Ok(list)
                }
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }
    }

    #[tokio::test]
    async fn delivers_first_foreign_message() {
        let echo = vec![message("msg-1", "user-1", "hello")];
        let replied = vec![message("msg-2", "bot-1", "hi there"), echo[0].clone()];
        let source = ScriptedSource::new(vec![echo.clone(), echo.clone(), replied]);

        let outcome = ReplyPoller::new()
            .send_and_poll(&source, &NoopSleeper, "conv-1", "user-1", "hello")
            .await
            .unwrap();

        match outcome {
            PollOutcome::Delivered(reply) => {
                assert_eq!(reply.id, "msg-2");
                assert_eq!(reply.text(), "hi there");
            }
            PollOutcome::TimedOut { .. } => panic!("expected delivery"),
        }
        assert_eq!(source.posts.load(Ordering::SeqCst), 1);
        assert_eq!(source.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn times_out_after_attempt_budget() {
        let echo = vec![message("msg-1", "user-1", "hello")];
        let source = ScriptedSource::new(vec![echo]);

        let outcome = ReplyPoller::new()
            .send_and_poll(&source, &NoopSleeper, "conv-1", "user-1", "hello")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                attempts: MAX_POLL_ATTEMPTS
            }
        );
        assert!(outcome.message().is_none());
        assert_eq!(source.polls.load(Ordering::SeqCst), MAX_POLL_ATTEMPTS);
    }

    #[tokio::test]
    async fn empty_messages_keep_polling() {
        let replied = vec![message("msg-2", "bot-1", "hi")];
        let source = ScriptedSource::new(vec![Vec::new(), Vec::new(), replied]);

        let outcome = ReplyPoller::new()
            .send_and_poll(&source, &NoopSleeper, "conv-1", "user-1", "hello")
            .await
            .unwrap();

        assert!(outcome.message().is_some());
        assert_eq!(source.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_text_reply_still_counts_as_delivered() {
        let source = ScriptedSource::new(vec![vec![message("msg-2", "bot-1", "")]]);

        let outcome = ReplyPoller::new()
            .send_and_poll(&source, &NoopSleeper, "conv-1", "user-1", "hello")
            .await
            .unwrap();

        match outcome {
            PollOutcome::Delivered(reply) => assert_eq!(reply.text(), ""),
            PollOutcome::TimedOut { .. } => panic!("sender test alone decides delivery"),
        }
        assert_eq!(source.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reduced_budget_is_respected() {
        let echo = vec![message("msg-1", "user-1", "hello")];
        let source = ScriptedSource::new(vec![echo]);

        let outcome = ReplyPoller::new()
            .with_max_attempts(3)
            .send_and_poll(&source, &NoopSleeper, "conv-1", "user-1", "hello")
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
        assert_eq!(source.polls.load(Ordering::SeqCst), 3);
    }
}
