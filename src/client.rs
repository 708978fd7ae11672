//! Client for the Botpress Chat API.
//!
//! The client mediates all interaction with the remote conversational
//! service: it hides transport concerns (retries, timeouts, connection
//! pooling) and presents a normalized conversation/message model. Identity,
//! conversation metadata, and message lists are cached per the invalidation
//! contract documented on [`crate::cache`].

use std::env;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Response, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::cache::{KeyedCache, lock};
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CACHE_EVICTIONS, CACHE_HITS, CACHE_MISSES, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS,
    CLIENT_REQUESTS,
};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::sse::process_listen_stream;
use crate::types::{
    Conversation, ConversationListResponse, ConversationResponse, CreatedUser, Message,
    MessageListResponse, MessagePayload, MessageResponse, User, UserResponse,
};

const DEFAULT_BASE_URI: &str = "https://chat.botpress.cloud";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const STREAM_TIMEOUT: Duration = Duration::from_secs(120);
const POOL_MAX_IDLE_PER_HOST: usize = 20;

/// Default number of messages fetched per history request.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

/// Client for the Botpress Chat API.
///
/// One instance owns its caches exclusively; they are never shared. The
/// caches are plain keyed stores mutated only by the operation that owns a
/// given key's lifecycle, so concurrent callers against the same
/// conversation must coordinate externally (single writer per conversation).
pub struct Botpress {
    api_id: String,
    user_key: Mutex<String>,
    base_url: String,
    http: Mutex<Option<ReqwestClient>>,
    timeout: Duration,
    stream_timeout: Duration,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    logger: Option<Arc<dyn ClientLogger>>,
    user: Mutex<Option<User>>,
    conversations: KeyedCache<String, Conversation>,
    messages: KeyedCache<String, Vec<Message>>,
}

impl std::fmt::Debug for Botpress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Botpress")
            .field("api_id", &self.api_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("stream_timeout", &self.stream_timeout)
            .finish_non_exhaustive()
    }
}

impl Botpress {
    /// Create a new Botpress client.
    ///
    /// The API ID and user key can be provided directly or read from the
    /// CHAT_API_ID and CHAT_USER_KEY environment variables.
    pub fn new(api_id: Option<String>, user_key: Option<String>) -> Result<Self> {
        Self::with_options(api_id, user_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_id: Option<String>,
        user_key: Option<String>,
        base_uri: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_id = match api_id {
            Some(id) => id,
            None => env::var("CHAT_API_ID").map_err(|_| {
                Error::authentication(
                    "API ID not provided and CHAT_API_ID environment variable not set",
                )
            })?,
        };
        let user_key = match user_key {
            Some(key) => key,
            None => env::var("CHAT_USER_KEY").map_err(|_| {
                Error::authentication(
                    "user key not provided and CHAT_USER_KEY environment variable not set",
                )
            })?,
        };

        let base_uri = base_uri.unwrap_or_else(|| DEFAULT_BASE_URI.to_string());
        Url::parse(&base_uri)?;
        let base_url = format!("{}/{}", base_uri.trim_end_matches('/'), api_id);

        let client = ReqwestClient::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_id,
            user_key: Mutex::new(user_key),
            base_url,
            http: Mutex::new(Some(client)),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            stream_timeout: STREAM_TIMEOUT,
            retry: RetryPolicy::new(),
            sleeper: Arc::new(TokioSleeper),
            logger: None,
            user: Mutex::new(None),
            conversations: KeyedCache::new(),
            messages: KeyedCache::new(),
        })
    }

    /// Replaces the retry policy shared by all operations.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the sleeper used for retry backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Installs a logger observing every API interaction.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Returns the API ID this client is scoped to.
    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    /// Returns true once [`Botpress::close`] has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.http).is_none()
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let user_key = lock(&self.user_key).clone();
        let value = HeaderValue::from_str(&user_key).map_err(|_| {
            Error::authentication("user key contains characters not permitted in a header")
        })?;
        headers.insert("x-user-key", value);
        Ok(headers)
    }

    /// Returns the pooled HTTP client, failing fast after close.
    fn http(&self) -> Result<ReqwestClient> {
        lock(&self.http)
            .clone()
            .ok_or_else(|| Error::closed("operation attempted on a closed client"))
    }

    /// Fails fast when the client has been closed.
    fn ensure_open(&self) -> Result<()> {
        if lock(&self.http).is_none() {
            return Err(Error::closed("operation attempted on a closed client"));
        }
        Ok(())
    }

    /// Convert a reqwest transport failure into our Error type.
    fn convert_transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", err),
                Some(self.timeout.as_secs_f64()),
            )
        } else if err.is_connect() {
            Error::connection(format!("Connection error: {}", err), Some(Box::new(err)))
        } else {
            Error::http_client(format!("Request failed: {}", err), Some(Box::new(err)))
        }
    }

    /// Process API response errors and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        // Headers we might need for error processing.
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        // The service wraps failures in an error envelope; fall back to the
        // raw body when it does not parse.
        #[derive(Deserialize)]
        struct ErrorEnvelope {
            error: Option<serde_json::Value>,
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = serde_json::from_str::<ErrorEnvelope>(&error_body).ok();
        let error_message = parsed
            .as_ref()
            .and_then(|envelope| match &envelope.error {
                Some(serde_json::Value::String(message)) => Some(message.clone()),
                Some(serde_json::Value::Object(fields)) => fields
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(String::from),
                _ => envelope.message.clone(),
            })
            .unwrap_or_else(|| error_body.clone());

        match status_code {
            400 => Error::bad_request(error_message),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message, None, None),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_message, request_id),
        }
    }

    /// One attempt of one request: send, check status, parse.
    async fn execute_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let http = self.http()?;
        let headers = self.default_headers()?;

        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let mut request = http.request(method, url).headers(headers).timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            self.convert_transport_error(e)
        })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Send one logical request through the shared retry policy.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        if let Some(logger) = &self.logger {
            logger.log_request(method.as_str(), path);
        }

        let result = self
            .retry
            .execute(self.sleeper.as_ref(), || {
                self.execute_once(method.clone(), &url, body.as_ref())
            })
            .await;

        if let Some(logger) = &self.logger {
            match &result {
                Ok(_) => logger.log_success(method.as_str(), path),
                Err(err) => logger.log_error(method.as_str(), path, err),
            }
        }
        result
    }

    /// Get the current user, fetching and caching the identity on first use.
    pub async fn get_user(&self) -> Result<User> {
        self.ensure_open()?;
        if let Some(user) = lock(&self.user).clone() {
            CACHE_HITS.click();
            return Ok(user);
        }
        CACHE_MISSES.click();
        let response: UserResponse = self.request(Method::GET, "/users/me", None).await?;
        *lock(&self.user) = Some(response.user.clone());
        Ok(response.user)
    }

    /// Create a new user. Invalidates the cached identity.
    pub async fn create_user(&self, name: &str, id: &str) -> Result<CreatedUser> {
        self.ensure_open()?;
        let body = serde_json::json!({ "name": name, "id": id });
        let result: Result<CreatedUser> = self.request(Method::POST, "/users", Some(body)).await;
        *lock(&self.user) = None;
        result
    }

    /// Rotate the user key in place. No network call; the cached identity is
    /// invalidated so the next [`Botpress::get_user`] fetches live.
    pub fn set_user_key(&self, key: impl Into<String>) {
        *lock(&self.user_key) = key.into();
        *lock(&self.user) = None;
    }

    /// Create a user and adopt the issued key.
    pub async fn create_and_set_user(&self, name: &str, id: &str) -> Result<CreatedUser> {
        let created = self.create_user(name, id).await?;
        self.set_user_key(created.key.clone());
        Ok(created)
    }

    /// Create a new conversation.
    ///
    /// A brand-new thread is necessarily empty, so its message-list cache
    /// entry is seeded empty to avoid an immediate re-fetch.
    pub async fn create_conversation(&self) -> Result<Conversation> {
        self.ensure_open()?;
        let body = serde_json::json!({ "body": {} });
        let response: ConversationResponse =
            self.request(Method::POST, "/conversations", Some(body)).await?;
        self.messages
            .put(response.conversation.id.clone(), Vec::new());
        Ok(response.conversation)
    }

    /// List all conversations for the current user. Always live.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.ensure_open()?;
        let response: ConversationListResponse =
            self.request(Method::GET, "/conversations", None).await?;
        Ok(response.conversations)
    }

    /// Get one conversation's details, cached after the first fetch.
    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.ensure_open()?;
        let key = conversation_id.to_string();
        if let Some(conversation) = self.conversations.get(&key) {
            CACHE_HITS.click();
            return Ok(conversation);
        }
        CACHE_MISSES.click();
        let path = format!("/conversations/{conversation_id}");
        let response: ConversationResponse = self.request(Method::GET, &path, None).await?;
        self.conversations.put(key, response.conversation.clone());
        Ok(response.conversation)
    }

    /// Send a text message in a conversation.
    ///
    /// The conversation's message-list cache entry is evicted
    /// unconditionally: the next read must observe the new message.
    pub async fn create_message(&self, text: &str, conversation_id: &str) -> Result<Message> {
        self.ensure_open()?;
        let body = serde_json::json!({
            "payload": MessagePayload::text(text),
            "conversationId": conversation_id,
        });
        let result: Result<MessageResponse> =
            self.request(Method::POST, "/messages", Some(body)).await;
        if self.messages.invalidate(&conversation_id.to_string()).is_some() {
            CACHE_EVICTIONS.click();
        }
        result.map(|response| response.message)
    }

    /// List a conversation's messages, newest first.
    ///
    /// Serves the cached list unless `ignore_cache` is set or no entry
    /// exists. On a live fetch, messages whose payloads lack a direct text
    /// field get their display text derived once and cached with the list.
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        limit: u32,
        ignore_cache: bool,
    ) -> Result<Vec<Message>> {
        self.ensure_open()?;
        let key = conversation_id.to_string();
        if !ignore_cache {
            if let Some(messages) = self.messages.get(&key) {
                CACHE_HITS.click();
                return Ok(messages);
            }
        }
        CACHE_MISSES.click();
        let path = format!("/conversations/{conversation_id}/messages?limit={limit}");
        let response: MessageListResponse = self.request(Method::GET, &path, None).await?;
        let mut messages = response.messages;
        for message in &mut messages {
            message.ensure_display_text();
        }
        self.messages.put(key, messages.clone());
        Ok(messages)
    }

    /// Open a server-sent-event stream over a conversation.
    ///
    /// Produces a lazy, unbounded sequence of normalized text chunks. The
    /// connection is held open for the stream's lifetime, bounded by the
    /// stream timeout; a failure yields one final error item.
    pub async fn listen_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        self.ensure_open()?;
        let http = self.http()?;
        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let path = format!("/conversations/{conversation_id}/listen");
        let url = format!("{}{}", self.base_url, path);
        if let Some(logger) = &self.logger {
            logger.log_request("GET", &path);
        }

        let response = http
            .get(&url)
            .headers(headers)
            .timeout(self.stream_timeout)
            .send()
            .await
            .map_err(|e| self.convert_transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let byte_stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        let stream = process_listen_stream(byte_stream);

        if let Some(logger) = self.logger.clone() {
            let conversation_id = conversation_id.to_string();
            let stream = stream.inspect(move |item| {
                if let Ok(chunk) = item {
                    logger.log_listen_chunk(&conversation_id, chunk);
                }
            });
            return Ok(Box::pin(stream));
        }
        Ok(Box::pin(stream))
    }

    /// Close the client: release the connection pool and clear every cache.
    ///
    /// Subsequent operations fail fast with a closed-client error; the
    /// client never lazily reconnects.
    pub fn close(&self) {
        lock(&self.http).take();
        self.conversations.clear();
        self.messages.clear();
        *lock(&self.user) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> Botpress {
        Botpress::new(Some("bot-1".to_string()), Some("uk-test".to_string())).unwrap()
    }

    #[test]
    fn client_creation() {
        let client = test_client();
        assert_eq!(client.api_id(), "bot-1");
        assert_eq!(client.base_url, "https://chat.botpress.cloud/bot-1");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert!(!client.is_closed());

        let client = Botpress::with_options(
            Some("bot-2".to_string()),
            Some("uk-test".to_string()),
            Some("https://chat.example.com/".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://chat.example.com/bot-2");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_base_uri_is_rejected() {
        let err = Botpress::with_options(
            Some("bot-1".to_string()),
            Some("uk-test".to_string()),
            Some("not a url".to_string()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[tokio::test]
    async fn cached_identity_is_served_without_network() {
        let client = test_client();
        *lock(&client.user) = Some(User::new("user-1"));
        let user = client.get_user().await.unwrap();
        assert_eq!(user.id, "user-1");
    }

    #[tokio::test]
    async fn set_user_key_invalidates_identity() {
        let client = test_client();
        *lock(&client.user) = Some(User::new("user-1"));
        client.set_user_key("uk-rotated");
        assert!(lock(&client.user).is_none());
        assert_eq!(*lock(&client.user_key), "uk-rotated");
    }

    #[tokio::test]
    async fn cached_messages_are_served_without_network() {
        let client = test_client();
        let message: Message = serde_json::from_str(
            r#"{"id":"msg-1","userId":"user-1","payload":{"type":"text","text":"hi"}}"#,
        )
        .unwrap();
        client.messages.put("conv-1".to_string(), vec![message]);
        let messages = client.list_messages("conv-1", 5, false).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "hi");
    }

    #[tokio::test]
    async fn closed_client_fails_fast() {
        let client = test_client();
        *lock(&client.user) = Some(User::new("user-1"));
        client.messages.put("conv-1".to_string(), Vec::new());
        client.close();
        assert!(client.is_closed());
        // Caches are cleared and every operation short-circuits, even ones
        // that could have been served from cache.
        assert!(client.get_user().await.unwrap_err().is_closed());
        assert!(
            client
                .list_messages("conv-1", 5, false)
                .await
                .unwrap_err()
                .is_closed()
        );
        assert!(client.list_conversations().await.unwrap_err().is_closed());
    }
}
