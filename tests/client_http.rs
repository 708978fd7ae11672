//! Client behavior tests against a scripted local HTTP server.
//!
//! Each test serves a fixed queue of responses and asserts on how many
//! requests actually reached the wire, which pins down the caching and
//! retry contracts without a live service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use palaver::{Botpress, NoopSleeper};

/// Serves the given `(status, body)` responses in order, one per request,
/// and repeats the last one if the queue runs dry. Returns the base URI and
/// a counter of requests served.
async fn spawn_server(responses: Vec<(u16, &str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let served = Arc::new(AtomicUsize::new(0));

    let queue: Arc<Mutex<VecDeque<(u16, String)>>> = Arc::new(Mutex::new(
        responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect(),
    ));

    let served_clone = served.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let queue = queue.clone();
            let served = served_clone.clone();
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_none() {
                    return;
                }
                served.fetch_add(1, Ordering::SeqCst);
                let (status, body) = {
                    let mut queue = queue.lock().unwrap();
                    match queue.pop_front() {
                        Some(response) => {
                            if queue.is_empty() {
                                queue.push_back(response.clone());
                            }
                            response
                        }
                        None => (200, "{}".to_string()),
                    }
                };
                let reason = match status {
                    200 => "OK",
                    401 => "Unauthorized",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\n\
                     content-type: application/json\r\n\
                     content-length: {}\r\n\
                     connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), served)
}

/// Reads one HTTP request (headers plus content-length body) off the socket.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) => return None,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..end]);
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            if name.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        return Some(());
                    }
                }
            }
            Err(_) => return None,
        }
    }
}

fn client_for(base_uri: &str) -> Botpress {
    Botpress::with_options(
        Some("bot-1".to_string()),
        Some("uk-test".to_string()),
        Some(base_uri.to_string()),
        None,
    )
    .unwrap()
    .with_sleeper(Arc::new(NoopSleeper))
}

const USER_A: &str = r#"{"user":{"id":"user-a","name":"Alice"}}"#;
const USER_B: &str = r#"{"user":{"id":"user-b","name":"Bob"}}"#;

#[tokio::test]
async fn retry_succeeds_after_transient_failures() {
    let (base, served) = spawn_server(vec![
        (503, r#"{"error":"overloaded"}"#),
        (503, r#"{"error":"overloaded"}"#),
        (200, USER_A),
    ])
    .await;
    let client = client_for(&base);

    let user = client.get_user().await.unwrap();
    assert_eq!(user.id, "user-a");
    assert_eq!(served.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_gives_up_after_exactly_three_attempts() {
    // A fourth attempt would hit the trailing 200 and succeed; the request
    // must fail instead.
    let (base, served) = spawn_server(vec![
        (500, r#"{"error":"boom"}"#),
        (500, r#"{"error":"boom"}"#),
        (500, r#"{"error":"boom"}"#),
        (200, USER_A),
    ])
    .await;
    let client = client_for(&base);

    let err = client.get_user().await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(served.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn auth_errors_are_not_retried() {
    let (base, served) = spawn_server(vec![(401, r#"{"error":"invalid user key"}"#)]).await;
    let client = client_for(&base);

    let err = client.get_user().await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(served.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn message_list_is_cached_and_normalized() {
    let body = r#"{"messages":[
        {"id":"msg-2","userId":"bot-1","payload":{"type":"card","title":"Elden Ring","subtitle":"Action RPG"}},
        {"id":"msg-1","userId":"user-a","payload":{"type":"text","text":"recommend me a game"}}
    ]}"#;
    let (base, served) = spawn_server(vec![(200, body)]).await;
    let client = client_for(&base);

    let first = client.list_messages("conv-1", 5, false).await.unwrap();
    assert_eq!(first.len(), 2);
    // Rich payload was normalized once, at fetch time.
    assert!(first[0].text().contains("Elden Ring"));
    assert_eq!(first[1].text(), "recommend me a game");

    let second = client.list_messages("conv-1", 5, false).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(served.load(Ordering::SeqCst), 1, "second read must be a cache hit");

    // An explicit bypass goes back to the wire.
    client.list_messages("conv-1", 5, true).await.unwrap();
    assert_eq!(served.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn create_message_evicts_the_conversation_cache() {
    let empty = r#"{"messages":[]}"#;
    let posted = r#"{"message":{"id":"msg-1","conversationId":"conv-1","userId":"user-a","payload":{"type":"text","text":"hi"}}}"#;
    let replied = r#"{"messages":[
        {"id":"msg-2","userId":"bot-1","payload":{"type":"text","text":"hello!"}},
        {"id":"msg-1","userId":"user-a","payload":{"type":"text","text":"hi"}}
    ]}"#;
    let (base, served) = spawn_server(vec![(200, empty), (200, posted), (200, replied)]).await;
    let client = client_for(&base);

    client.list_messages("conv-1", 5, false).await.unwrap();
    client.list_messages("conv-1", 5, false).await.unwrap();
    assert_eq!(served.load(Ordering::SeqCst), 1);

    client.create_message("hi", "conv-1").await.unwrap();
    assert_eq!(served.load(Ordering::SeqCst), 2);

    // Not a bypass, yet the send must have forced a live fetch.
    let messages = client.list_messages("conv-1", 5, false).await.unwrap();
    assert_eq!(served.load(Ordering::SeqCst), 3);
    assert_eq!(messages[0].text(), "hello!");
}

#[tokio::test]
async fn create_conversation_seeds_an_empty_message_cache() {
    let (base, served) =
        spawn_server(vec![(200, r#"{"conversation":{"id":"conv-9"}}"#)]).await;
    let client = client_for(&base);

    let conversation = client.create_conversation().await.unwrap();
    assert_eq!(conversation.id, "conv-9");
    assert_eq!(served.load(Ordering::SeqCst), 1);

    // A brand-new thread is necessarily empty; no fetch happens.
    let messages = client.list_messages("conv-9", 5, false).await.unwrap();
    assert!(messages.is_empty());
    assert_eq!(served.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn key_rotation_forces_identity_refetch() {
    let (base, served) = spawn_server(vec![(200, USER_A), (200, USER_B)]).await;
    let client = client_for(&base);

    let user = client.get_user().await.unwrap();
    assert_eq!(user.id, "user-a");
    let user = client.get_user().await.unwrap();
    assert_eq!(user.id, "user-a");
    assert_eq!(served.load(Ordering::SeqCst), 1);

    client.set_user_key("uk-rotated");
    let user = client.get_user().await.unwrap();
    assert_eq!(user.id, "user-b", "stale identity must never survive rotation");
    assert_eq!(served.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn closed_client_makes_no_requests() {
    let (base, served) = spawn_server(vec![(200, USER_A)]).await;
    let client = client_for(&base);

    client.close();
    assert!(client.get_user().await.unwrap_err().is_closed());
    assert!(client.create_conversation().await.unwrap_err().is_closed());
    assert_eq!(served.load(Ordering::SeqCst), 0);
}
