//! Handlers and cancellation.

mod common;

use std::sync::Arc;

use common::{Scripted, tags};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use routeros_client::{Client, Error, Filter, Request, Response, ResponseType};

fn request(command: &str, tag: &str) -> Request {
    Request::new(command).unwrap().with_tag(tag)
}

fn client() -> (Client<Scripted>, Scripted) {
    common::init_tracing();
    let com = Scripted::new();
    (Client::new(com.clone()), com)
}

/// A handler that records what it sees and cancels after `limit` data responses.
fn recorder(limit: usize) -> (impl FnMut(&Response) -> bool + Send, Arc<Mutex<Vec<Response>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = Arc::clone(&seen);
    let handler = move |response: &Response| {
        let mut seen = handle.lock();
        seen.push(response.clone());
        let data = seen
            .iter()
            .filter(|r| r.response_type() == ResponseType::Data)
            .count();
        response.response_type() == ResponseType::Data && data >= limit
    };
    (handler, seen)
}

#[tokio::test]
async fn test_handler_sees_every_response_and_is_dropped_after_final() {
    let (mut client, com) = client();
    let (handler, seen) = recorder(usize::MAX);
    client
        .send_async_with(&request("/interface/print", "h"), handler)
        .await
        .unwrap();

    com.queue(&["!re", "=name=ether1", ".tag=h"]);
    com.queue(&["!re", "=name=ether2", ".tag=h"]);
    com.queue(&["!done", ".tag=h"]);

    assert!(!client.run_loop(None).await.unwrap());
    assert_eq!(tags(&seen.lock()), vec!["h", "h", "h"]);
    assert!(!client.is_request_active("h", Filter::All));
    assert!(matches!(
        client.extract_new_responses(Some("h")),
        Err(Error::NoSuchRequest(_))
    ));
}

#[tokio::test]
async fn test_handler_returning_true_cancels() {
    let (mut client, com) = client();
    let (handler, seen) = recorder(1);
    client
        .send_async_with(&request("/interface/listen", "h"), handler)
        .await
        .unwrap();

    com.queue(&["!re", "=name=ether1", ".tag=h"]);
    com.queue(&["!trap", "=category=2", "=message=interrupted", ".tag=h"]);
    com.queue(&["!done", ".tag=h"]);
    com.queue(&["!done"]);

    assert!(!client.run_loop(None).await.unwrap());

    let types: Vec<_> = seen.lock().iter().map(|r| r.response_type()).collect();
    assert_eq!(
        types,
        vec![ResponseType::Data, ResponseType::Error, ResponseType::Final]
    );
    assert_eq!(
        seen.lock()[1].argument("message").map(|m| m.to_string()),
        Some("interrupted".to_string())
    );
    assert!(!client.is_request_active("h", Filter::All));
    assert_eq!(
        com.sent(),
        vec![
            vec!["/interface/listen".to_string(), ".tag=h".to_string()],
            vec!["/cancel".to_string(), "=tag=h".to_string()],
        ]
    );
    assert_eq!(client.pending_requests_count(), 0);
}

#[tokio::test]
async fn test_handler_returning_true_on_final_does_not_cancel() {
    let (mut client, com) = client();
    client
        .send_async_with(&request("/system/identity/print", "h"), |_: &Response| true)
        .await
        .unwrap();
    com.queue(&["!done", ".tag=h"]);

    assert!(!client.run_loop(None).await.unwrap());
    assert_eq!(com.sent().len(), 1);
    assert!(!client.is_request_active("h", Filter::Callback));
}

#[tokio::test]
async fn test_cancel_discards_buffered_responses() {
    let (mut client, com) = client();
    client.send_async(&request("/tool/torch", "x")).await.unwrap();
    com.queue(&["!re", "=rx=1", ".tag=x"]);
    com.queue(&["!re", "=rx=2", ".tag=x"]);
    client.dispatch_next_response(None).await.unwrap();
    client.dispatch_next_response(None).await.unwrap();

    com.queue(&["!trap", "=category=2", "=message=interrupted", ".tag=x"]);
    com.queue(&["!done", ".tag=x"]);
    com.queue(&["!done"]);
    client.cancel_request(Some("x")).await.unwrap();

    assert!(!client.is_request_active("x", Filter::All));
    assert!(matches!(
        client.extract_new_responses(Some("x")),
        Err(Error::NoSuchRequest(_))
    ));
    assert_eq!(client.pending_requests_count(), 0);
    assert_eq!(com.remaining(), 0);
}

#[tokio::test]
async fn test_cancel_unknown_tag() {
    let (mut client, com) = client();
    let err = client.cancel_request(Some("ghost")).await.unwrap_err();
    assert!(matches!(err, Error::CancelUnknown(ref t) if t == "ghost"));
    assert_eq!(err.code(), 11200);
    assert!(com.sent().is_empty());
}

#[tokio::test]
async fn test_cancel_everything() {
    let (mut client, com) = client();
    client.send_async(&request("/interface/listen", "a")).await.unwrap();
    let (handler, seen) = recorder(usize::MAX);
    client
        .send_async_with(&request("/ip/address/listen", "b"), handler)
        .await
        .unwrap();

    com.queue(&["!re", ".tag=a"]);
    com.queue(&["!trap", "=message=interrupted", ".tag=a"]);
    com.queue(&["!done", ".tag=a"]);
    com.queue(&["!trap", "=message=interrupted", ".tag=b"]);
    com.queue(&["!done", ".tag=b"]);
    com.queue(&["!done"]);

    client.cancel_request(None).await.unwrap();

    assert_eq!(
        com.sent().last().cloned(),
        Some(vec!["/cancel".to_string()])
    );
    assert_eq!(client.pending_requests_count(), 0);
    assert!(!client.is_request_active("a", Filter::All));
    assert!(!client.is_request_active("b", Filter::All));
    assert_eq!(seen.lock().len(), 2);
    assert!(client.extract_new_responses(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_release_closes_non_persistent_sessions() {
    let (client, com) = client();
    com.queue(&["!fatal", "session terminated on request"]);
    client.release().await.unwrap();

    assert_eq!(com.sent(), vec![vec!["/quit".to_string()]]);
    assert!(com.is_closed());
}

#[tokio::test]
async fn test_close_keeps_finished_buffers() {
    let (mut client, com) = client();
    client.send_async(&request("/interface/print", "a")).await.unwrap();
    client.send_async(&request("/interface/listen", "b")).await.unwrap();
    com.queue(&["!re", ".tag=a"]);
    com.queue(&["!done", ".tag=a"]);
    com.queue(&["!fatal", "session terminated on request"]);

    assert!(client.close().await.unwrap());
    assert_eq!(client.pending_requests_count(), 0);
    assert!(!client.is_request_active("b", Filter::All));
    assert_eq!(client.extract_new_responses(Some("a")).unwrap().len(), 2);
    assert!(com.is_closed());

    // A second close finds the connection gone.
    assert!(client.close().await.unwrap());
}
