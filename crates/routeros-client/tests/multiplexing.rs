//! Routing of responses between buffers, callers and the event loop.

mod common;

use std::time::Duration;

use common::{Scripted, tags};
use pretty_assertions::assert_eq;
use routeros_client::{
    ArgumentValue, Client, Error, Filter, Invocation, InvocationOutcome, Request, Response,
    ResponseType,
};
use routeros_transport_traits::Sentence;

fn request(command: &str, tag: &str) -> Request {
    Request::new(command).unwrap().with_tag(tag)
}

fn client() -> (Client<Scripted>, Scripted) {
    common::init_tracing();
    let com = Scripted::new();
    (Client::new(com.clone()), com)
}

#[tokio::test]
async fn test_untagged_sync_request() {
    let (mut client, com) = client();
    com.queue(&["!re", "=name=ether1"]);
    com.queue(&["!re", "=name=ether2"]);
    com.queue(&["!done"]);

    let responses = client
        .send_sync(&Request::new("/interface/print").unwrap())
        .await
        .unwrap();

    assert_eq!(responses.len(), 3);
    assert_eq!(responses.argument_values("name"), vec!["ether1", "ether2"]);
    assert_eq!(com.sent(), vec![vec!["/interface/print".to_string()]]);
    assert_eq!(client.pending_requests_count(), 0);
}

#[tokio::test]
async fn test_complete_tagged_request_in_order() {
    let (mut client, com) = client();
    client.send_async(&request("/ip/address/print", "a")).await.unwrap();
    assert_eq!(client.pending_requests_count(), 1);
    assert!(client.is_request_active("a", Filter::Buffer));

    com.queue(&["!re", "=address=10.0.0.1/24", ".tag=a"]);
    com.queue(&["!re", "=address=10.0.0.2/24", ".tag=a"]);
    com.queue(&["!done", ".tag=a"]);

    let responses = client.complete_request(Some("a")).await.unwrap();
    let types: Vec<_> = responses.iter().map(|r| r.response_type()).collect();
    assert_eq!(
        types,
        vec![ResponseType::Data, ResponseType::Data, ResponseType::Final]
    );
    assert_eq!(
        responses.argument_values("address"),
        vec!["10.0.0.1/24", "10.0.0.2/24"]
    );
    assert!(!client.is_request_active("a", Filter::All));
    assert_eq!(client.pending_requests_count(), 0);
    assert_eq!(
        com.sent(),
        vec![vec!["/ip/address/print".to_string(), ".tag=a".to_string()]]
    );
}

#[tokio::test]
async fn test_completion_buffers_other_tags() {
    let (mut client, com) = client();
    client.send_async(&request("/interface/print", "a")).await.unwrap();
    client.send_async(&request("/ip/route/print", "b")).await.unwrap();

    com.queue(&["!re", "=dst-address=0.0.0.0/0", ".tag=b"]);
    com.queue(&["!re", "=name=ether1", ".tag=a"]);
    com.queue(&["!done", ".tag=b"]);
    com.queue(&["!done", ".tag=a"]);

    let a = client.complete_request(Some("a")).await.unwrap();
    assert_eq!(tags(&a), vec!["a", "a"]);
    assert!(client.is_request_active("b", Filter::Buffer));

    let b = client.extract_new_responses(Some("b")).unwrap();
    assert_eq!(tags(&b), vec!["b", "b"]);
    assert!(!client.is_request_active("b", Filter::All));
}

#[tokio::test]
async fn test_complete_returns_previously_buffered_responses() {
    let (mut client, com) = client();
    client.send_async(&request("/log/print", "a")).await.unwrap();
    com.queue(&["!re", "=message=first", ".tag=a"]);
    com.queue(&["!re", "=message=second", ".tag=a"]);
    com.queue(&["!done", ".tag=a"]);

    client.dispatch_next_response(None).await.unwrap();
    let responses = client.complete_request(Some("a")).await.unwrap();
    assert_eq!(responses.argument_values("message"), vec!["first", "second"]);
    assert_eq!(responses.len(), 3);
}

#[tokio::test]
async fn test_async_tags_are_required_and_exclusive() {
    let (mut client, com) = client();
    let untagged = Request::new("/interface/print").unwrap();
    let err = client.send_async(&untagged).await.unwrap_err();
    assert!(matches!(err, Error::MissingTag));
    assert_eq!(err.code(), 10500);

    client.send_async(&request("/interface/print", "t")).await.unwrap();
    let err = client
        .send_async_with(&request("/ip/address/print", "t"), |_: &Response| false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateTag(ref t) if t == "t"));
    assert_eq!(err.code(), 10501);

    assert_eq!(com.sent().len(), 1);
    assert_eq!(client.pending_requests_count(), 1);
    assert!(client.is_request_active("t", Filter::Buffer));
    assert!(!client.is_request_active("t", Filter::Callback));
}

#[tokio::test]
async fn test_extract_from_callback_and_unknown_tags() {
    let (mut client, _com) = client();
    client
        .send_async_with(&request("/interface/listen", "cb"), |_: &Response| false)
        .await
        .unwrap();

    assert!(client.is_request_active("cb", Filter::Callback));
    assert!(!client.is_request_active("cb", Filter::Buffer));
    assert!(client.extract_new_responses(Some("cb")).unwrap().is_empty());

    let err = client.extract_new_responses(Some("nope")).unwrap_err();
    assert!(matches!(err, Error::NoSuchRequest(ref t) if t == "nope"));
    assert_eq!(err.code(), 10900);
}

#[tokio::test]
async fn test_extract_keeps_unfinished_buffers() {
    let (mut client, com) = client();
    client.send_async(&request("/interface/listen", "l")).await.unwrap();
    com.queue(&["!re", "=name=ether1", ".tag=l"]);
    client.dispatch_next_response(None).await.unwrap();

    assert_eq!(client.extract_new_responses(Some("l")).unwrap().len(), 1);
    assert!(client.is_request_active("l", Filter::Buffer));
    assert!(client.extract_new_responses(Some("l")).unwrap().is_empty());
}

#[tokio::test]
async fn test_extract_all_follows_registration_order() {
    let (mut client, com) = client();
    for tag in ["z", "m", "a"] {
        client.send_async(&request("/interface/print", tag)).await.unwrap();
    }
    com.queue(&["!done", ".tag=a"]);
    com.queue(&["!done", ".tag=m"]);
    com.queue(&["!done", ".tag=z"]);

    assert!(!client.run_loop(None).await.unwrap());
    let all = client.extract_new_responses(None).unwrap();
    assert_eq!(tags(&all), vec!["z", "m", "a"]);
    for tag in ["z", "m", "a"] {
        assert!(!client.is_request_active(tag, Filter::All));
    }
}

#[tokio::test]
async fn test_untagged_completion_collects_everything() {
    let (mut client, com) = client();
    client.send_async(&request("/interface/print", "a")).await.unwrap();
    client.send_async(&request("/ip/route/print", "b")).await.unwrap();
    com.queue(&["!re", ".tag=a"]);
    com.queue(&["!re", ".tag=b"]);
    com.queue(&["!done", ".tag=b"]);
    com.queue(&["!done", ".tag=a"]);

    let all = client.complete_request(None).await.unwrap();
    assert_eq!(tags(&all), vec!["a", "b", "b", "a"]);
    assert_eq!(client.pending_requests_count(), 0);

    // The responses were buffered on the way.
    assert_eq!(client.extract_new_responses(Some("a")).unwrap().len(), 2);

    assert!(client.complete_request(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_loop_with_nothing_pending_does_not_poll() {
    let (mut client, com) = client();
    assert!(!client.run_loop(Some(Duration::ZERO)).await.unwrap());
    assert!(!client.run_loop(None).await.unwrap());
    assert_eq!(com.polls(), 0);
}

#[tokio::test]
async fn test_run_loop_times_out_quietly() {
    let (mut client, com) = client();
    client.send_async(&request("/tool/torch", "t")).await.unwrap();
    com.queue(&["!re", "=rx=100", ".tag=t"]);

    let still_pending = client
        .run_loop(Some(Duration::from_millis(30)))
        .await
        .unwrap();
    assert!(still_pending);
    assert_eq!(client.pending_requests_count(), 1);
    assert_eq!(client.extract_new_responses(Some("t")).unwrap().len(), 1);
    assert!(com.polls() >= 2);
}

#[tokio::test]
async fn test_dispatch_timeout_is_distinguishable() {
    let (mut client, _com) = client();
    client.send_async(&request("/tool/torch", "t")).await.unwrap();

    let err = client
        .dispatch_next_response(Some(Duration::from_millis(10)))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.code(), 11800);
}

#[tokio::test]
async fn test_fatal_response_drops_pending_requests() {
    let (mut client, com) = client();
    client.send_async(&request("/interface/print", "a")).await.unwrap();
    client.send_async(&request("/ip/route/print", "b")).await.unwrap();
    com.queue(&["!re", ".tag=a"]);
    com.queue(&["!fatal", "not logged in"]);

    assert!(!client.run_loop(None).await.unwrap());
    assert_eq!(client.pending_requests_count(), 0);
    assert!(!client.is_request_active("a", Filter::All));
    assert!(!client.is_request_active("b", Filter::All));
    assert!(com.is_closed());
}

#[tokio::test]
async fn test_fatal_ends_tagged_completion() {
    let (mut client, com) = client();
    client.send_async(&request("/interface/print", "a")).await.unwrap();
    com.queue(&["!fatal", "session terminated on request"]);

    let responses = client.complete_request(Some("a")).await.unwrap();
    let last = responses.last().unwrap();
    assert_eq!(last.response_type(), ResponseType::Fatal);
    assert_eq!(
        last.unrecognized_words(),
        &[bytes::Bytes::from_static(b"session terminated on request")]
    );
    assert!(!client.is_request_active("a", Filter::All));
}

#[tokio::test]
async fn test_streaming_responses_keep_raw_bytes() {
    let (mut client, com) = client();
    assert!(!client.set_streaming_responses(true));
    assert!(client.is_streaming_responses());

    com.queue(&["!re", "=contents=line one"]);
    com.queue(&["!done"]);
    let responses = client
        .send_sync(&Request::new("/file/print").unwrap())
        .await
        .unwrap();
    assert!(matches!(
        responses[0].argument("contents"),
        Some(ArgumentValue::Stream(bytes)) if bytes.as_ref() == b"line one"
    ));

    assert!(client.set_streaming_responses(false));
}

#[tokio::test]
async fn test_responses_are_converted_to_the_local_charset() {
    common::init_tracing();
    let com = Scripted::new().with_charsets("utf-8", "windows-1251");
    let mut client = Client::new(com.clone());
    // "пароль" in windows-1251
    let mut word = b"=comment=".to_vec();
    word.extend_from_slice(&[0xEF, 0xE0, 0xF0, 0xEE, 0xEB, 0xFC]);
    com.queue_raw(Sentence::from_words([b"!re".to_vec(), word]));
    com.queue(&["!done"]);

    let responses = client
        .send_sync(
            &Request::new("/user/print")
                .unwrap()
                .with_argument("comment", "пароль")
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(responses.argument_values("comment"), vec!["пароль"]);

    let sent = com.sent_raw();
    assert_eq!(
        sent[0].words()[1].as_ref(),
        b"=comment=\xEF\xE0\xF0\xEE\xEB\xFC"
    );
}

#[tokio::test]
async fn test_invoke_facade() {
    let (mut client, com) = client();
    let outcome = client
        .invoke(request("/interface/print", "a"))
        .await
        .unwrap();
    assert_eq!(outcome, InvocationOutcome::Sent);

    com.queue(&["!done", ".tag=a"]);
    let outcome = client.invoke(Duration::from_millis(50)).await.unwrap();
    assert_eq!(outcome, InvocationOutcome::Pending(false));

    let outcome = client.invoke("a").await.unwrap();
    assert_eq!(outcome.into_responses().map(|r| r.len()), Some(1));

    com.queue(&["!re", "=name=router"]);
    com.queue(&["!done"]);
    let outcome = client
        .invoke(Request::new("/system/identity/print").unwrap())
        .await
        .unwrap();
    let responses = outcome.into_responses().unwrap();
    assert_eq!(responses.argument_values("name"), vec!["router"]);

    let outcome = client.invoke(Invocation::CompleteAll).await.unwrap();
    assert_eq!(outcome.into_responses().map(|r| r.len()), Some(0));
}
