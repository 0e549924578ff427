//! End-to-end tests: HttpTransport + Controller against the local dev
//! endpoint over a real TCP socket.

use std::sync::{Arc, Mutex};

use stream_chat_widget::dev_server::{self, EchoResponder, Reply};
use stream_chat_widget::*;

fn config_for(addr: std::net::SocketAddr) -> WidgetConfig {
    WidgetConfig::new(format!("http://{addr}/chat")).expect("valid config")
}

async fn controller_for<R: dev_server::Responder>(responder: R) -> Controller<HttpTransport> {
    let (addr, _handle) = dev_server::spawn(responder).await.expect("spawn dev server");
    Controller::new(HttpTransport::new(&config_for(addr)))
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_echo_reply_reassembled_from_small_chunks() {
    let mut c = controller_for(EchoResponder { chunk_size: 3 }).await;
    let mut sink = RecordingSink::new();
    let outcome = c.submit("hello world", &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::Completed { events: 3 });
    assert_eq!(c.conversation().messages()[1].text, "You said: hello world");
    assert_eq!(c.state(), InteractionState::Idle);
    let stats = c.last_stats().expect("stats recorded");
    assert_eq!(stats.ignored, 1, "function_result record is skipped");
    assert_eq!(stats.malformed, 0);
}

#[tokio::test]
async fn test_multibyte_text_survives_one_byte_chunks() {
    let mut c = controller_for(EchoResponder { chunk_size: 1 }).await;
    let mut sink = RecordingSink::new();
    c.submit("héllo ☃ 🎉", &mut sink).await;

    let text = &c.conversation().messages()[1].text;
    assert_eq!(text, "You said: héllo ☃ 🎉");
    assert!(!text.contains('\u{FFFD}'));
}

#[tokio::test]
async fn test_two_record_reply() {
    let mut c = controller_for(|_: &str| {
        Reply::Chunks(vec![
            b"{\"content\":\"Hi\"}\n".to_vec(),
            b"{\"content\":\" there\"}\n".to_vec(),
        ])
    })
    .await;
    let mut sink = RecordingSink::new();
    let outcome = c.submit("hello", &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::Completed { events: 2 });
    assert_eq!(c.conversation().messages()[1].text, "Hi there");
    assert_eq!(sink.last_text(), Some("Hi there"));
    assert!(sink.input_enabled);
}

#[tokio::test]
async fn test_malformed_and_crlf_records() {
    let mut c = controller_for(|_: &str| {
        Reply::Chunks(vec![
            b"{\"content\":\"a\"}\r\nnot-js".to_vec(),
            b"on\r\n{\"content\":\"b\"}\r\n".to_vec(),
        ])
    })
    .await;
    let mut sink = RecordingSink::new();
    c.submit("x", &mut sink).await;
    assert_eq!(c.conversation().messages()[1].text, "ab");
    assert_eq!(c.last_stats().unwrap().malformed, 1);
}

#[tokio::test]
async fn test_unterminated_final_record_dropped() {
    let mut c = controller_for(|_: &str| {
        Reply::Chunks(vec![b"{\"content\":\"kept\"}\n{\"content\":\"lost\"}".to_vec()])
    })
    .await;
    let mut sink = RecordingSink::new();
    let outcome = c.submit("x", &mut sink).await;
    assert_eq!(outcome, SubmitOutcome::Completed { events: 1 });
    assert_eq!(c.conversation().messages()[1].text, "kept");
}

#[tokio::test]
async fn test_empty_200_body_streams_like_empty_chunked_body() {
    let mut plain = controller_for(|_: &str| Reply::Status(200)).await;
    let mut chunked = controller_for(|_: &str| Reply::Chunks(vec![])).await;
    let mut a = RecordingSink::new();
    let mut b = RecordingSink::new();

    let first = plain.submit("hello", &mut a).await;
    let second = chunked.submit("hello", &mut b).await;

    assert_eq!(first, SubmitOutcome::Completed { events: 0 });
    assert_eq!(first, second);
    assert_eq!(plain.conversation().messages()[1].text, "");
    assert_eq!(plain.conversation().messages(), chunked.conversation().messages());
    assert_eq!(a.calls, b.calls);
}

#[tokio::test]
async fn test_request_body_carries_message() {
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let record = Arc::clone(&seen);
    let mut c = controller_for(move |m: &str| {
        record.lock().unwrap().push(m.to_string());
        Reply::Chunks(vec![])
    })
    .await;
    let mut sink = RecordingSink::new();
    c.submit("  what \"quotes\" ☃  ", &mut sink).await;
    assert_eq!(seen.lock().unwrap().as_slice(), ["what \"quotes\" ☃"]);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_status_500_yields_apology() {
    let mut c = controller_for(|_: &str| Reply::Status(500)).await;
    let mut sink = RecordingSink::new();
    let outcome = c.submit("hello", &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::RequestFailed);
    assert_eq!(c.state(), InteractionState::Idle);
    assert!(sink.input_enabled);
    let msgs = c.conversation().messages();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[1].role, Role::Bot);
    assert_eq!(msgs[1].text, APOLOGY_TEXT);
}

#[tokio::test]
async fn test_status_204_yields_apology() {
    let mut c = controller_for(|_: &str| Reply::Status(204)).await;
    let mut sink = RecordingSink::new();
    let outcome = c.submit("hello", &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::RequestFailed);
    assert_eq!(c.conversation().messages()[1].text, APOLOGY_TEXT);
    assert!(sink.input_enabled);
}

#[tokio::test]
async fn test_widget_usable_after_failure() {
    let fail = Arc::new(Mutex::new(true));
    let flag = Arc::clone(&fail);
    let (addr, _h) = dev_server::spawn(move |_: &str| {
        if std::mem::replace(&mut *flag.lock().unwrap(), false) {
            Reply::Status(503)
        } else {
            Reply::Chunks(vec![b"{\"content\":\"back\"}\n".to_vec()])
        }
    })
    .await
    .unwrap();

    let mut w = Widget::http(config_for(addr), RecordingSink::new());
    let first = w.dispatch(WidgetEvent::Submit("one".into())).await;
    assert_eq!(first, EventResult::Submitted(SubmitOutcome::RequestFailed));
    let second = w.dispatch(WidgetEvent::Submit("two".into())).await;
    assert_eq!(second, EventResult::Submitted(SubmitOutcome::Completed { events: 1 }));

    let texts: Vec<&str> = w.conversation().messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["one", APOLOGY_TEXT, "two", "back"]);
    assert!(w.sink().input_enabled);
}

#[tokio::test]
async fn test_dev_server_rejects_get() {
    let (addr, _h) = dev_server::spawn(EchoResponder::default()).await.unwrap();
    let resp = reqwest::get(format!("http://{addr}/chat")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 405);
}

#[tokio::test]
async fn test_dev_server_rejects_bad_json() {
    let (addr, _h) = dev_server::spawn(EchoResponder::default()).await.unwrap();
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/chat"))
        .header("Content-Type", "application/json")
        .body("{\"msg\":1}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
