//! Local chat endpoint for development and tests.
//!
//! Accepts `POST` requests carrying `{"message": ...}` and answers with a
//! chunked `application/json` body of newline-delimited records, the same
//! shapes a production backend emits: `{"content": ...}` for text and
//! `{"function_result": ...}` for tool output.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, Weekday};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, WidgetError};
use crate::transport::ChatRequest;

const MAX_HEAD: usize = 16 * 1024;
const MAX_BODY: usize = 64 * 1024;

/// What the server sends back for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 200 with these body chunks, each written as its own HTTP chunk.
    Chunks(Vec<Vec<u8>>),
    /// Bare status with an empty body.
    Status(u16),
}

impl Reply {
    /// Serialize `records` as JSON Lines and cut the body every `chunk_size`
    /// bytes, ignoring record and character boundaries.
    pub fn json_lines(records: &[serde_json::Value], chunk_size: usize) -> Reply {
        let mut body = Vec::new();
        for r in records {
            body.extend_from_slice(r.to_string().as_bytes());
            body.push(b'\n');
        }
        let size = chunk_size.max(1);
        Reply::Chunks(body.chunks(size).map(|c| c.to_vec()).collect())
    }
}

pub trait Responder: Send + Sync + 'static {
    fn respond(&self, message: &str) -> Reply;
}

impl<F> Responder for F
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    fn respond(&self, message: &str) -> Reply {
        self(message)
    }
}

/// Streams the message back word by word, then a `function_result` record
/// describing a booked two-hour slot.
#[derive(Debug, Clone)]
pub struct EchoResponder {
    pub chunk_size: usize,
}

impl Default for EchoResponder {
    fn default() -> Self {
        Self { chunk_size: 7 }
    }
}

impl Responder for EchoResponder {
    fn respond(&self, message: &str) -> Reply {
        let mut records = vec![serde_json::json!({ "content": "You said:" })];
        for word in message.split_whitespace() {
            records.push(serde_json::json!({ "content": format!(" {word}") }));
        }
        records.push(serde_json::json!({
            "function_result": booked_slot(Local::now().date_naive(), 7)
        }));
        Reply::json_lines(&records, self.chunk_size)
    }
}

/// Booking confirmation for the first working day after `today` (no Sundays).
fn booked_slot(today: NaiveDate, hour: u32) -> serde_json::Value {
    let mut date = today.succ_opt().unwrap_or(today);
    if date.weekday() == Weekday::Sun {
        date = date.succ_opt().unwrap_or(date);
    }
    let id = uuid::Uuid::new_v4().simple().to_string();
    serde_json::json!({
        "job_id": format!("DT-{}", id[..8].to_uppercase()),
        "date": date.format("%Y-%m-%d").to_string(),
        "start": format!("{hour:02}:00"),
        "end": format!("{:02}:00", hour + 2),
    })
}

/// Accept connections forever, answering each with `responder`.
pub async fn serve<R: Responder>(listener: TcpListener, responder: Arc<R>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "dev chat endpoint listening");
    }
    loop {
        let (stream, addr) = listener.accept().await?;
        let responder = Arc::clone(&responder);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, responder.as_ref()).await {
                warn!(%addr, error = %e, "connection error");
            }
        });
    }
}

/// Bind an ephemeral localhost port and serve in the background.
pub async fn spawn<R: Responder>(responder: R) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(serve(listener, Arc::new(responder)));
    Ok((addr, handle))
}

struct RequestHead {
    method: String,
    path: String,
    content_length: usize,
    head_len: usize,
}

fn invalid(detail: impl Into<String>) -> WidgetError {
    WidgetError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        detail.into(),
    ))
}

fn parse_head(buf: &[u8]) -> Result<Option<RequestHead>> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    let status = req.parse(buf).map_err(|e| invalid(e.to_string()))?;
    let httparse::Status::Complete(head_len) = status else {
        return Ok(None);
    };

    let mut content_length = 0;
    for h in req.headers.iter() {
        if h.name.eq_ignore_ascii_case("content-length") {
            content_length = std::str::from_utf8(h.value)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| invalid("bad Content-Length"))?;
        }
    }

    Ok(Some(RequestHead {
        method: req.method.unwrap_or("").to_string(),
        path: req.path.unwrap_or("/").to_string(),
        content_length,
        head_len,
    }))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        205 => "Reset Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn write_status(stream: &mut TcpStream, status: u16) -> Result<()> {
    // 204 must not carry a Content-Length.
    let length = if status == 204 { "" } else { "Content-Length: 0\r\n" };
    let response = format!(
        "HTTP/1.1 {} {}\r\n{}Connection: close\r\n\r\n",
        status,
        reason(status),
        length
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn handle_connection<R: Responder + ?Sized>(mut stream: TcpStream, responder: &R) -> Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let mut tmp = [0u8; 4096];

    let head = loop {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(head) = parse_head(&buf)? {
            break head;
        }
        if buf.len() > MAX_HEAD {
            return write_status(&mut stream, 413).await;
        }
    };
    debug!(method = %head.method, path = %head.path, len = head.content_length, "request");

    if head.method != "POST" {
        return write_status(&mut stream, 405).await;
    }
    if head.content_length > MAX_BODY {
        return write_status(&mut stream, 413).await;
    }

    let mut body = buf.split_off(head.head_len);
    while body.len() < head.content_length {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }
    body.truncate(head.content_length);

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "rejecting request body");
            return write_status(&mut stream, 400).await;
        }
    };

    match responder.respond(&request.message) {
        Reply::Status(status) => write_status(&mut stream, status).await,
        Reply::Chunks(chunks) => {
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                      Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                )
                .await?;
            for chunk in chunks.iter().filter(|c| !c.is_empty()) {
                stream
                    .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                    .await?;
                stream.write_all(chunk).await?;
                stream.write_all(b"\r\n").await?;
                stream.flush().await?;
            }
            stream.write_all(b"0\r\n\r\n").await?;
            stream.shutdown().await?;
            Ok(())
        }
    }
}
