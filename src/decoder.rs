//! Incremental decoding of a JSON-Lines response body into [`StreamEvent`]s.
//!
//! The body arrives as arbitrary byte chunks. Two pieces of state survive
//! between chunks:
//!
//! 1. [`Utf8StreamDecoder`] keeps the tail of a multi-byte character that was
//!    cut by a chunk boundary and completes it with the next chunk.
//! 2. [`RecordSplitter`] keeps the unterminated end of the last record and
//!    prepends it to the next chunk's text before splitting on `\n`.
//!
//! Together they make the emitted events independent of how the transport
//! happened to slice the body.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, trace};

use crate::error::Result;

const REPLACEMENT: char = '\u{FFFD}';

// ---------------------------------------------------------------------------
// UTF-8
// ---------------------------------------------------------------------------

/// Streaming UTF-8 decoder.
///
/// Invalid sequences decode to U+FFFD; an incomplete sequence at the end of a
/// chunk is held back (at most 3 bytes) until more input arrives.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, appending complete characters to `out`.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        let joined: Vec<u8>;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(s) => {
                    out.push_str(s);
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&input[..valid]) {
                        out.push_str(s);
                    }
                    match e.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            input = &input[valid + bad..];
                        }
                        None => {
                            self.pending.extend_from_slice(&input[valid..]);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush at end of input. A dangling partial character becomes U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(REPLACEMENT);
        }
    }

    /// Bytes currently held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Record splitting
// ---------------------------------------------------------------------------

/// Re-segments decoded text into newline-terminated records.
#[derive(Debug, Default)]
pub struct RecordSplitter {
    carry: String,
}

impl RecordSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and return every record it completed, in order.
    ///
    /// A trailing `\r` is stripped so CRLF bodies split the same way.
    /// Blank and whitespace-only records are skipped.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.carry.push_str(text);
        let mut records = Vec::new();
        while let Some(line_end) = self.carry.find('\n') {
            let mut line: String = self.carry.drain(..=line_end).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            if !line.trim().is_empty() {
                records.push(line);
            }
        }
        records
    }

    /// Take whatever unterminated text is left.
    pub fn take_remainder(&mut self) -> String {
        std::mem::take(&mut self.carry)
    }

    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

/// Classification of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A non-empty `content` string.
    Content(String),
    /// Valid JSON object with nothing to display (e.g. `function_result`).
    Ignored,
    /// Not JSON, not an object, or `content` of the wrong type.
    Malformed(String),
}

pub fn parse_record(line: &str) -> Record {
    let value: serde_json::Value = match serde_json::from_str(line.trim()) {
        Ok(v) => v,
        Err(e) => return Record::Malformed(e.to_string()),
    };
    let Some(obj) = value.as_object() else {
        return Record::Malformed("record is not a JSON object".into());
    };
    match obj.get("content") {
        None | Some(serde_json::Value::Null) => Record::Ignored,
        Some(serde_json::Value::String(s)) if s.is_empty() => Record::Ignored,
        Some(serde_json::Value::String(s)) => Record::Content(s.clone()),
        Some(other) => Record::Malformed(format!("content is not a string: {other}")),
    }
}

// ---------------------------------------------------------------------------
// Stream decoder
// ---------------------------------------------------------------------------

/// One increment of bot content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub content: String,
}

/// Counters for one decoded response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub bytes: usize,
    pub records: usize,
    pub events: usize,
    pub ignored: usize,
    pub malformed: usize,
    /// Length in bytes of an unterminated fragment dropped at end of stream.
    pub discarded_tail: usize,
}

/// Lazily turns a byte stream into [`StreamEvent`]s.
///
/// Single use: once it yields `None` or an error it stays exhausted.
pub struct StreamDecoder<S> {
    source: S,
    utf8: Utf8StreamDecoder,
    splitter: RecordSplitter,
    ready: VecDeque<StreamEvent>,
    stats: DecodeStats,
    done: bool,
}

impl<S> StreamDecoder<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            utf8: Utf8StreamDecoder::new(),
            splitter: RecordSplitter::new(),
            ready: VecDeque::new(),
            stats: DecodeStats::default(),
            done: false,
        }
    }

    /// Next event, `None` at end of stream, or the read error that ended it.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent>> {
        loop {
            if let Some(ev) = self.ready.pop_front() {
                return Some(Ok(ev));
            }
            if self.done {
                return None;
            }
            match self.source.next().await {
                Some(Ok(chunk)) => self.ingest(&chunk),
                Some(Err(e)) => {
                    self.done = true;
                    debug!(error = %e, bytes = self.stats.bytes, "response stream failed");
                    return Some(Err(e));
                }
                None => self.finish(),
            }
        }
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn is_done(&self) -> bool {
        self.done && self.ready.is_empty()
    }

    /// Adapt into a `Stream`, dropping access to [`DecodeStats`].
    pub fn into_stream(self) -> impl Stream<Item = Result<StreamEvent>> {
        futures_util::stream::unfold(self, |mut decoder| async move {
            decoder.next_event().await.map(|ev| (ev, decoder))
        })
    }

    fn ingest(&mut self, chunk: &[u8]) {
        self.stats.bytes += chunk.len();
        let mut text = String::with_capacity(chunk.len());
        self.utf8.decode(chunk, &mut text);
        for record in self.splitter.push(&text) {
            self.accept(&record);
        }
    }

    fn finish(&mut self) {
        let mut text = String::new();
        self.utf8.finish(&mut text);
        for record in self.splitter.push(&text) {
            self.accept(&record);
        }
        let tail = self.splitter.take_remainder();
        if !tail.trim().is_empty() {
            self.stats.discarded_tail = tail.len();
            debug!(len = tail.len(), "discarding unterminated trailing record");
        }
        self.done = true;
        debug!(
            bytes = self.stats.bytes,
            records = self.stats.records,
            events = self.stats.events,
            malformed = self.stats.malformed,
            "response stream ended"
        );
    }

    fn accept(&mut self, record: &str) {
        self.stats.records += 1;
        match parse_record(record) {
            Record::Content(content) => {
                self.stats.events += 1;
                self.ready.push_back(StreamEvent { content });
            }
            Record::Ignored => {
                self.stats.ignored += 1;
                trace!(record, "record without content");
            }
            Record::Malformed(reason) => {
                self.stats.malformed += 1;
                debug!(%reason, "dropping malformed record");
            }
        }
    }
}
