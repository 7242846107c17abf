use std::collections::VecDeque;

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::SseError;
use crate::event::{DEFAULT_EVENT, DONE_SENTINEL, Event, Payload};

const EVENT_FIELD: &[u8] = b"event:";
const DATA_FIELD: &[u8] = b"data:";

const INITIAL_CAPACITY: usize = 8192;
const MAX_RETAINED_CAPACITY: usize = 65536;

/// Whitespace stripped around field values; narrower than `char::is_whitespace`
fn is_sse_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B')
}

/// Receiver of parsed events
///
/// `on_event` is called once per completed message, in order. `on_error` is
/// called with a diagnostic right before the degraded event for a payload
/// that failed to decode; the default implementation ignores it.
///
/// Any `FnMut(Event)` closure is a handler that ignores diagnostics.
pub trait EventHandler {
    fn on_event(&mut self, event: Event);

    fn on_error(&mut self, _error: &SseError) {}
}

impl<F> EventHandler for F
where
    F: FnMut(Event),
{
    fn on_event(&mut self, event: Event) {
        self(event)
    }
}

/// An event callback paired with an optional error callback
pub struct Callbacks<F, E> {
    on_event: F,
    on_error: Option<E>,
}

impl<F, E> Callbacks<F, E>
where
    F: FnMut(Event),
    E: FnMut(&SseError),
{
    pub fn new(on_event: F, on_error: Option<E>) -> Self {
        Self { on_event, on_error }
    }
}

impl<F> Callbacks<F, fn(&SseError)>
where
    F: FnMut(Event),
{
    /// Callbacks without an error reporter; malformed payloads are only logged
    pub fn events_only(on_event: F) -> Self {
        Self {
            on_event,
            on_error: None,
        }
    }
}

impl<F, E> EventHandler for Callbacks<F, E>
where
    F: FnMut(Event),
    E: FnMut(&SseError),
{
    fn on_event(&mut self, event: Event) {
        (self.on_event)(event)
    }

    fn on_error(&mut self, error: &SseError) {
        if let Some(on_error) = &mut self.on_error {
            on_error(error)
        }
    }
}

/// Handler that queues events for a consumer to pull later
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    errors: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of malformed payloads seen so far
    pub fn error_count(&self) -> usize {
        self.errors
    }
}

impl EventHandler for EventQueue {
    fn on_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    fn on_error(&mut self, error: &SseError) {
        self.errors += 1;
        tracing::warn!("{}", error);
    }
}

/// Fields accumulated for the message currently being read
#[derive(Debug, Default)]
struct PendingMessage {
    event_name: Option<String>,
    data: String,
}

impl PendingMessage {
    fn is_empty(&self) -> bool {
        self.event_name.is_none() && self.data.is_empty()
    }

    fn push_data(&mut self, fragment: &str) {
        if !self.data.is_empty() {
            self.data.push('\n');
        }
        self.data.push_str(fragment);
    }
}

/// Incremental parser for `event:`/`data:` framed SSE streams carrying JSON
///
/// Chunks may be split anywhere, including inside a line terminator or a
/// multi-byte UTF-8 sequence. Lines are only interpreted once complete.
pub struct StreamEventParser<H> {
    handler: H,
    buffer: BytesMut,
    pending: PendingMessage,
    /// Bytes at the front of `buffer` already known to contain no terminator
    scanned: usize,
    /// Last line ended with `\r`; a following `\n` belongs to it
    skip_lf: bool,
}

impl<H: EventHandler> StreamEventParser<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            pending: PendingMessage::default(),
            scanned: 0,
            skip_lf: false,
        }
    }

    /// Feed the next chunk of the response body, emitting every message it completes
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) {
        self.buffer.extend_from_slice(chunk.as_ref());

        loop {
            if self.skip_lf && !self.buffer.is_empty() {
                if self.buffer[0] == b'\n' {
                    self.buffer.advance(1);
                }
                self.skip_lf = false;
            }

            let Some(offset) = self.buffer[self.scanned..]
                .iter()
                .position(|&b| b == b'\n' || b == b'\r')
            else {
                self.scanned = self.buffer.len();
                break;
            };

            let line = self.buffer.split_to(self.scanned + offset);
            self.skip_lf = self.buffer[0] == b'\r';
            self.buffer.advance(1);
            self.scanned = 0;

            self.process_line(&line);
        }
    }

    fn process_line(&mut self, line: &[u8]) {
        if line.is_empty() {
            self.flush();
        } else if let Some(value) = line.strip_prefix(EVENT_FIELD) {
            let name = String::from_utf8_lossy(value);
            self.pending.event_name = Some(name.trim_matches(is_sse_whitespace).to_string());
        } else if let Some(value) = line.strip_prefix(DATA_FIELD) {
            let data = String::from_utf8_lossy(value);
            self.pending.push_data(data.trim_start_matches(is_sse_whitespace));
        }
        // id:, retry:, comments and unknown fields carry nothing we need
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        // Clear state before any callback runs
        let PendingMessage { event_name, data } = std::mem::take(&mut self.pending);

        if data.is_empty() {
            debug!(event = ?event_name, "Dropping SSE message without data");
            return;
        }

        let name = event_name.unwrap_or_else(|| DEFAULT_EVENT.to_string());

        if data.trim_matches(is_sse_whitespace) == DONE_SENTINEL {
            self.emit(Event::done());
            return;
        }

        // serde_json's default nesting limit (128) applies; deeper payloads come out raw
        let event = match serde_json::from_str::<Value>(&data) {
            Ok(value) => Event::new(name, Payload::Json(value)),
            Err(e) => {
                debug!(event = %name, error = %e, "Forwarding malformed SSE data as raw text");
                self.handler.on_error(&SseError::MalformedJson(e));
                Event::new(name, Payload::Raw(data))
            }
        };
        self.emit(event);
    }

    fn emit(&mut self, event: Event) {
        trace!(event = %event.name, "Emitting SSE event");
        self.handler.on_event(event);
    }

    /// Bytes held for an incomplete trailing line
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether fields have been read for a message that has not ended yet
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Discard any partial line and pending message (useful for connection reuse)
    pub fn reset(&mut self) {
        self.buffer.clear();
        if self.buffer.capacity() > MAX_RETAINED_CAPACITY {
            self.buffer = BytesMut::with_capacity(INITIAL_CAPACITY);
        }
        self.pending = PendingMessage::default();
        self.scanned = 0;
        self.skip_lf = false;
    }
}

impl<F, E> StreamEventParser<Callbacks<F, E>>
where
    F: FnMut(Event),
    E: FnMut(&SseError),
{
    /// Build a parser that also reports malformed payloads to `on_error`
    pub fn with_error_handler(on_event: F, on_error: E) -> Self {
        Self::new(Callbacks::new(on_event, Some(on_error)))
    }
}

impl StreamEventParser<EventQueue> {
    /// Build a parser that queues events instead of calling back
    pub fn queued() -> Self {
        Self::new(EventQueue::new())
    }
}

impl Default for StreamEventParser<EventQueue> {
    fn default() -> Self {
        Self::queued()
    }
}
