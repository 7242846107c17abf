use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::Stream;
use tracing::debug;

use crate::error::{Result, SseError};
use crate::event::Event;
use crate::parser::{EventQueue, StreamEventParser};

/// Adapts a stream of body chunks into a stream of decoded events
///
/// Every chunk is fed whole; the events it completes are yielded in order
/// before the next chunk is polled. A transport error ends the stream.
pub struct EventStream<S> {
    inner: S,
    parser: StreamEventParser<EventQueue>,
    stop_at_done: bool,
    finished: bool,
}

impl<S, E> EventStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: StreamEventParser::queued(),
            stop_at_done: false,
            finished: false,
        }
    }

    /// End the stream right after the `[DONE]` sentinel is yielded
    pub fn stop_at_done(mut self, stop: bool) -> Self {
        self.stop_at_done = stop;
        self
    }

    /// Number of payloads that failed to decode so far
    pub fn error_count(&self) -> usize {
        self.parser.handler().error_count()
    }
}

impl<S, E> Stream for EventStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Event>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            if let Some(event) = this.parser.handler_mut().pop() {
                if this.stop_at_done && event.is_done() {
                    this.finished = true;
                }
                return Poll::Ready(Some(Ok(event)));
            }

            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(chunk)) => this.parser.feed(&chunk),
                Some(Err(e)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(SseError::TransportError(e.to_string()))));
                }
                None => {
                    if this.parser.buffered_len() > 0 || this.parser.has_pending() {
                        debug!(
                            buffered = this.parser.buffered_len(),
                            "Stream ended inside an unterminated message"
                        );
                    }
                    this.finished = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::stream;
    use std::convert::Infallible;

    fn chunks(
        parts: &[&'static str],
    ) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_yields_events_across_chunks() {
        let parts = ["event: a\nda", "ta: 1\n\ndata: 2\n", "\n"];
        let events: Vec<_> = EventStream::new(chunks(&parts)).collect().await;

        assert_eq!(events.len(), 2);
        let first = events[0].as_ref().unwrap();
        assert_eq!(first.name, "a");
        assert_eq!(events[1].as_ref().unwrap().name, "message");
    }

    #[tokio::test]
    async fn test_stop_at_done() {
        let mut stream = EventStream::new(chunks(&["data: 1\n\ndata: [DONE]\n\ndata: 3\n\n"]))
            .stop_at_done(true);

        assert!(!stream.next().await.unwrap().unwrap().is_done());
        assert!(stream.next().await.unwrap().unwrap().is_done());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let inner = stream::iter(vec![
            Ok(Bytes::from_static(b"data: 1\n\n")),
            Err("connection reset"),
        ]);
        let mut stream = EventStream::new(inner);

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, SseError::TransportError(ref msg) if msg == "connection reset"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unterminated_message_is_dropped_at_end() {
        let events: Vec<_> = EventStream::new(chunks(&["data: 1\n\ndata: 2\n"])).collect().await;
        assert_eq!(events.len(), 1);
    }
}
