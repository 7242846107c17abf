//! # Responses SSE
//!
//! An incremental Server-Sent Events parser for streaming APIs whose `data:`
//! payloads carry JSON, such as the OpenAI Responses API.
//!
//! ## Overview
//!
//! Network chunks arrive at arbitrary boundaries, splitting lines, line
//! terminators or multi-byte characters. [`StreamEventParser`] buffers the
//! partial tail, accumulates `event:` and `data:` fields, and emits one
//! [`Event`] per blank-line boundary:
//!
//! - JSON data is decoded into [`Payload::Json`]
//! - `data: [DONE]` becomes the `done` event with [`Payload::Done`]
//! - Malformed data is forwarded as [`Payload::Raw`] after an optional error report
//!
//! ## Quick Start
//!
//! ```rust
//! use responses_sse::{Event, StreamEventParser};
//!
//! let mut events = Vec::new();
//! let mut parser = StreamEventParser::new(|event: Event| events.push(event));
//!
//! parser.feed("event: response.output_text.delta\nda");
//! parser.feed("ta: {\"delta\":\"Hel\"}\n\ndata: [DONE]\n\n");
//! drop(parser);
//!
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[0].name, "response.output_text.delta");
//! assert!(events[1].is_done());
//! ```
//!
//! ## Modules
//!
//! - [`parser`] - The incremental SSE parser and its handler seam
//! - [`event`] - Event and payload types
//! - [`stream`] - Async adapter from body chunks to events
//! - [`client`] - HTTP client for the Responses API
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod parser;
pub mod stream;

pub use client::ResponsesClient;
pub use config::ClientConfig;
pub use error::{Result, SseError};
pub use event::{Event, Payload};
pub use parser::{Callbacks, EventHandler, EventQueue, StreamEventParser};
pub use stream::EventStream;
