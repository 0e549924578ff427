pub mod cli;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod decoder;
pub mod dev_server;
pub mod error;
pub mod render;
pub mod transport;
pub mod widget;

pub use config::{ConfigLayer, WidgetConfig};
pub use controller::{Controller, SubmitOutcome, APOLOGY_TEXT, PLACEHOLDER_TEXT};
pub use conversation::{Conversation, InteractionState, Message, MessageHandle, Role};
pub use decoder::{DecodeStats, StreamDecoder, StreamEvent};
pub use error::{Result, WidgetError};
pub use render::{RecordingSink, RenderSink, SinkCall, TerminalSink};
pub use transport::{ByteStream, ChatRequest, HttpTransport, Transport};
pub use widget::{EventResult, PanelVisibility, Widget, WidgetEvent};
