//! Rendering sinks: where the controller's transcript updates go.

use std::io::{self, Write};

use colored::*;

use crate::config::WidgetConfig;
use crate::conversation::{MessageHandle, Role};

/// Surface the controller drives while a conversation progresses.
///
/// Handles returned by [`append_message`](RenderSink::append_message) are
/// assigned by the sink and only meaningful to that sink.
pub trait RenderSink {
    fn append_message(&mut self, role: Role, text: &str) -> MessageHandle;

    /// Replace the displayed text of a message created by this sink.
    fn update_last_message(&mut self, handle: MessageHandle, text: &str);

    fn scroll_to_latest(&mut self);

    fn set_input_enabled(&mut self, enabled: bool);

    fn focus_input(&mut self);

    /// Show or hide the panel. Purely presentational.
    fn set_panel_open(&mut self, _open: bool) {}
}

// ---------------------------------------------------------------------------
// Recording sink
// ---------------------------------------------------------------------------

/// One call observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Append(Role, String),
    Update(MessageHandle, String),
    Scroll,
    InputEnabled(bool),
    Focus,
    PanelOpen(bool),
}

/// In-memory sink that keeps the rendered state and a log of every call.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
    pub rendered: Vec<(Role, String)>,
    pub input_enabled: bool,
    pub panel_open: bool,
    pub scroll_count: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            input_enabled: true,
            ..Self::default()
        }
    }

    pub fn last_text(&self) -> Option<&str> {
        self.rendered.last().map(|(_, t)| t.as_str())
    }
}

impl RenderSink for RecordingSink {
    fn append_message(&mut self, role: Role, text: &str) -> MessageHandle {
        self.calls.push(SinkCall::Append(role, text.to_string()));
        self.rendered.push((role, text.to_string()));
        MessageHandle(self.rendered.len() - 1)
    }

    fn update_last_message(&mut self, handle: MessageHandle, text: &str) {
        self.calls.push(SinkCall::Update(handle, text.to_string()));
        if let Some((_, t)) = self.rendered.get_mut(handle.0) {
            *t = text.to_string();
        }
    }

    fn scroll_to_latest(&mut self) {
        self.calls.push(SinkCall::Scroll);
        self.scroll_count += 1;
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.calls.push(SinkCall::InputEnabled(enabled));
        self.input_enabled = enabled;
    }

    fn focus_input(&mut self) {
        self.calls.push(SinkCall::Focus);
    }

    fn set_panel_open(&mut self, open: bool) {
        self.calls.push(SinkCall::PanelOpen(open));
        self.panel_open = open;
    }
}

// ---------------------------------------------------------------------------
// Terminal sink
// ---------------------------------------------------------------------------

/// Streams the transcript to a terminal, coloring user lines with the accent.
///
/// Terminals cannot rewrite earlier output, so only the newest message is
/// updated in place: growth is printed as a suffix, anything else reprints
/// the message on a fresh line.
pub struct TerminalSink<W: Write> {
    out: W,
    title: String,
    accent: (u8, u8, u8),
    latest: Option<MessageHandle>,
    printed: String,
    placeholder: bool,
    line_open: bool,
    next_handle: usize,
    input_enabled: bool,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(config: &WidgetConfig) -> Self {
        Self::new(io::stdout(), config)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, config: &WidgetConfig) -> Self {
        let a = config.accent();
        Self {
            out,
            title: config.title().to_string(),
            accent: (a.r, a.g, a.b),
            latest: None,
            printed: String::new(),
            placeholder: false,
            line_open: false,
            next_handle: 0,
            input_enabled: true,
        }
    }

    pub fn print_header(&mut self) {
        let (r, g, b) = self.accent;
        let _ = writeln!(self.out, "{}", self.title.on_truecolor(r, g, b).white().bold());
        let _ = writeln!(self.out, "{}", "=".repeat(50).truecolor(r, g, b));
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn end_line(&mut self) {
        if self.line_open {
            let _ = writeln!(self.out);
            self.line_open = false;
        }
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn append_message(&mut self, role: Role, text: &str) -> MessageHandle {
        self.end_line();
        let (r, g, b) = self.accent;
        match role {
            Role::User => {
                let _ = write!(self.out, "{:>50}", text.truecolor(r, g, b));
            }
            Role::Bot => {
                let _ = write!(self.out, "{}", text.normal());
            }
        }
        let _ = self.out.flush();

        let handle = MessageHandle(self.next_handle);
        self.next_handle += 1;
        self.latest = Some(handle);
        self.printed = text.to_string();
        self.placeholder = role == Role::Bot;
        self.line_open = true;
        handle
    }

    fn update_last_message(&mut self, handle: MessageHandle, text: &str) {
        if self.latest != Some(handle) {
            return;
        }
        if self.placeholder {
            // Erase the "..." placeholder line.
            let _ = write!(self.out, "\r\x1b[2K{}", text);
            self.placeholder = false;
        } else if let Some(suffix) = text.strip_prefix(self.printed.as_str()) {
            let _ = write!(self.out, "{}", suffix);
        } else {
            let _ = write!(self.out, "\n{}", text);
        }
        self.printed = text.to_string();
        let _ = self.out.flush();
    }

    fn scroll_to_latest(&mut self) {
        let _ = self.out.flush();
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        if self.input_enabled && !enabled {
            self.end_line();
        }
        self.input_enabled = enabled;
    }

    fn focus_input(&mut self) {
        self.end_line();
        let _ = write!(self.out, "{} ", ">".bold());
        let _ = self.out.flush();
    }

    fn set_panel_open(&mut self, open: bool) {
        let label = if open { "[panel open]" } else { "[panel closed]" };
        self.end_line();
        let _ = writeln!(self.out, "{}", label.dimmed());
        let _ = self.out.flush();
    }
}
