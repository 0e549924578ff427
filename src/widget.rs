//! The widget instance: configuration, controller, sink and panel state in
//! one owned value, driven by explicit events.

use tracing::debug;

use crate::config::WidgetConfig;
use crate::controller::{Controller, SubmitOutcome};
use crate::conversation::{Conversation, InteractionState};
use crate::render::RenderSink;
use crate::transport::{HttpTransport, Transport};

/// Open/closed flag of the chat panel. Independent of the interaction state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelVisibility {
    open: bool,
}

impl PanelVisibility {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }
}

/// Inputs the host forwards to the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// The launcher bubble was clicked.
    ToggleClicked,
    /// The input form was submitted with this text.
    Submit(String),
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventResult {
    PanelToggled { open: bool },
    Submitted(SubmitOutcome),
}

pub struct Widget<T, S> {
    config: WidgetConfig,
    controller: Controller<T>,
    sink: S,
    panel: PanelVisibility,
}

impl<S: RenderSink> Widget<HttpTransport, S> {
    /// Widget talking to `config.endpoint_url()` over HTTP.
    pub fn http(config: WidgetConfig, sink: S) -> Self {
        let transport = HttpTransport::new(&config);
        Self::new(config, transport, sink)
    }
}

impl<T: Transport, S: RenderSink> Widget<T, S> {
    pub fn new(config: WidgetConfig, transport: T, sink: S) -> Self {
        Self {
            config,
            controller: Controller::new(transport),
            sink,
            panel: PanelVisibility::default(),
        }
    }

    pub async fn dispatch(&mut self, event: WidgetEvent) -> EventResult {
        match event {
            WidgetEvent::ToggleClicked => {
                let open = self.panel.toggle();
                debug!(open, "panel toggled");
                self.sink.set_panel_open(open);
                EventResult::PanelToggled { open }
            }
            WidgetEvent::Submit(text) => {
                EventResult::Submitted(self.controller.submit(&text, &mut self.sink).await)
            }
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn conversation(&self) -> &Conversation {
        self.controller.conversation()
    }

    pub fn state(&self) -> InteractionState {
        self.controller.state()
    }

    pub fn panel(&self) -> PanelVisibility {
        self.panel
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn controller(&self) -> &Controller<T> {
        &self.controller
    }
}
