//! Aggregate application state for an interactive session.

use std::time::Instant;

use tui_textarea::TextArea;

use crate::core::exchange::ExchangeController;
use crate::core::log::ConversationLog;
use crate::core::session::{SessionContext, SessionSettings};

/// Interaction state owned by the terminal layer: the input widget, scroll
/// position, and the streaming affordance flags.
pub struct UiState {
    textarea: TextArea<'static>,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub is_streaming: bool,
    /// Phase anchor for the streaming pulse indicator.
    pub pulse_start: Instant,
    /// Transient one-line notice shown in the input title.
    pub status: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            textarea: TextArea::default(),
            scroll_offset: 0,
            auto_scroll: true,
            is_streaming: false,
            pulse_start: Instant::now(),
            status: None,
        }
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    /// The renderer installs the frame's block and styles through this.
    pub fn textarea_mut(&mut self) -> &mut TextArea<'static> {
        &mut self.textarea
    }

    /// Routes a terminal event into the input widget; returns true when the
    /// widget modified its content.
    pub fn input_event(&mut self, input: impl Into<tui_textarea::Input>) -> bool {
        self.textarea.input(input)
    }

    pub fn insert_input(&mut self, text: &str) {
        self.textarea.insert_str(text);
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// Returns the composed input and clears the widget.
    pub fn take_input(&mut self) -> String {
        let text = self.input_text();
        self.textarea = TextArea::default();
        text
    }

    pub fn begin_streaming(&mut self) {
        self.is_streaming = true;
        self.pulse_start = Instant::now();
    }

    /// Clears the streaming affordance and any notice set while it ran.
    pub fn end_streaming(&mut self) {
        self.is_streaming = false;
        self.status = None;
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}

pub struct App {
    pub session: SessionContext,
    pub ui: UiState,
    pub log: ConversationLog,
}

impl App {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            session: SessionContext::new(settings),
            ui: UiState::new(),
            log: ConversationLog::new(),
        }
    }

    /// Borrow-scoped controller over the session, UI flags, and the log.
    pub fn exchange(&mut self) -> ExchangeController<'_> {
        ExchangeController::new(&mut self.session, &mut self.ui, &mut self.log)
    }

    /// The in-flight signal exposed to presentation code: true from submit
    /// until the terminal event for that exchange is applied.
    pub fn stream_in_flight(&self) -> bool {
        self.session.exchange_in_flight()
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::test_utils::create_test_app;

    #[test]
    fn take_input_clears_the_widget() {
        let mut app = create_test_app();
        app.ui.insert_input("hello there");
        assert_eq!(app.ui.take_input(), "hello there");
        assert_eq!(app.ui.input_text(), "");
    }

    #[test]
    fn fresh_app_is_idle() {
        let app = create_test_app();
        assert!(!app.stream_in_flight());
        assert!(!app.ui.is_streaming);
        assert!(app.log.is_empty());
    }
}
