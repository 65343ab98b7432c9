//! The exchange controller: one request/response cycle per user submission.
//!
//! All mutation of the conversation log funnels through this controller. The
//! chat loop (or the headless `say` runner) calls [`ExchangeController::submit`]
//! to open an exchange and then feeds transport events back in arrival order
//! through [`ExchangeController::apply_event`], which is the only place a
//! cancellation signal is turned into an `Aborted` turn. Callers never see
//! errors from these operations; outcomes surface as turn statuses.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::PromptRequest;
use crate::core::app::UiState;
use crate::core::log::{ConversationLog, Turn, TurnStatus};
use crate::core::session::SessionContext;
use crate::core::transport::{ExchangeEvent, TransportParams};

pub struct ExchangeController<'a> {
    session: &'a mut SessionContext,
    ui: &'a mut UiState,
    log: &'a mut ConversationLog,
}

impl<'a> ExchangeController<'a> {
    pub fn new(
        session: &'a mut SessionContext,
        ui: &'a mut UiState,
        log: &'a mut ConversationLog,
    ) -> Self {
        Self { session, ui, log }
    }

    /// Opens an exchange for `user_text`.
    ///
    /// Appends a committed user turn and a pending assistant placeholder,
    /// stores a fresh cancellation token, and returns the transport
    /// parameters for the caller to spawn. Blank input and submission while
    /// an exchange is in flight are no-ops returning `None`; the UI disables
    /// submission while streaming, but the controller does not rely on that.
    pub fn submit(&mut self, user_text: &str) -> Option<TransportParams> {
        let trimmed = user_text.trim();
        if trimmed.is_empty() {
            debug!("ignoring blank submission");
            return None;
        }
        if self.session.exchange_in_flight() || self.log.has_open_turn() {
            debug!("ignoring submission while an exchange is in flight");
            return None;
        }

        self.ui.clear_status();

        if let Err(err) = self.log.append(Turn::user(trimmed)) {
            debug!(%err, "user turn rejected");
            return None;
        }
        if let Err(err) = self.log.append(Turn::assistant_placeholder()) {
            debug!(%err, "assistant placeholder rejected");
            return None;
        }

        let (cancel_token, exchange_id) = self.begin_exchange();
        Some(TransportParams {
            client: self.session.client.clone(),
            endpoint: self.session.endpoint.clone(),
            api_key: self.session.api_key.clone(),
            payload: PromptRequest::new(
                self.session.developer_message.clone(),
                trimmed,
                self.session.model.clone(),
            ),
            cancel_token,
            exchange_id,
        })
    }

    /// Requests early termination of the exchange in flight.
    ///
    /// Signal-only: the log is not touched here. The aborted transition
    /// happens where the signal is observed (the transport's select! branch
    /// or the fragment guard in [`Self::apply_event`]), so a fragment can
    /// never be appended after the abort lands. Idempotent, and a no-op with
    /// nothing in flight.
    pub fn cancel(&mut self) {
        if let Some(token) = &self.session.cancel_token {
            debug!(
                exchange_id = self.session.current_exchange_id,
                "cancellation requested"
            );
            token.cancel();
        }
    }

    /// Cancels any exchange in flight and empties the log. Late events from
    /// the cancelled exchange are dropped by the staleness guard.
    pub fn reset_conversation(&mut self) {
        self.cancel();
        self.session.cancel_token = None;
        self.ui.end_streaming();
        self.log.clear();
    }

    /// Applies one transport event. Events are delivered in arrival order by
    /// the chat loop; anything from a finished or superseded exchange is
    /// dropped here.
    pub fn apply_event(&mut self, event: ExchangeEvent, exchange_id: u64) {
        if !self.is_current_exchange(exchange_id) {
            debug!(exchange_id, "dropping event from a stale exchange");
            return;
        }

        match event {
            ExchangeEvent::Fragment(text) => self.apply_fragment(&text),
            ExchangeEvent::Interrupted => self.finish_exchange(TurnStatus::Aborted),
            ExchangeEvent::Closed => self.finish_exchange(TurnStatus::Committed),
            ExchangeEvent::Failed(message) => {
                debug!(exchange_id, message, "stream failed");
                self.finish_errored(&message);
            }
        }
    }

    fn is_current_exchange(&self, exchange_id: u64) -> bool {
        self.session.exchange_in_flight() && self.session.current_exchange_id == exchange_id
    }

    fn begin_exchange(&mut self) -> (CancellationToken, u64) {
        self.session.current_exchange_id += 1;
        let token = CancellationToken::new();
        self.session.cancel_token = Some(token.clone());
        self.ui.begin_streaming();
        (token, self.session.current_exchange_id)
    }

    fn apply_fragment(&mut self, text: &str) {
        // The signal is observed here, not in cancel(): a fragment that was
        // already queued when the user cancelled is dropped, never appended.
        if self
            .session
            .cancel_token
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
        {
            self.finish_exchange(TurnStatus::Aborted);
            return;
        }

        if text.is_empty() {
            return;
        }

        let _ = self.log.mutate_last(|turn| {
            turn.content.push_str(text);
            turn.status = TurnStatus::Streaming;
        });
    }

    fn finish_exchange(&mut self, status: TurnStatus) {
        debug!(
            exchange_id = self.session.current_exchange_id,
            status = status.as_str(),
            "exchange finished"
        );
        if self.log.last().is_some_and(|turn| !turn.is_terminal()) {
            let _ = self.log.mutate_last(|turn| turn.status = status);
        }
        self.session.cancel_token = None;
        self.ui.end_streaming();
    }

    /// Error policy: partial output is preserved and the description is
    /// appended after a blank line, so turn content stays append-only.
    fn finish_errored(&mut self, message: &str) {
        if self.log.last().is_some_and(|turn| !turn.is_terminal()) {
            let _ = self.log.mutate_last(|turn| {
                if !turn.content.is_empty() {
                    turn.content.push_str("\n\n");
                }
                turn.content.push_str("Error: ");
                turn.content.push_str(message);
                turn.status = TurnStatus::Errored;
            });
        }
        self.session.cancel_token = None;
        self.ui.end_streaming();
    }
}
