//! Conversation turns and the log that owns them.
//!
//! The log is an ordered sequence of [`Turn`]s where only the trailing entry
//! may still be open (non-terminal). All mutation goes through
//! [`ConversationLog::append`] and [`ConversationLog::mutate_last`], each of
//! which notifies the registered [`LogObserver`] so presentation code can
//! redraw without being wired into the mutation sites.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn is_user(self) -> bool {
        self == TurnRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TurnRole::Assistant
    }
}

/// Lifecycle of a turn: `Pending → Streaming → {Committed, Aborted, Errored}`.
///
/// User turns are born `Committed`; only assistant turns walk the full
/// lifecycle. Terminal statuses never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// Placeholder appended before any network activity.
    Pending,
    /// At least one fragment has arrived.
    Streaming,
    /// Stream ended normally.
    Committed,
    /// Cancellation was observed; partial content is kept.
    Aborted,
    /// Transport or decode failure; content carries the error description.
    Errored,
}

impl TurnStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TurnStatus::Committed | TurnStatus::Aborted | TurnStatus::Errored
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TurnStatus::Pending => "pending",
            TurnStatus::Streaming => "streaming",
            TurnStatus::Committed => "committed",
            TurnStatus::Aborted => "aborted",
            TurnStatus::Errored => "errored",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub status: TurnStatus,
}

impl Turn {
    /// A user turn carries its full message from the start and never streams.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            status: TurnStatus::Committed,
        }
    }

    /// Empty assistant placeholder, appended before the transport call opens.
    pub fn assistant_placeholder() -> Self {
        Self {
            role: TurnRole::Assistant,
            content: String::new(),
            status: TurnStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    /// A non-terminal turn already exists; a second open turn would break the
    /// single-exchange-in-flight invariant.
    ExchangeInFlight,
    /// `mutate_last` was called on an empty log.
    Empty,
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::ExchangeInFlight => {
                write!(f, "an exchange is already in flight")
            }
            LogError::Empty => write!(f, "conversation log is empty"),
        }
    }
}

impl StdError for LogError {}

/// Receives a read-only view of the turns after every successful mutation.
pub trait LogObserver: Send {
    fn log_changed(&mut self, turns: &[Turn]);
}

impl LogObserver for () {
    fn log_changed(&mut self, _turns: &[Turn]) {}
}

pub struct ConversationLog {
    turns: Vec<Turn>,
    observer: Box<dyn LogObserver>,
}

impl fmt::Debug for ConversationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationLog")
            .field("turns", &self.turns)
            .finish_non_exhaustive()
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::with_observer(Box::new(()))
    }

    pub fn with_observer(observer: Box<dyn LogObserver>) -> Self {
        Self {
            turns: Vec::new(),
            observer,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn LogObserver>) {
        self.observer = observer;
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// True when any turn is still non-terminal.
    pub fn has_open_turn(&self) -> bool {
        self.turns.iter().any(|turn| !turn.is_terminal())
    }

    /// Adds a turn at the end. Appending a second open turn is refused.
    pub fn append(&mut self, turn: Turn) -> Result<(), LogError> {
        if !turn.status.is_terminal() && self.has_open_turn() {
            return Err(LogError::ExchangeInFlight);
        }
        self.turns.push(turn);
        self.notify();
        Ok(())
    }

    /// Applies `f` to the trailing turn. The exchange controller is the only
    /// caller; fragments and terminal statuses land here.
    pub fn mutate_last(&mut self, f: impl FnOnce(&mut Turn)) -> Result<(), LogError> {
        let Some(turn) = self.turns.last_mut() else {
            return Err(LogError::Empty);
        };
        f(turn);
        self.notify();
        Ok(())
    }

    /// Empties the log. Callers that may have an exchange in flight must
    /// cancel it first; see `ExchangeController::reset_conversation`.
    pub fn clear(&mut self) {
        if self.turns.is_empty() {
            return;
        }
        self.turns.clear();
        self.notify();
    }

    fn notify(&mut self) {
        self.observer.log_changed(&self.turns);
    }
}
