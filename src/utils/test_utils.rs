#[cfg(test)]
use crate::core::app::{App, UiState};
#[cfg(test)]
use crate::core::log::{ConversationLog, LogObserver, Turn, TurnRole};
#[cfg(test)]
use crate::core::session::{SessionContext, SessionSettings};
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
pub fn create_test_app() -> App {
    App {
        session: SessionContext::new(SessionSettings {
            endpoint: "http://api.test.local".to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            developer_message: "You are a test assistant.".to_string(),
        }),
        ui: UiState::new(),
        log: ConversationLog::new(),
    }
}

/// Log observer that keeps a snapshot of the turns at every change, for
/// asserting what presentation code would have seen and in what order.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingObserver {
    snapshots: Arc<Mutex<Vec<Vec<Turn>>>>,
}

#[cfg(test)]
impl RecordingObserver {
    /// Installs a recorder on the app's log and returns the reading handle.
    pub fn install(app: &mut App) -> Self {
        let recorder = Self::default();
        app.log.set_observer(Box::new(recorder.clone()));
        recorder
    }

    pub fn event_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    /// Content of the trailing assistant turn at each observed change;
    /// changes where the trailing turn was not an assistant turn are skipped.
    pub fn assistant_contents(&self) -> Vec<String> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .filter_map(|turns| {
                turns
                    .last()
                    .filter(|turn| turn.role == TurnRole::Assistant)
                    .map(|turn| turn.content.clone())
            })
            .collect()
    }
}

#[cfg(test)]
impl LogObserver for RecordingObserver {
    fn log_changed(&mut self, turns: &[Turn]) {
        self.snapshots.lock().unwrap().push(turns.to_vec());
    }
}
