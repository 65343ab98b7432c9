//! Session-scoped runtime state: connection settings and the handle to the
//! exchange currently in flight, if any.

use tokio_util::sync::CancellationToken;

/// Resolved connection settings (flags → config file → built-in defaults).
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub developer_message: String,
}

pub struct SessionContext {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub developer_message: String,
    /// Token for the exchange in flight; `None` between exchanges.
    pub cancel_token: Option<CancellationToken>,
    /// Bumped on every submit; stale transport events carry an older id.
    pub current_exchange_id: u64,
}

impl SessionContext {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint,
            api_key: settings.api_key,
            model: settings.model,
            developer_message: settings.developer_message,
            cancel_token: None,
            current_exchange_id: 0,
        }
    }

    pub fn exchange_in_flight(&self) -> bool {
        self.cancel_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_has_no_exchange_in_flight() {
        let session = SessionContext::new(SessionSettings {
            endpoint: "http://test.local".into(),
            api_key: "test-key".into(),
            model: "test-model".into(),
            developer_message: "be terse".into(),
        });
        assert!(!session.exchange_in_flight());
        assert_eq!(session.current_exchange_id, 0);
    }

    #[test]
    fn in_flight_tracks_the_stored_token() {
        let mut session = SessionContext::new(SessionSettings {
            endpoint: "http://test.local".into(),
            api_key: String::new(),
            model: "test-model".into(),
            developer_message: String::new(),
        });

        session.cancel_token = Some(CancellationToken::new());
        assert!(session.exchange_in_flight());

        session.cancel_token = None;
        assert!(!session.exchange_in_flight());
    }
}
