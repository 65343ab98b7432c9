//! Wire payloads for the chat endpoint.
//!
//! The consumed service takes a single JSON document per exchange and answers
//! with an unframed UTF-8 text stream, so only the request side needs serde
//! types.

use serde::Serialize;

#[derive(Serialize, Clone, Debug)]
pub struct PromptRequest {
    pub developer_message: String,
    pub user_message: String,
    pub model: String,
}

impl PromptRequest {
    pub fn new(
        developer_message: impl Into<String>,
        user_message: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            developer_message: developer_message.into(),
            user_message: user_message.into(),
            model: model.into(),
        }
    }
}
