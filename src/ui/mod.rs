//! Terminal UI layer for interactive chat sessions.
//!
//! [`chat_loop`] runs the interaction loop: it forwards keyboard and mouse
//! input, drains transport events into the conversation log, and paces
//! redraws. [`renderer`] composes each frame from the log and input state.
//!
//! Ownership boundary: this layer presents and captures interaction state,
//! while [`crate::core`] owns the conversation and transport logic.

pub mod chat_loop;
pub mod renderer;
