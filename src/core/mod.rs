pub mod app;
pub mod config;
pub mod decoder;
pub mod exchange;
pub mod log;
pub mod session;
pub mod transport;
