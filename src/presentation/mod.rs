// Presentation layer - HTTP surface over the engine service
pub mod app_state;
pub mod handlers;
