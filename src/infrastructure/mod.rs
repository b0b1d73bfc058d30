// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod frame_decoder;
pub mod line_source;
pub mod simulated_source;
pub mod transport_link;
