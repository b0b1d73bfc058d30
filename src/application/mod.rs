// Application layer - engine orchestration and the ports it talks through
pub mod clock;
pub mod engine;
pub mod engine_service;
pub mod sample_source;
