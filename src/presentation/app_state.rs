// Application state for HTTP handlers
use crate::application::engine_service::EngineService;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineService,
}
