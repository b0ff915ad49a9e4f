// Built-in backend engines

mod dummy;
mod symphonia_engine;

pub use self::dummy::DummyBackend;
pub use self::symphonia_engine::SymphoniaBackend;

use mrlkit_core::{Backend, EngineKind, PlayerConfig, Result};
use std::sync::Arc;

/// Instantiate the engine named by `config`
pub fn create_backend(config: &PlayerConfig) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match config.engine() {
        EngineKind::Symphonia => Arc::new(SymphoniaBackend::new(config)?),
        EngineKind::Dummy => Arc::new(DummyBackend::new(config)),
    };
    log::info!(
        "{} engine ready (ao={}, vo={})",
        backend.name(),
        config.audio_output(),
        config.video_output()
    );
    Ok(backend)
}
