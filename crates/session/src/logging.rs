use mrlkit_core::Verbosity;
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Install `env_logger` at the given verbosity.
///
/// The logger is process-wide: only the first session to open picks the
/// level. `RUST_LOG`, when set, still takes precedence.
pub fn init_logging(verbosity: Verbosity) {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(verbosity.level_filter())
            .parse_default_env()
            .try_init();
    });
}
