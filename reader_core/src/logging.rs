// `log` facade routed to the browser console through wasm-logger.

use std::sync::Once;

use log::LevelFilter;

static INSTALL: Once = Once::new();

/// Install the console logger once. Later calls only adjust the level.
pub fn init(level: LevelFilter) {
    INSTALL.call_once(|| {
        // The logger passes everything; `log::max_level` does the filtering.
        #[cfg(target_arch = "wasm32")]
        wasm_logger::init(wasm_logger::Config::new(log::Level::Trace));
        log::info!("Logging initialized");
    });
    log::set_max_level(level);
}
