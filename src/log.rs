//! Logger init, matching `bugstalker::ui::console`'s `env_logger::init()`
//! call behind a `Once` guard so both front ends can call it unconditionally.

use std::sync::Once;

static LOGGER_ONCE: Once = Once::new();

pub fn init() {
    LOGGER_ONCE.call_once(|| {
        env_logger::init();
    });
}
