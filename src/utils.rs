//! 浏览器环境的初始化工具。

use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

/// 把 `log` 输出接到浏览器控制台，重复调用无副作用。
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        #[cfg(target_arch = "wasm32")]
        {
            let level = if cfg!(debug_assertions) {
                log::Level::Debug
            } else {
                log::Level::Info
            };
            // 宿主页面可能已经装过 logger
            let _ = console_log::init_with_level(level);
        }
    });
}
