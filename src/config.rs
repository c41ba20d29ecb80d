use std::time::Duration;

/// Fallback tab amount if none is configured.
pub const DEFAULT_TAB_AMOUNT: usize = 10;

/// Main display configuration. Everything the core needs to know about the
/// kiosk instance; transport scopes and screen selection are handled by the
/// embedding process.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Application name, exposed to templates as the `APP` variable.
    pub app_name: String,
    /// Maximum number of render surfaces ("tabs") kept warm for reuse.
    pub tab_amount: usize,
    /// Screen width in pixels, exposed to templates as `SCREEN_WIDTH`.
    pub screen_width: u32,
    /// Screen height in pixels, exposed to templates as `SCREEN_HEIGHT`.
    pub screen_height: u32,
    /// Upper bound for waiting on a single load to complete.
    pub load_timeout: Duration,
    /// Documented default bound for the remote binding when awaiting a
    /// command future before reporting the RPC as failed.
    pub command_timeout: Duration,
    /// Whether the display window is brought to the foreground at startup.
    pub visible_at_startup: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            app_name: "kiosk-display".to_string(),
            tab_amount: DEFAULT_TAB_AMOUNT,
            screen_width: 1920,
            screen_height: 1080,
            load_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
            visible_at_startup: false,
        }
    }
}
