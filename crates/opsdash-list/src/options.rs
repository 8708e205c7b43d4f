use std::time::Duration;

/// Tuning for a [`ListController`](crate::ListController).
///
/// Override only what you need:
///
/// ```rust,ignore
/// let options = ControllerOptions {
///     debounce: Duration::from_millis(150),
///     ..ControllerOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Quiet period after the last edit before the address is written and a
    /// fetch issued (default: 300ms).
    pub debounce: Duration,
    /// Page sizes a user may pick (default: 10, 20, 50, 100).
    pub page_sizes: Vec<u32>,
    /// Page size when the address has none (default: 10).
    pub default_page_size: u32,
    /// Move an out-of-range page back to the last page after a fetch and
    /// fetch again (default: true).
    pub clamp_page: bool,
    /// How long a notification stays up (default: 4s). `None` keeps it until
    /// dismissed.
    pub notification_ttl: Option<Duration>,
    /// Shown when a fetch fails without a server message.
    pub load_failed: String,
    /// Shown when a mutation fails without a server message.
    pub mutation_failed: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions {
            debounce: Duration::from_millis(300),
            page_sizes: vec![10, 20, 50, 100],
            default_page_size: 10,
            clamp_page: true,
            notification_ttl: Some(Duration::from_secs(4)),
            load_failed: "Failed to load data".to_string(),
            mutation_failed: "Something went wrong. Please try again.".to_string(),
        }
    }
}
