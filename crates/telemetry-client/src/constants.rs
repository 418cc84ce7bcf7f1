use std::time::Duration;

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(2);
pub const HOOK_TIMEOUT: Duration = Duration::from_secs(12);
pub const READ_MODEL_TIMEOUT: Duration = Duration::from_secs(5);
pub const HEALTH_POLL_TIMEOUT: Duration = Duration::from_millis(700);
pub const HEALTH_STARTUP_BUDGET: Duration = Duration::from_secs(25);
pub const HEALTH_FAST_PROBE_TIMEOUT: Duration = Duration::from_millis(1200);
pub const ENSURE_BUDGET: Duration = Duration::from_secs(6);
pub const ENSURE_THROTTLE: Duration = Duration::from_millis(1200);
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(220);
