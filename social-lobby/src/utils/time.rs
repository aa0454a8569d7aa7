use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch, or 0 if the system clock is before it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
