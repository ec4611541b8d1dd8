//! Tokens for latency probes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static PING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique `PING` token.
///
/// Returns a string like `slirc-1234567890-0` combining timestamp and counter.
pub fn generate_ping_token() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let counter = PING_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("slirc-{}-{}", timestamp, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_ping_token();
        let b = generate_ping_token();
        assert_ne!(a, b);
        assert!(a.starts_with("slirc-"));
        assert!(!a.contains(' '));
    }
}
