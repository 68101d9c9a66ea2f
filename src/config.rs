//! Ambient configuration for the operation-log core.
//!
//! Everything here tunes behavior at the edges of the spec (how chatty the
//! legacy-tolerance logging is, how deep the streaming enumerator's
//! backpressure buffer runs) — it never changes the commit/read/merge
//! protocol itself.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Bound of the channel `enumerate::stream` hands bugs across, from the
    /// background producer thread to the consumer. Spec §5/§9 calls for a
    /// size-1 buffer so at most one item is ever abandoned on early
    /// consumer drop; raising this trades that guarantee for throughput.
    pub enumerate_channel_capacity: usize,
    /// Emit a `tracing::warn!` when `bug::read` tolerates a commit with a
    /// missing `edit-clock-*`/`create-clock-*` entry (spec §4.2 step 3,
    /// "legacy tolerance"). Disable in environments where old packs are
    /// expected and the warning would just be noise.
    pub warn_on_legacy_clock_tolerance: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enumerate_channel_capacity: 1,
            warn_on_legacy_clock_tolerance: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_buffer_size() {
        let config = Config::default();
        assert_eq!(config.enumerate_channel_capacity, 1);
        assert!(config.warn_on_legacy_clock_tolerance);
    }
}
