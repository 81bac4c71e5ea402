use std::time::Duration;

/// Initial reconnect delay.
pub const INITIAL_DELAY_MS: u64 = 1000;
/// Reconnect delay ceiling.
pub const MAX_DELAY_MS: u64 = 30_000;

/// Exponential reconnect backoff, no jitter.
///
/// An explicit value object rather than hidden instance state so the delay
/// sequence can be asserted deterministically. Process-local; never
/// persisted. The owner schedules retries — this type only produces the
/// delay sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectBackoff {
    current_delay_ms: u64,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self {
            current_delay_ms: INITIAL_DELAY_MS,
        }
    }

    /// Return the current delay, then double it (capped at the ceiling).
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay_ms;
        self.current_delay_ms = (self.current_delay_ms.saturating_mul(2)).min(MAX_DELAY_MS);
        Duration::from_millis(delay)
    }

    /// Restore the initial delay. Called after any successful connection or
    /// health check, so a single success clears accumulated backoff.
    pub fn reset(&mut self) {
        self.current_delay_ms = INITIAL_DELAY_MS;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_sequence_doubles_to_ceiling() {
        let mut backoff = ReconnectBackoff::new();
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000]);
    }

    #[test]
    fn reset_restores_floor_from_any_state() {
        let mut backoff = ReconnectBackoff::new();
        for _ in 0..10 {
            backoff.next_delay();
        }
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2000));
    }
}
