use std::time::Duration;

use rand::Rng;

use candela_core::BackoffConfig;

/// `base_ms` plus up to `jitter_percent` percent of random jitter.
#[must_use]
pub fn jitter_wait(base_ms: u64, jitter_percent: u8) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, base_ms.saturating_mul(u64::from(jitter_percent)) / 100)
    };
    let mut rng = rand::rng();
    base_ms + rng.random_range(0..jitter_range)
}

/// Delay before retry number `attempt` (0-based).
#[must_use]
pub fn retry_delay(cfg: &BackoffConfig, attempt: u32) -> Duration {
    Duration::from_millis(jitter_wait(cfg.base_delay_ms(attempt), cfg.jitter_percent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_percent() {
        for _ in 0..200 {
            let w = jitter_wait(1_000, 20);
            assert!((1_000..1_200).contains(&w), "{w}");
        }
        assert_eq!(jitter_wait(250, 0), 250);
    }

    #[test]
    fn retry_delay_is_capped() {
        let cfg = BackoffConfig {
            min_backoff_ms: 100,
            max_backoff_ms: 400,
            factor: 2,
            jitter_percent: 0,
        };
        assert_eq!(retry_delay(&cfg, 0), Duration::from_millis(100));
        assert_eq!(retry_delay(&cfg, 5), Duration::from_millis(400));
    }
}
