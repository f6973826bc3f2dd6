use rand::{Rng, RngCore};
use std::time::Duration;

pub(crate) fn jittered_backoff(rng: &mut impl RngCore, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }

    // "Equal jitter": delay is in [backoff/2, backoff].
    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stays_within_equal_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = Duration::from_millis(1_000);
        for _ in 0..100 {
            let delay = jittered_backoff(&mut rng, base);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= base);
        }
    }
}
