use std::{sync::Arc, time::Duration};

use futures::{stream, stream::BoxStream, StreamExt};
use tokio::time::Instant;

use super::clock::Clock;

/// Interval between two accrual ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Creates a lazy, infinite stream of tick instants spaced by `period`. The schedule starts on the
/// first poll, and dropping the stream cancels every future tick. Calling this again starts a
/// fresh sequence.
pub fn ticks(clock: Arc<dyn Clock>, period: Duration) -> BoxStream<'static, Instant> {
    let initial: (Arc<dyn Clock>, Option<Instant>) = (clock, None);
    stream::unfold(initial, move |(clock, previous)| async move {
        let next = previous.unwrap_or_else(|| clock.instant()) + period;
        clock.sleep_until(next).await;
        Some((next, (clock, Some(next))))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use futures::StreamExt;
    use tokio::time::Instant;

    use crate::utils::clock::DefaultClock;

    use super::{ticks, TICK_PERIOD};

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_spaced_by_period() {
        let start = Instant::now();
        let instants = ticks(Arc::new(DefaultClock), TICK_PERIOD)
            .take(3)
            .collect::<Vec<_>>()
            .await;

        assert_eq!(
            instants,
            vec![
                start + Duration::from_secs(1),
                start + Duration::from_secs(2),
                start + Duration::from_secs(3),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_start_on_first_poll() {
        let mut stream = ticks(Arc::new(DefaultClock), TICK_PERIOD);
        tokio::time::sleep(Duration::from_secs(10)).await;

        let polled_at = Instant::now();
        let first = stream.next().await.unwrap();
        assert_eq!(first, polled_at + TICK_PERIOD);
    }
}
