//! Bounded, order-preserving fan-out over per-sub-question work.

use futures::{stream, StreamExt};
use std::future::Future;

/// Run `task` for every item with at most `concurrency` in flight.
///
/// Tasks are keyed by their input index and results come back in input
/// order regardless of completion order. A concurrency of 1 runs the items
/// strictly one after another.
pub async fn fan_out<T, R, F, Fut>(items: Vec<T>, concurrency: usize, task: F) -> Vec<R>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let task = &task;
    let mut indexed: Vec<(usize, R)> = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move { (index, task(index, item).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // Later items finish first
        let out = fan_out(vec![30u64, 20, 10, 0], 4, |i, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            i * 10
        })
        .await;

        assert_eq!(out, vec![0, 10, 20, 30]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        fan_out((0..10).collect::<Vec<_>>(), 3, |_, _| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let out: Vec<u8> = fan_out(Vec::<u8>::new(), 0, |_, x| async move { x }).await;
        assert!(out.is_empty());
    }
}
