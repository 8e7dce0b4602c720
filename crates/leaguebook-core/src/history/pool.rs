// Bounded worker pool for variable-size fan-out.
//
// A fixed number of workers share one cursor over the pending items. Each
// worker takes the next unclaimed index, awaits its job, and repeats until the
// list is exhausted, so at most `limit` jobs are ever in flight.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::join_all;

/// Run `job` over every item with at most `limit` jobs in flight. Results come
/// back in input order regardless of completion order.
pub async fn run_bounded<T, R, F, Fut>(items: &[T], limit: usize, job: F) -> Vec<R>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = R>,
{
    let workers = limit.max(1).min(items.len());
    let cursor = AtomicUsize::new(0);
    let cursor = &cursor;
    let job = &job;

    let finished = join_all((0..workers).map(|_| async move {
        let mut done = Vec::new();
        loop {
            let idx = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(idx) else {
                break;
            };
            done.push((idx, job(item).await));
        }
        done
    }))
    .await;

    let mut results: Vec<(usize, R)> = finished.into_iter().flatten().collect();
    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, result)| result).collect()
}
