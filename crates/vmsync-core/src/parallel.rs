// ── Bounded fan-out ──
//
// Runs one task per item with a concurrency ceiling and gathers results on
// the calling task. Workers never touch shared output: each returns its
// value and the single collector pushes it, so result aggregation needs no
// locking.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Apply `f` to every item concurrently, at most `limit` at a time.
///
/// Results arrive in completion order. A panicking worker re-raises its
/// panic on the caller.
pub async fn map_collect<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let f = Arc::new(f);
    let mut workers = JoinSet::new();

    for item in items {
        let permits = Arc::clone(&permits);
        let f = Arc::clone(&f);
        workers.spawn(async move {
            let _permit = permits.acquire_owned().await;
            f(item).await
        });
    }

    let mut results = Vec::with_capacity(workers.len());
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(value) => results.push(value),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => warn!(error = %e, "worker task cancelled"),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn respects_concurrency_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let mut out = map_collect((0..20).collect(), 3, move |n: u32| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                n * 2
            }
        })
        .await;

        out.sort_unstable();
        assert_eq!(out, (0..20).map(|n| n * 2).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        let out: Vec<u8> = map_collect(Vec::<u8>::new(), 4, |n| async move { n }).await;
        assert!(out.is_empty());
    }
}
