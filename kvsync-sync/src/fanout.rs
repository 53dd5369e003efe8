//! Bounded fan-out of blocking work onto the tokio blocking pool.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::SyncError;

/// Apply `f` to every item with at most `limit` calls in flight.
///
/// Returns once every task has finished. Results keep input order; if any
/// call fails, the error of the lowest-index failure is returned.
pub(crate) async fn map_blocking<I, O, F>(
    items: Vec<I>,
    limit: usize,
    f: F,
) -> Result<Vec<O>, SyncError>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Result<O, SyncError> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let permits = Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS)));
    let total = items.len();
    let mut set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?;
        let f = f.clone();
        set.spawn_blocking(move || {
            let _permit = permit;
            (index, f(item))
        });
    }

    let mut slots: Vec<Option<O>> = (0..total).map(|_| None).collect();
    let mut failure: Option<(usize, SyncError)> = None;
    while let Some(joined) = set.join_next().await {
        let (index, result) = joined.map_err(|e| SyncError::Task(e.to_string()))?;
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(err) => {
                if failure.as_ref().map_or(true, |(i, _)| index < *i) {
                    failure = Some((index, err));
                }
            }
        }
    }

    if let Some((_, err)) = failure {
        return Err(err);
    }
    Ok(slots.into_iter().flatten().collect())
}

/// Run one blocking call off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SyncError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn keeps_input_order() {
        let out = map_blocking((0..50u64).collect(), 4, |n| {
            std::thread::sleep(Duration::from_millis((50 - n) % 7));
            Ok(n * 2)
        })
        .await
        .unwrap();
        assert_eq!(out, (0..50u64).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_the_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (running.clone(), peak.clone());
        map_blocking((0..32).collect::<Vec<u32>>(), 3, move |_| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            r.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn reports_lowest_index_failure() {
        let err = map_blocking((0..10).collect::<Vec<u32>>(), 8, |n| {
            if n == 3 || n == 7 {
                Err(SyncError::UnresolvedSize(PathBuf::from(n.to_string())))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, SyncError::UnresolvedSize(p) if p == PathBuf::from("3")));
    }

    #[tokio::test]
    async fn out_of_range_limits_are_clamped() {
        let out = map_blocking(vec![1u8, 2], usize::MAX, Ok).await.unwrap();
        assert_eq!(out, [1, 2]);
        let out = map_blocking(vec![3u8], 0, Ok).await.unwrap();
        assert_eq!(out, [3]);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let out: Vec<u8> = map_blocking(Vec::<u8>::new(), 4, Ok).await.unwrap();
        assert!(out.is_empty());
    }
}
