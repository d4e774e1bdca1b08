//! Blocking work offload and the bounded fan-out used by the `delete`
//! implementations.

use crossbeam_channel::bounded;
use shrink_core::error::{Result, StorageError};

/// Upper bound on the number of workers spawned per call.
pub(crate) const MAX_WORKERS: usize = 10;

/// Worker count for `jobs` items: `min(MAX_WORKERS, jobs)`, at least one.
pub(crate) fn pool_size(jobs: usize) -> usize {
    jobs.clamp(1, MAX_WORKERS)
}

/// Feeds `items` through a bounded channel to a pool of scoped worker
/// threads running `work`.
///
/// Returns once every worker has drained the channel and exited, so no
/// work outlives the call.
pub(crate) fn fan_out<T, I, F>(items: I, work: F)
where
    T: Send,
    I: ExactSizeIterator<Item = T>,
    F: Fn(T) + Sync,
{
    let workers = pool_size(items.len());
    let (tx, rx) = bounded::<T>(workers);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let work = &work;
            scope.spawn(move || {
                for item in rx {
                    work(item);
                }
            });
        }
        drop(rx);

        for item in items {
            if tx.send(item).is_err() {
                break;
            }
        }
        drop(tx);
    });
}

/// Runs blocking work on the runtime's blocking pool and waits for it.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StorageError::Unavailable(format!("blocking task failed: {e}")))?
}

/// [`fan_out`] on the blocking pool. Resolves once every item is processed.
pub(crate) async fn fan_out_blocking<T, F>(items: Vec<T>, work: F) -> Result<()>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    run_blocking(move || {
        fan_out(items.into_iter(), work);
        Ok(())
    })
    .await
}
