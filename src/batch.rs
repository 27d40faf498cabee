//! Fixed-width batch loader.

use futures::future::join_all;
use std::future::Future;

/// Default number of tasks in flight at once.
pub const DEFAULT_BATCH_WIDTH: usize = 3;

/// Run `tasks` in consecutive chunks of `width`.
///
/// Tasks within a chunk run concurrently; the next chunk starts only after
/// every task of the current one has finished. `result[i]` belongs to
/// `tasks[i]`. Tasks are expected to fold their own failures into `T`.
/// A width of zero is treated as one.
pub async fn run_batched<T, F, Fut>(tasks: Vec<F>, width: usize) -> Vec<T>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = T>,
{
  let width = width.max(1);
  let mut results = Vec::with_capacity(tasks.len());
  let mut tasks = tasks.into_iter();

  loop {
    let chunk: Vec<Fut> = tasks.by_ref().take(width).map(|task| task()).collect();
    if chunk.is_empty() {
      break;
    }
    results.extend(join_all(chunk).await);
  }

  results
}
