// ── Batch mutation helper ──
//
// Splits a long id list into fixed-size chunks and submits each chunk with
// one call. Chunks go out strictly in order, one at a time.

use std::fmt::Display;
use std::future::Future;

use tracing::{info, warn};
use zn_api::RetryPolicy;

use crate::error::CoreError;

/// Default members per request for group mutations.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Split `ids` into consecutive chunks of `size`; the last may be shorter.
pub fn chunk_ids<T>(ids: &[T], size: usize) -> Result<Vec<&[T]>, CoreError> {
    if size == 0 {
        return Err(CoreError::validation("chunk size must be at least 1"));
    }
    Ok(ids.chunks(size).collect())
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub chunk_size: usize,
    /// Keep submitting after a chunk fails.
    pub continue_on_error: bool,
    /// Applied to each chunk independently.
    pub retry: RetryPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            continue_on_error: false,
            retry: RetryPolicy::none(),
        }
    }
}

/// A chunk that did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// Zero-based chunk position.
    pub index: usize,
    pub ids: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Submit invocations, retries included.
    pub calls: usize,
    /// Ids in chunks that succeeded.
    pub succeeded: usize,
    pub failures: Vec<ChunkFailure>,
    /// Remaining chunks were skipped after a failure.
    pub aborted: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }

    pub fn failed_ids(&self) -> usize {
        self.failures.iter().map(|f| f.ids.len()).sum()
    }
}

/// Submit `ids` chunk by chunk through `submit`.
///
/// A failing chunk is retried per `opts.retry` when the error is transient.
/// Without `continue_on_error` the first failure stops the run and the
/// report is marked `aborted`.
pub async fn submit_batches<F, Fut, E>(
    ids: &[String],
    opts: &BatchOptions,
    mut submit: F,
) -> Result<BatchReport, CoreError>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Into<CoreError>,
{
    let chunks = chunk_ids(ids, opts.chunk_size)?;
    let total = chunks.len();
    let mut report = BatchReport::default();

    for (index, chunk) in chunks.into_iter().enumerate() {
        let calls = &mut report.calls;
        let result = opts
            .retry
            .run_if(
                || {
                    *calls += 1;
                    let fut = submit(chunk.to_vec());
                    async move { fut.await.map_err(Into::into) }
                },
                CoreError::is_transient,
            )
            .await;

        match result {
            Ok(()) => {
                report.succeeded += chunk.len();
                info!(
                    chunk = index + 1,
                    total,
                    size = chunk.len(),
                    done = report.succeeded,
                    "chunk submitted"
                );
            }
            Err(e) => {
                warn!(chunk = index + 1, total, error = %e, "chunk failed");
                report.failures.push(failure(index, chunk, &e));
                if !opts.continue_on_error {
                    report.aborted = index + 1 < total;
                    break;
                }
            }
        }
    }
    Ok(report)
}

fn failure(index: usize, chunk: &[String], err: &impl Display) -> ChunkFailure {
    ChunkFailure {
        index,
        ids: chunk.to_vec(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("a:a:{i}")).collect()
    }

    #[test]
    fn chunk_sizes_and_order() {
        let input = ids(130);
        let chunks = chunk_ids(&input, 50).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![50, 50, 30]);
        assert_eq!(chunks.concat(), input);
    }

    #[test]
    fn chunk_count_is_ceiling() {
        for (n, c) in [(0, 3), (1, 1), (7, 3), (9, 3), (10, 50), (101, 25)] {
            let input = ids(n);
            let chunks = chunk_ids(&input, c).unwrap();
            assert_eq!(chunks.len(), n.div_ceil(c), "n={n} c={c}");
            assert_eq!(chunks.concat(), input);
        }
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            chunk_ids(&ids(3), 0),
            Err(CoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn submits_every_chunk_in_order() {
        let seen = Mutex::new(Vec::new());
        let report = submit_batches(&ids(130), &BatchOptions::default(), |chunk| {
            seen.lock().unwrap().push(chunk);
            async { Ok::<(), CoreError>(()) }
        })
        .await
        .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.iter().map(Vec::len).collect::<Vec<_>>(), vec![50, 50, 30]);
        assert_eq!(seen.concat(), ids(130));
        assert_eq!(report.calls, 3);
        assert_eq!(report.succeeded, 130);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn aborts_on_first_failure() {
        let opts = BatchOptions {
            chunk_size: 3,
            ..Default::default()
        };
        let report = submit_batches(&ids(10), &opts, |chunk| {
            let fail = chunk[0] == "a:a:3";
            async move {
                if fail {
                    Err(CoreError::validation("rejected"))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(report.calls, 2);
        assert_eq!(report.succeeded, 3);
        assert!(report.aborted);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failed_ids(), 3);
    }

    #[tokio::test]
    async fn continue_on_error_visits_all_chunks() {
        let opts = BatchOptions {
            chunk_size: 3,
            continue_on_error: true,
            ..Default::default()
        };
        let report = submit_batches(&ids(10), &opts, |chunk| {
            let fail = chunk.len() == 3 && chunk[0] == "a:a:0";
            async move {
                if fail {
                    Err(CoreError::validation("rejected"))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(report.calls, 4);
        assert_eq!(report.succeeded, 7);
        assert!(!report.aborted);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let attempts = Mutex::new(0_u32);
        let opts = BatchOptions {
            chunk_size: 5,
            retry: RetryPolicy::fixed(3, Duration::ZERO),
            ..Default::default()
        };
        let report = submit_batches(&ids(5), &opts, |_| {
            let n = {
                let mut a = attempts.lock().unwrap();
                *a += 1;
                *a
            };
            async move {
                if n < 2 {
                    Err(CoreError::Timeout {
                        reason: "slow".into(),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(report.calls, 2);
        assert!(report.is_success());
    }
}
