//! Parallel batch compositing
//!
//! Every image pair is independent, so a batch is just a bounded fan-out of
//! [`Compositor::run`] calls onto tokio's blocking pool. Outcomes come back in
//! input order and one failed pair never affects the others.

use crate::{
    compositor::Compositor,
    config::CompositeRequest,
    error::{CompositeError, Result},
    types::{CompositeResult, RasterImage},
};
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One original/background-removed pair to composite
#[derive(Debug, Clone)]
pub struct CompositeJob {
    /// Caller-chosen identifier, e.g. the file stem
    pub id: String,
    pub original: RasterImage,
    pub removed: RasterImage,
}

impl CompositeJob {
    pub fn new<S: Into<String>>(id: S, original: RasterImage, removed: RasterImage) -> Self {
        Self {
            id: id.into(),
            original,
            removed,
        }
    }
}

/// Outcome of a single job within a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: String,
    pub result: Result<CompositeResult>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate counts for a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Default worker count: one per available CPU
#[must_use]
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Composite many pairs with at most `concurrency` running at once
///
/// A `concurrency` of 0 selects [`default_concurrency`]. The returned vector
/// has one outcome per job, in the same order as `jobs`.
///
/// # Errors
/// - `InvalidConfig` if the request fails validation (no job is run)
pub async fn composite_batch(
    jobs: Vec<CompositeJob>,
    request: CompositeRequest,
    concurrency: usize,
) -> Result<Vec<BatchOutcome>> {
    composite_batch_with_progress(jobs, request, concurrency, |_| {}).await
}

/// Like [`composite_batch`], calling `on_done` for each outcome as it is
/// yielded (in input order)
pub async fn composite_batch_with_progress<F>(
    jobs: Vec<CompositeJob>,
    request: CompositeRequest,
    concurrency: usize,
    on_done: F,
) -> Result<Vec<BatchOutcome>>
where
    F: Fn(&BatchOutcome),
{
    let compositor = Arc::new(Compositor::new(request)?);
    let workers = if concurrency == 0 {
        default_concurrency()
    } else {
        concurrency
    };

    info!(jobs = jobs.len(), workers, "Starting batch composite");

    let outcomes: Vec<BatchOutcome> = stream::iter(jobs)
        .map(|job| {
            let compositor = Arc::clone(&compositor);
            async move {
                let id = job.id.clone();
                let result = tokio::task::spawn_blocking(move || {
                    debug!(id = %job.id, "Compositing job");
                    compositor.run(&job.original, &job.removed)
                })
                .await
                .unwrap_or_else(|e| {
                    Err(CompositeError::processing(format!(
                        "Composite worker failed: {}",
                        e
                    )))
                });

                if let Err(ref e) = result {
                    warn!(id = %id, error = %e, "Job failed");
                }
                BatchOutcome { id, result }
            }
        })
        .buffered(workers)
        .inspect(|outcome| on_done(outcome))
        .collect()
        .await;

    let summary = BatchSummary::from_outcomes(&outcomes);
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Batch composite finished"
    );

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackgroundMode, CanvasSize};
    use image::Rgba;

    fn job(id: &str, size: u32, removed_size: u32) -> CompositeJob {
        CompositeJob::new(
            id,
            RasterImage::from_pixel(size, size, Rgba([0, 0, 0, 255])),
            RasterImage::from_pixel(removed_size, removed_size, Rgba([0, 0, 0, 255])),
        )
    }

    fn request() -> CompositeRequest {
        CompositeRequest::builder()
            .canvas_size(CanvasSize::square(16))
            .background(BackgroundMode::White)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let jobs = vec![
            job("a", 8, 8),
            job("b", 8, 4),
            job("c", 32, 32),
            job("d", 2, 2),
        ];

        let outcomes = composite_batch(jobs, request(), 2).await.unwrap();
        let ids: Vec<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);

        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(CompositeError::DimensionMismatch { .. })
        ));
        assert!(outcomes[2].is_ok());
        assert!(outcomes[3].is_ok());

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(
            summary,
            BatchSummary {
                total: 4,
                succeeded: 3,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_batch_rejects_invalid_request_up_front() {
        let mut bad = request();
        bad.canvas_size = CanvasSize::new(0, 0);
        let result = composite_batch(vec![job("a", 2, 2)], bad, 1).await;
        assert!(matches!(result, Err(CompositeError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_outcome_in_order() {
        let seen = std::sync::Mutex::new(Vec::new());
        let jobs = vec![job("x", 4, 4), job("y", 4, 3), job("z", 4, 4)];
        composite_batch_with_progress(jobs, request(), 3, |outcome| {
            seen.lock().unwrap().push((outcome.id.clone(), outcome.is_ok()));
        })
        .await
        .unwrap();

        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                ("x".to_string(), true),
                ("y".to_string(), false),
                ("z".to_string(), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = composite_batch(Vec::new(), request(), 0).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
