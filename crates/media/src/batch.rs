// media/batch.rs - Compress a list of photos with a fixed pool of two workers

use crate::compress::{compress_image, CompressedImage, CompressionOptions};
use crate::error::MediaError;
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub const BATCH_WORKERS: usize = 2;

/// Compresses every image, keeping input order in the output.
///
/// A failure is reported for that photo only.
pub async fn compress_batch(
    images: Vec<Vec<u8>>,
    options: CompressionOptions,
) -> Vec<Result<CompressedImage, MediaError>> {
    run_pool(images, move |image: &Vec<u8>| compress_image(image, &options)).await
}

// Runs `work` over every item on the blocking pool with at most BATCH_WORKERS in flight.
// Workers claim the next unprocessed index from a shared counter, so a slow item
// never holds up the rest of the queue.
async fn run_pool<T, R, F>(items: Vec<T>, work: F) -> Vec<Result<R, MediaError>>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T) -> Result<R, MediaError> + Send + Sync + 'static,
{
    let total = items.len();
    let items = Arc::new(items);
    let work = Arc::new(work);
    let next = Arc::new(AtomicUsize::new(0));

    let workers = (0..BATCH_WORKERS.min(total)).map(|worker| {
        let items = Arc::clone(&items);
        let work = Arc::clone(&work);
        let next = Arc::clone(&next);

        async move {
            let mut finished = Vec::new();
            loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                if index >= items.len() {
                    break;
                }
                debug!("Worker {} processing item {}/{}", worker, index + 1, items.len());

                let items = Arc::clone(&items);
                let work = Arc::clone(&work);
                let result = tokio::task::spawn_blocking(move || work(&items[index]))
                    .await
                    .unwrap_or_else(|e| Err(MediaError::Worker(e.to_string())));

                if let Err(e) = &result {
                    warn!("Item {} failed: {}", index, e);
                }
                finished.push((index, result));
            }
            finished
        }
    });

    let mut results: Vec<(usize, Result<R, MediaError>)> =
        join_all(workers).await.into_iter().flatten().collect();
    results.sort_by_key(|(index, _)| *index);

    results.into_iter().map(|(_, result)| result).collect()
}
