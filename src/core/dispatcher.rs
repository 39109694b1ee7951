//! Bounded-concurrency chunk dispatch against the shared rate limiter

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::core::client::ProviderClient;
use crate::core::errors::Result;
use crate::core::limiter::RateLimiter;
use crate::core::models::Chunk;

/// Fans the chunks of one file out to the provider with at most
/// `max_concurrent` requests in flight, each admission gated by the shared
/// [`RateLimiter`].
///
/// Every chunk is attempted exactly once and yields exactly one entry in the
/// result map, keyed by chunk id so completion order does not matter. A
/// failing chunk never cancels its siblings; failures are returned as data
/// and the caller decides whether the file as a whole failed.
#[derive(Debug, Clone)]
pub struct ChunkDispatcher {
    client: Arc<ProviderClient>,
    limiter: Arc<RateLimiter>,
    max_concurrent: usize,
}

impl ChunkDispatcher {
    pub fn new(client: Arc<ProviderClient>, limiter: Arc<RateLimiter>, max_concurrent: usize) -> Self {
        Self {
            client,
            limiter,
            max_concurrent,
        }
    }

    /// Translate all chunks, returning one result per chunk id.
    pub async fn dispatch(&self, chunks: Vec<Chunk>) -> HashMap<usize, Result<String>> {
        let client = Arc::clone(&self.client);
        run_bounded(
            chunks,
            self.max_concurrent,
            Arc::clone(&self.limiter),
            move |text| {
                let client = Arc::clone(&client);
                async move { client.translate(&text).await }
            },
        )
        .await
    }
}

/// Worker-pool core of the dispatcher, generic over the translation call so
/// the concurrency and bookkeeping behavior can be exercised without a
/// network backend.
async fn run_bounded<F, Fut>(
    chunks: Vec<Chunk>,
    max_concurrent: usize,
    limiter: Arc<RateLimiter>,
    translate: F,
) -> HashMap<usize, Result<String>>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    let total = chunks.len();
    let translate = Arc::new(translate);
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for chunk in chunks {
        let semaphore = Arc::clone(&semaphore);
        let limiter = Arc::clone(&limiter);
        let translate = Arc::clone(&translate);

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("dispatcher semaphore closed");

            limiter.acquire(chunk.estimated_tokens()).await;
            debug!("Dispatching chunk {} ({} chars)", chunk.id, chunk.text.len());

            let result = translate(chunk.text).await;
            (chunk.id, result)
        });
    }

    let mut results = HashMap::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        let (id, result) = joined.expect("translation task panicked");
        results.insert(id, result);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::TranslationError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n).map(|i| Chunk::new(i, format!("chunk {i}"))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_cap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let in_flight_cl = Arc::clone(&in_flight);
        let high_water_cl = Arc::clone(&high_water);
        let results = run_bounded(
            chunks(20),
            3,
            Arc::new(RateLimiter::new(0, 0)),
            move |text| {
                let in_flight = Arc::clone(&in_flight_cl);
                let high_water = Arc::clone(&high_water_cl);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(text.to_uppercase())
                }
            },
        )
        .await;

        assert_eq!(results.len(), 20);
        assert!(high_water.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_one_result_per_chunk_keyed_by_id() {
        let results = run_bounded(
            chunks(10),
            4,
            Arc::new(RateLimiter::new(0, 0)),
            |text| async move {
                // Odd chunks fail, even chunks succeed.
                let id: usize = text
                    .rsplit(' ')
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                if id % 2 == 1 {
                    Err(TranslationError::NetworkError {
                        message: "connection reset".to_string(),
                    })
                } else {
                    Ok(format!("translated {id}"))
                }
            },
        )
        .await;

        assert_eq!(results.len(), 10);
        for id in 0..10 {
            let entry = results.get(&id).expect("missing chunk result");
            if id % 2 == 1 {
                assert!(entry.is_err());
            } else {
                assert_eq!(entry.as_ref().unwrap(), &format!("translated {id}"));
            }
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let completed_cl = Arc::clone(&completed);

        let results = run_bounded(
            chunks(3),
            3,
            Arc::new(RateLimiter::new(0, 0)),
            move |text| {
                let completed = Arc::clone(&completed_cl);
                async move {
                    completed.fetch_add(1, Ordering::SeqCst);
                    if text.ends_with('0') {
                        Err(TranslationError::ApiError {
                            status: 500,
                            message: "boom".to_string(),
                        })
                    } else {
                        Ok(text)
                    }
                }
            },
        )
        .await;

        // All three chunks ran to completion; the two successes are intact.
        assert_eq!(completed.load(Ordering::SeqCst), 3);
        assert_eq!(results.values().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(results.values().filter(|r| r.is_err()).count(), 1);
    }

    #[tokio::test]
    async fn test_empty_chunk_list() {
        let results = run_bounded(
            Vec::new(),
            2,
            Arc::new(RateLimiter::new(0, 0)),
            |text| async move { Ok(text) },
        )
        .await;
        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_respects_shared_rate_limiter() {
        let start = tokio::time::Instant::now();
        let results = run_bounded(
            chunks(3),
            3,
            Arc::new(RateLimiter::new(2, 0)),
            |text| async move { Ok(text) },
        )
        .await;

        assert_eq!(results.len(), 3);
        // Two chunks clear immediately, the third waits out the window.
        assert!(start.elapsed() >= Duration::from_secs_f64(59.5));
    }
}
