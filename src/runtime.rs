use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Error;
use crate::screen::{BackfillOutcome, Effect, RequestId, ScreenEvent};
use crate::sort::SortMode;
use crate::tmdb::MovieApi;

/// Sticky cancellation flag shared between a screen and its background work.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        CancelToken { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Fetches the full record for `id` on a blocking thread and waits for it,
/// giving up after `timeout` or when `cancel` fires. The blocking call itself
/// can't be interrupted; its late result is discarded.
pub async fn backfill(
    api: Arc<dyn MovieApi>,
    id: u32,
    timeout: Duration,
    cancel: CancelToken,
) -> BackfillOutcome {
    let fetch = tokio::task::spawn_blocking(move || api.fetch_movie(id));

    tokio::select! {
        _ = cancel.cancelled() => BackfillOutcome::Cancelled,
        joined = tokio::time::timeout(timeout, fetch) => match joined {
            Err(_) => BackfillOutcome::TimedOut,
            Ok(Err(err)) => BackfillOutcome::Failed(err.to_string()),
            Ok(Ok(Err(err))) => BackfillOutcome::Failed(err.to_string()),
            Ok(Ok(Ok(movie))) => BackfillOutcome::Fetched(movie),
        },
    }
}

/// Runs the network effects of a screen on a tokio runtime and posts the
/// results to an event channel drained on the main context.
pub struct TaskRunner {
    runtime: Option<Runtime>,
    api: Arc<dyn MovieApi>,
    events: Sender<ScreenEvent>,
    backfill_timeout: Duration,
}

impl TaskRunner {
    pub fn new(
        api: Arc<dyn MovieApi>,
        backfill_timeout: Duration,
    ) -> io::Result<(Self, Receiver<ScreenEvent>)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("movies-net")
            .enable_time()
            .build()?;
        let (events, receiver) = async_channel::unbounded();
        Ok((
            TaskRunner {
                runtime: Some(runtime),
                api,
                events,
                backfill_timeout,
            },
            receiver,
        ))
    }

    /// Starts the background part of `effect`. Returns false for effects the
    /// host has to handle itself.
    pub fn spawn(&self, effect: &Effect, cancel: &CancelToken) -> bool {
        match *effect {
            Effect::FetchList { mode, request } => {
                self.fetch_list(mode, request, cancel.clone());
                true
            }
            Effect::Backfill { id, request } => {
                self.backfill(id, request, cancel.clone());
                true
            }
            _ => false,
        }
    }

    fn fetch_list(&self, mode: SortMode, request: RequestId, cancel: CancelToken) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        let api = self.api.clone();
        let events = self.events.clone();
        runtime.spawn(async move {
            let joined = tokio::task::spawn_blocking(move || api.fetch_movies(mode)).await;
            if cancel.is_cancelled() {
                debug!("list #{request} finished after teardown; discarded");
                return;
            }
            let result = joined.unwrap_or_else(|err| Err(Error::Task(err.to_string())));
            if events
                .send(ScreenEvent::MoviesFetched { request, result })
                .await
                .is_err()
            {
                warn!("screen event channel closed; list #{request} dropped");
            }
        });
    }

    fn backfill(&self, id: u32, request: RequestId, cancel: CancelToken) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        let api = self.api.clone();
        let events = self.events.clone();
        let timeout = self.backfill_timeout;
        runtime.spawn(async move {
            let outcome = backfill(api, id, timeout, cancel).await;
            if events
                .send(ScreenEvent::BackfillFinished { request, outcome })
                .await
                .is_err()
            {
                warn!("screen event channel closed; backfill #{request} dropped");
            }
        });
    }

    /// Sender for events produced outside the runtime, such as favorites
    /// snapshots.
    pub fn events(&self) -> Sender<ScreenEvent> {
        self.events.clone()
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        // Don't wait on HTTP calls still blocking a worker.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::movie::Movie;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowApi {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MovieApi for SlowApi {
        fn fetch_movies(&self, _mode: SortMode) -> Result<Vec<Movie>> {
            Ok(Vec::new())
        }

        fn fetch_movie(&self, id: u32) -> Result<Movie> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if id == 0 {
                return Err(Error::NotFound(id));
            }
            Ok(Movie {
                backdrop_path: Some("/full.jpg".to_string()),
                ..Movie::partial(id, "Full", "/p.jpg")
            })
        }
    }

    fn api(delay_ms: u64) -> Arc<SlowApi> {
        Arc::new(SlowApi {
            delay: Duration::from_millis(delay_ms),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_backfill_fetches_once() {
        let api = api(0);
        let outcome = backfill(api.clone(), 42, Duration::from_secs(5), CancelToken::new()).await;
        assert!(matches!(outcome, BackfillOutcome::Fetched(ref m) if m.id == 42 && !m.is_partial()));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backfill_times_out() {
        let outcome = backfill(api(500), 42, Duration::from_millis(20), CancelToken::new()).await;
        assert!(matches!(outcome, BackfillOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_backfill_honours_cancel() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = backfill(api(500), 42, Duration::from_secs(5), cancel).await;
        assert!(matches!(outcome, BackfillOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_backfill_reports_api_error() {
        let outcome = backfill(api(0), 0, Duration::from_secs(5), CancelToken::new()).await;
        assert!(matches!(outcome, BackfillOutcome::Failed(_)));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_runner_ignores_host_effects() {
        let (runner, _events) = TaskRunner::new(api(0), Duration::from_secs(1)).unwrap();
        assert!(!runner.spawn(&Effect::Render(Vec::new()), &CancelToken::new()));
    }
}
