use std::{sync::Arc, time::Duration};

use chrono::Local;
use futures::{stream, Stream, StreamExt};
use tracing::{debug, warn};

use crate::parse::CatalogPage;
use crate::request::{CatalogSource, PageQuery};
use crate::{info_time, FetchError};

/// Why a collection run stopped pulling pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    /// The catalog had no further pages.
    Exhausted,
    TimedOut,
    Failed(String),
}

impl StopReason {
    /// True when the run was cut short by the catalog rather than finishing normally.
    pub fn is_partial(&self) -> bool {
        matches!(self, StopReason::TimedOut | StopReason::Failed(_))
    }
}

/// Result of one collection run: ids in catalog order, never more than the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub ids: Vec<u64>,
    pub stop: StopReason,
}

/// Where the page stream is in the cursor protocol.
enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazily fetches catalog pages, following `nextPageCursor`.
///
/// The stream ends after the last page (no cursor) or right after yielding the first error,
/// so it is finite and can't be restarted. Every page after the first is preceded by `delay`,
/// which is only paid when the consumer actually asks for another page.
pub fn pages(
    source: Arc<dyn CatalogSource>,
    query: PageQuery,
    delay: Duration,
) -> impl Stream<Item = Result<CatalogPage, FetchError>> {
    stream::unfold(Cursor::Start, move |state| {
        let source = source.clone();
        let query = query.clone();
        async move {
            let cursor = match state {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Next(cursor) => {
                    tokio::time::sleep(delay).await;
                    Some(cursor)
                }
            };

            debug!(taxonomy = %query.taxonomy, cursor = ?cursor, "requesting page");
            match source.fetch_page(&query, cursor.as_deref()).await {
                Ok(page) => {
                    let next = match page.next_cursor() {
                        Some(next) => Cursor::Next(next.to_string()),
                        None => Cursor::Done,
                    };
                    Some((Ok(page), next))
                }
                Err(e) => Some((Err(e), Cursor::Done)),
            }
        }
    })
}

/// Collects up to `target_count` item ids for `taxonomy_id`.
///
/// Upstream failures never escape: a timeout or failed page ends the run and whatever was
/// collected so far (possibly nothing) is returned.
pub async fn collect(
    source: Arc<dyn CatalogSource>,
    taxonomy_id: &str,
    target_count: usize,
    delay: Duration,
) -> Collection {
    let start_time = Local::now();
    let mut ids = Vec::with_capacity(target_count);

    let stop = if target_count == 0 {
        StopReason::TargetReached
    } else {
        let pages = pages(source, PageQuery::new(taxonomy_id), delay);
        futures::pin_mut!(pages);

        let mut stop = StopReason::Exhausted;
        while let Some(page) = pages.next().await {
            match page {
                Ok(page) => {
                    let remaining = target_count - ids.len();
                    ids.extend(page.item_ids().take(remaining));
                    debug!(taxonomy_id, collected = ids.len(), "received page");
                    if ids.len() >= target_count {
                        stop = StopReason::TargetReached;
                        break;
                    }
                }
                Err(FetchError::Timeout) => {
                    warn!(taxonomy_id, "Request timeout, collected {} IDs so far", ids.len());
                    stop = StopReason::TimedOut;
                    break;
                }
                Err(e) => {
                    warn!(taxonomy_id, "Request error: {e}");
                    stop = StopReason::Failed(e.to_string());
                    break;
                }
            }
        }
        stop
    };

    ids.truncate(target_count);
    info_time!(
        start_time,
        "Collected {} ids for taxonomy {}, stopped: {:?}",
        ids.len(),
        taxonomy_id,
        stop
    );
    Collection { ids, stop }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Instant;

    use async_trait::async_trait;

    use super::*;
    use crate::parse::CatalogItem;

    /// Hands out canned pages in order and remembers which cursors were asked for, and when.
    #[derive(Default)]
    struct FakeSource {
        responses: Mutex<VecDeque<Result<CatalogPage, FetchError>>>,
        cursors: Mutex<Vec<Option<String>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl FakeSource {
        fn new(responses: Vec<Result<CatalogPage, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                cursors: Mutex::default(),
                calls: Mutex::default(),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }

        fn requested(&self) -> Vec<Option<String>> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogSource for FakeSource {
        async fn fetch_page(
            &self,
            _query: &PageQuery,
            cursor: Option<&str>,
        ) -> Result<CatalogPage, FetchError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.cursors.lock().unwrap().push(cursor.map(String::from));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Transport("no more canned pages".into())))
        }
    }

    fn page(ids: std::ops::Range<u64>, next: Option<&str>) -> Result<CatalogPage, FetchError> {
        Ok(CatalogPage {
            data: ids.map(|id| CatalogItem { id: Some(id) }).collect(),
            next_page_cursor: next.map(String::from),
        })
    }

    async fn run(source: &Arc<FakeSource>, target: usize) -> Collection {
        collect(source.clone(), "200", target, Duration::ZERO).await
    }

    #[tokio::test]
    async fn follows_cursors_until_the_last_page() {
        let source = FakeSource::new(vec![
            page(0..120, Some("c1")),
            page(120..240, Some("c2")),
            page(240..300, None),
        ]);

        let res = run(&source, 500).await;

        assert_eq!(res.ids, (0..300).collect::<Vec<_>>());
        assert_eq!(res.stop, StopReason::Exhausted);
        assert_eq!(
            source.requested(),
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[tokio::test]
    async fn truncates_mid_page_and_stops_requesting() {
        let source = FakeSource::new(vec![
            page(0..120, Some("c1")),
            page(120..240, Some("c2")),
            page(240..360, Some("c3")),
        ]);

        let res = run(&source, 250).await;

        assert_eq!(res.ids.len(), 250);
        assert_eq!(res.ids.last(), Some(&249));
        assert_eq!(res.stop, StopReason::TargetReached);
        assert_eq!(source.requested().len(), 3);
    }

    #[tokio::test]
    async fn single_big_page_fills_the_target() {
        let source = FakeSource::new(vec![page(0..500, Some("more"))]);

        let res = run(&source, 500).await;

        assert_eq!(res.ids.len(), 500);
        assert_eq!(res.stop, StopReason::TargetReached);
        assert_eq!(source.requested(), vec![None]);
    }

    #[tokio::test]
    async fn timeout_on_first_page_returns_empty() {
        let source = FakeSource::new(vec![Err(FetchError::Timeout)]);

        let res = run(&source, 500).await;

        assert!(res.ids.is_empty());
        assert_eq!(res.stop, StopReason::TimedOut);
        assert!(res.stop.is_partial());
    }

    #[tokio::test]
    async fn failure_keeps_what_was_collected() {
        let source = FakeSource::new(vec![
            page(0..120, Some("c1")),
            Err(FetchError::Status(503)),
            page(120..240, None),
        ]);

        let res = run(&source, 500).await;

        assert_eq!(res.ids, (0..120).collect::<Vec<_>>());
        assert_eq!(
            res.stop,
            StopReason::Failed("catalog responded with status 503".to_string())
        );
        // The page after the failure is never requested.
        assert_eq!(source.requested().len(), 2);
    }

    #[tokio::test]
    async fn duplicates_across_pages_are_kept() {
        let source = FakeSource::new(vec![page(0..3, Some("c1")), page(2..4, None)]);

        let res = run(&source, 500).await;

        assert_eq!(res.ids, vec![0, 1, 2, 2, 3]);
    }

    #[tokio::test]
    async fn zero_target_makes_no_requests() {
        let source = FakeSource::new(vec![page(0..10, None)]);

        let res = run(&source, 0).await;

        assert!(res.ids.is_empty());
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn page_stream_ends_after_an_error() {
        let source = FakeSource::new(vec![page(0..1, Some("c1")), Err(FetchError::Timeout)]);
        let items: Vec<_> = pages(source.clone(), PageQuery::new("200"), Duration::ZERO)
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(FetchError::Timeout));
        assert_eq!(source.requested().len(), 2);
    }

    #[tokio::test]
    async fn waits_between_pages_but_not_after_the_last() {
        let delay = Duration::from_millis(150);
        let source = FakeSource::new(vec![
            page(0..10, Some("c1")),
            page(10..20, Some("c2")),
            page(20..30, None),
        ]);

        let res = collect(source.clone(), "200", 500, delay).await;
        let done = Instant::now();

        assert_eq!(res.ids.len(), 30);
        let calls = source.call_times();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= delay, "gap {:?}", pair[1] - pair[0]);
        }
        assert!(done - calls[2] < delay, "waited {:?} after the last page", done - calls[2]);
    }

    #[tokio::test]
    async fn no_wait_once_the_target_is_reached() {
        let delay = Duration::from_millis(150);
        let source = FakeSource::new(vec![page(0..10, Some("c1")), page(10..20, Some("c2"))]);

        let res = collect(source.clone(), "200", 15, delay).await;
        let done = Instant::now();

        assert_eq!(res.stop, StopReason::TargetReached);
        let calls = source.call_times();
        assert_eq!(calls.len(), 2);
        assert!(calls[1] - calls[0] >= delay);
        assert!(done - calls[1] < delay, "waited {:?} after the target", done - calls[1]);
    }
}
