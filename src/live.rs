//! Live query streams.
//!
//! A [`LiveQuery`] runs a query once on creation and again every time the
//! index reports a change at the queried location. Results are published
//! through a watch channel, so a slow consumer only ever sees the latest
//! snapshot: intermediate snapshots may be skipped, the newest never is.
//!
//! Query failures and absent cursors publish an empty snapshot. A mapping
//! error that marks a schema mismatch is published once and ends the stream.

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::Result;
use crate::index::{ChangeSubscription, QueryArgs, ResultSet, SharedIndex};
use crate::models::ContentUri;

/// One complete query result.
pub type Snapshot<T> = Arc<Vec<T>>;

type Mapper<T> = dyn Fn(Option<&ResultSet>) -> Result<Vec<T>> + Send + Sync;

/// A restartable, conflated sequence of query snapshots.
///
/// Dropping the stream (or cancelling the token it was created with)
/// unregisters its change observer immediately. A query already running is
/// allowed to finish; its result is discarded.
pub struct LiveQuery<T> {
    snapshots: WatchStream<Result<Snapshot<T>>>,
    _guard: DropGuard,
}

impl<T> LiveQuery<T>
where
    T: Send + Sync + 'static,
{
    /// Start observing `uri`. Must be called within a Tokio runtime.
    pub fn new<F>(index: SharedIndex, uri: ContentUri, args: QueryArgs, map: F) -> Self
    where
        F: Fn(Option<&ResultSet>) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        Self::with_cancellation(index, uri, args, map, CancellationToken::new())
    }

    /// Like [`LiveQuery::new`], stopping when `cancel` fires.
    pub fn with_cancellation<F>(
        index: SharedIndex,
        uri: ContentUri,
        args: QueryArgs,
        map: F,
        cancel: CancellationToken,
    ) -> Self
    where
        F: Fn(Option<&ResultSet>) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        let token = cancel.child_token();
        // Register before the first query so no change in between is lost.
        let subscription = index.subscribe(&uri, token.clone());
        let (tx, rx) = watch::channel(Ok(Arc::new(Vec::new())));

        let worker = Worker {
            index,
            uri,
            args,
            map: Arc::new(map),
        };
        tokio::spawn(worker.run(subscription, tx));

        Self {
            snapshots: WatchStream::from_changes(rx),
            _guard: token.drop_guard(),
        }
    }
}

impl<T> Stream for LiveQuery<T>
where
    T: Send + Sync + 'static,
{
    type Item = Result<Snapshot<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().snapshots.poll_next_unpin(cx)
    }
}

struct Worker<T> {
    index: SharedIndex,
    uri: ContentUri,
    args: QueryArgs,
    map: Arc<Mapper<T>>,
}

impl<T> Worker<T>
where
    T: Send + Sync + 'static,
{
    async fn run(self, mut subscription: ChangeSubscription, tx: watch::Sender<Result<Snapshot<T>>>) {
        loop {
            // Signals that arrived before this execution are covered by it.
            subscription.drain();
            let snapshot = self.execute().await;
            let fatal = snapshot.is_err();
            if subscription.is_cancelled() || tx.send(snapshot).is_err() {
                break;
            }
            if fatal {
                break;
            }
            if !subscription.changed().await {
                break;
            }
            tracing::trace!(uri = %self.uri, "Index changed, re-running query");
        }
        tracing::debug!(uri = %self.uri, "Live query stopped");
    }

    async fn execute(&self) -> Result<Snapshot<T>> {
        let index = self.index.clone();
        let uri = self.uri;
        let args = self.args.clone();
        let map = self.map.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let cursor = match index.query(&uri, &args) {
                Ok(cursor) => cursor,
                Err(e) => {
                    tracing::warn!(uri = %uri, error = %e, "Query failed, publishing empty snapshot");
                    None
                }
            };
            map(cursor.as_ref())
        })
        .await;

        match joined {
            Ok(Ok(records)) => Ok(Arc::new(records)),
            Ok(Err(e)) => {
                tracing::error!(uri = %self.uri, error = %e, "Failed to map query result");
                if e.is_fatal() {
                    Err(e)
                } else {
                    Ok(Arc::new(Vec::new()))
                }
            }
            Err(e) => {
                tracing::error!(uri = %self.uri, error = %e, "Query task failed");
                Ok(Arc::new(Vec::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaIndexError;
    use crate::index::sqlite::tests::new_media;
    use crate::index::testing::{rows_with_media_types, Scripted, ScriptedIndex};
    use crate::index::SqliteMediaIndex;
    use crate::mapper::media_from_cursor;
    use crate::models::{Media, MediaType};
    use crate::query::columns;
    use std::time::Duration;

    fn all_media_args() -> QueryArgs {
        QueryArgs {
            projection: columns::MEDIA_PROJECTION,
            sort_order: Some(columns::SORT_DATE_ADDED_DESC),
            ..QueryArgs::default()
        }
    }

    async fn next<T: Send + Sync + 'static>(live: &mut LiveQuery<T>) -> Option<Result<Snapshot<T>>> {
        tokio::time::timeout(Duration::from_secs(5), live.next())
            .await
            .expect("live query did not emit in time")
    }

    #[tokio::test]
    async fn test_emits_initial_snapshot_then_changes() {
        let index = Arc::new(SqliteMediaIndex::open_in_memory(true).unwrap());
        index.insert(&new_media("/dcim/a.jpg", MediaType::Image, 1)).unwrap();

        let mut live: LiveQuery<Media> =
            LiveQuery::new(index.clone(), ContentUri::FILES, all_media_args(), media_from_cursor);
        assert_eq!(next(&mut live).await.unwrap().unwrap().len(), 1);

        index.insert(&new_media("/dcim/b.jpg", MediaType::Image, 2)).unwrap();
        let snapshot = next(&mut live).await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].date_added.timestamp(), 2);
    }

    #[tokio::test]
    async fn test_conflates_bursts_to_latest() {
        let index = Arc::new(SqliteMediaIndex::open_in_memory(true).unwrap());
        let mut live: LiveQuery<Media> =
            LiveQuery::new(index.clone(), ContentUri::FILES, all_media_args(), media_from_cursor);
        assert!(next(&mut live).await.unwrap().unwrap().is_empty());

        let k = 25;
        for i in 0..k {
            index
                .insert(&new_media(&format!("/dcim/{}.jpg", i), MediaType::Image, i))
                .unwrap();
        }

        let mut emissions = 0;
        loop {
            let snapshot = next(&mut live).await.unwrap().unwrap();
            emissions += 1;
            if snapshot.len() == k as usize {
                break;
            }
        }
        assert!(emissions < k as usize + 1);
    }

    #[tokio::test]
    async fn test_absent_cursor_and_failure_give_empty_snapshots() {
        let index = ScriptedIndex::new(Scripted::Absent);
        let mut live: LiveQuery<Media> =
            LiveQuery::new(index.clone(), ContentUri::FILES, all_media_args(), media_from_cursor);
        assert!(next(&mut live).await.unwrap().unwrap().is_empty());

        index.set(Scripted::Rows(rows_with_media_types(&[1, 3])));
        assert_eq!(next(&mut live).await.unwrap().unwrap().len(), 2);

        index.set(Scripted::Fail);
        assert!(next(&mut live).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schema_mismatch_ends_stream() {
        let index = ScriptedIndex::new(Scripted::Rows(rows_with_media_types(&[1, 42])));
        let mut live: LiveQuery<Media> =
            LiveQuery::new(index.clone(), ContentUri::FILES, all_media_args(), media_from_cursor);

        let first = next(&mut live).await.unwrap();
        assert!(matches!(first, Err(MediaIndexError::SchemaMismatch { value: 42, .. })));
        assert!(next(&mut live).await.is_none());
    }

    #[tokio::test]
    async fn test_drop_unregisters_observer() {
        let index = ScriptedIndex::new(Scripted::Absent);
        let mut live: LiveQuery<Media> =
            LiveQuery::new(index.clone(), ContentUri::FILES, all_media_args(), media_from_cursor);
        next(&mut live).await;
        assert_eq!(index.observer_count(), 1);

        drop(live);
        assert_eq!(index.observer_count(), 0);

        let queries = index.queries();
        index.set(Scripted::Absent);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(index.queries(), queries);
    }

    #[tokio::test]
    async fn test_external_cancellation_stops_stream() {
        let index = ScriptedIndex::new(Scripted::Absent);
        let cancel = CancellationToken::new();
        let mut live: LiveQuery<Media> = LiveQuery::with_cancellation(
            index.clone(),
            ContentUri::FILES,
            all_media_args(),
            media_from_cursor,
            cancel.clone(),
        );
        next(&mut live).await;

        cancel.cancel();
        assert_eq!(index.observer_count(), 0);
        assert!(next(&mut live).await.is_none());
    }
}
