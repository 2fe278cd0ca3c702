//! Consumer facing entry point tying the index to albums, streams and pagers.

use crate::actions::MediaActions;
use crate::albums::AlbumAggregator;
use crate::error::{MediaIndexError, Result};
use crate::filters::{albums_query_args, image_or_video, media_query_args};
use crate::index::{QueryArgs, SharedIndex};
use crate::query::{columns, Query};
use crate::live::LiveQuery;
use crate::mapper::{album_rows_from_cursor, media_from_cursor};
use crate::models::{Album, AlbumKind, ContentUri, Media};
use crate::paging::{MediaPager, PagingConfig};
use crate::platform::PlatformCapabilities;

/// Read and write access to the gallery's media.
///
/// All streams are cold until created and stop when dropped.
#[derive(Clone)]
pub struct MediaRepository {
    index: SharedIndex,
    capabilities: PlatformCapabilities,
    paging: PagingConfig,
    aggregator: AlbumAggregator,
}

impl MediaRepository {
    pub fn new(
        index: SharedIndex,
        capabilities: PlatformCapabilities,
        paging: PagingConfig,
        aggregator: AlbumAggregator,
    ) -> Self {
        Self {
            index,
            capabilities,
            paging,
            aggregator,
        }
    }

    /// Live list of albums, re-aggregated on every index change.
    ///
    /// Only albums with at least one member appear; the all-media album is
    /// never listed.
    pub fn albums(&self) -> LiveQuery<Album> {
        let aggregator = self.aggregator.clone();
        LiveQuery::new(
            self.index.clone(),
            ContentUri::FILES,
            albums_query_args(self.capabilities),
            move |cursor| Ok(aggregator.aggregate(album_rows_from_cursor(cursor)?)),
        )
    }

    /// Live, unpaged media of one album. `None` selects all media.
    pub fn media_stream(&self, bucket_id: Option<i32>) -> LiveQuery<Media> {
        let album = AlbumKind::from_bucket_id(bucket_id);
        tracing::debug!(album = ?album, "Opening media stream");
        LiveQuery::new(
            self.index.clone(),
            ContentUri::FILES,
            media_query_args(album, self.capabilities),
            media_from_cursor,
        )
    }

    /// Paged media of one album. `None` selects all media.
    pub fn media(&self, bucket_id: Option<i32>) -> MediaPager {
        let album = AlbumKind::from_bucket_id(bucket_id);
        tracing::debug!(album = ?album, "Opening media pager");
        MediaPager::new(self.index.clone(), album, self.capabilities, self.paging)
    }

    pub fn actions(&self) -> MediaActions {
        MediaActions::new(self.index.clone(), self.capabilities)
    }

    /// Look up one item by row id, trashed or not.
    pub async fn find(&self, id: i64) -> Result<Option<Media>> {
        let index = self.index.clone();
        let args = QueryArgs {
            projection: columns::MEDIA_PROJECTION,
            selection: Some(image_or_video().and(Query::eq(columns::ID, id)).build()),
            match_trashed: self.capabilities.aggregate_match(),
            ..QueryArgs::default()
        };

        let found = tokio::task::spawn_blocking(move || {
            let cursor = index.query(&ContentUri::FILES, &args)?;
            media_from_cursor(cursor.as_ref())
        })
        .await
        .map_err(|e| MediaIndexError::Query(e.to_string()))??;

        Ok(found.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaIndexError;
    use crate::index::sqlite::tests::new_media;
    use crate::index::testing::{rows_with_media_types, Scripted, ScriptedIndex};
    use crate::index::SqliteMediaIndex;
    use crate::live::Snapshot;
    use crate::models::{MediaType, FAVORITES_BUCKET_ID, TRASH_BUCKET_ID};
    use crate::paging::PagerEvent;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    fn repository(index: SharedIndex) -> MediaRepository {
        repository_on(index, PlatformCapabilities::ATOMIC_TRASH)
    }

    fn repository_on(index: SharedIndex, capabilities: PlatformCapabilities) -> MediaRepository {
        MediaRepository::new(
            index,
            capabilities,
            PagingConfig {
                page_size: 2,
                initial_load_size: 2,
            },
            AlbumAggregator::default(),
        )
    }

    fn seeded() -> Arc<SqliteMediaIndex> {
        seeded_with(true)
    }

    fn seeded_with(atomic_trash_toggle: bool) -> Arc<SqliteMediaIndex> {
        let index = Arc::new(SqliteMediaIndex::open_in_memory(atomic_trash_toggle).unwrap());
        index.insert(&new_media("/dcim/camera/a.jpg", MediaType::Image, 1)).unwrap();
        index.insert(&new_media("/dcim/camera/b.mp4", MediaType::Video, 2)).unwrap();
        index.insert(&new_media("/dcim/screenshots/c.png", MediaType::Image, 3)).unwrap();
        index
    }

    async fn next<T, S>(stream: &mut S) -> Snapshot<T>
    where
        S: futures::Stream<Item = crate::error::Result<Snapshot<T>>> + Unpin,
    {
        tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_albums_follow_mutations() {
        let index = seeded();
        let repo = repository(index.clone());
        let mut albums = repo.albums();

        let initial = next(&mut albums).await;
        assert_eq!(initial.len(), 2);
        assert_eq!(initial.iter().map(|a| a.size).sum::<usize>(), 3);

        let newest = next(&mut repo.media_stream(None)).await[0].clone();
        repo.actions().favorite(&newest, true).await.unwrap();

        let updated = loop {
            let snapshot = next(&mut albums).await;
            if snapshot.iter().any(|a| a.kind == AlbumKind::Favorites) {
                break snapshot;
            }
        };
        let favorites = updated.iter().find(|a| a.kind == AlbumKind::Favorites).unwrap();
        assert_eq!(favorites.size, 1);
        assert_eq!(favorites.thumbnail.id, newest.id);
    }

    #[tokio::test]
    async fn test_media_stream_by_bucket() {
        let index = seeded();
        let repo = repository(index.clone());

        let all = next(&mut repo.media_stream(None)).await;
        assert_eq!(all.len(), 3);

        let camera = all.iter().find(|m| m.mime_type == "video/mp4").unwrap().bucket_id;
        let in_camera = next(&mut repo.media_stream(Some(camera))).await;
        assert_eq!(in_camera.len(), 2);

        repo.actions().trash(&all[0], true).await.unwrap();
        let trash = next(&mut repo.media_stream(Some(TRASH_BUCKET_ID))).await;
        assert_eq!(trash.len(), 1);
        assert!(next(&mut repo.media_stream(Some(FAVORITES_BUCKET_ID))).await.is_empty());
    }

    #[tokio::test]
    async fn test_media_pager_for_album() {
        let repo = repository(seeded());
        let mut pager = repo.media(None);

        assert!(matches!(pager.load_next().await.unwrap(), Some(PagerEvent::Refresh(_))));
        let last = pager.load_next().await.unwrap().unwrap();
        assert_eq!(last.page().data.len(), 1);
        assert_eq!(pager.load_next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_includes_trashed_items() {
        let index = seeded();
        let repo = repository(index.clone());
        let item = next(&mut repo.media_stream(None)).await[0].clone();

        repo.actions().trash(&item, true).await.unwrap();
        let found = repo.find(item.id).await.unwrap().unwrap();
        assert!(found.is_trashed);
        assert!(found.same_item(&item));
        assert_eq!(repo.find(404).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_legacy_albums_count_trashed_rows() {
        let repo = repository_on(seeded_with(false), PlatformCapabilities::LEGACY);
        let mut albums = repo.albums();
        assert_eq!(next(&mut albums).await.len(), 2);

        let video = next(&mut repo.media_stream(None))
            .await
            .iter()
            .find(|m| m.mime_type == "video/mp4")
            .cloned()
            .unwrap();
        repo.actions().trash(&video, true).await.unwrap();

        let updated = loop {
            let snapshot = next(&mut albums).await;
            if snapshot.iter().any(|a| a.kind == AlbumKind::Trash) {
                break snapshot;
            }
        };
        let trash = updated.iter().find(|a| a.kind == AlbumKind::Trash).unwrap();
        assert_eq!(trash.size, 1);
        assert_eq!(trash.thumbnail.id, video.id);
        let camera = updated
            .iter()
            .find(|a| a.kind == AlbumKind::Real(video.bucket_id))
            .unwrap();
        assert_eq!(camera.size, 1);

        assert_eq!(next(&mut repo.media_stream(None)).await.len(), 2);
        let trashed = next(&mut repo.media_stream(Some(TRASH_BUCKET_ID))).await;
        assert_eq!(trashed.len(), 1);
        assert!(trashed[0].is_trashed);
    }

    #[tokio::test]
    async fn test_albums_stream_surfaces_schema_mismatch() {
        let index = ScriptedIndex::new(Scripted::Rows(rows_with_media_types(&[1, 7])));
        let mut albums = repository(index).albums();

        let first = tokio::time::timeout(Duration::from_secs(5), albums.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first, Err(MediaIndexError::SchemaMismatch { .. })));
    }
}
