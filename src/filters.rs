//! Query composition for media and album selections.

use crate::index::QueryArgs;
use crate::models::{AlbumKind, MediaType};
use crate::platform::PlatformCapabilities;
use crate::query::{columns, Query};

/// Images or videos; other indexed files are never surfaced.
pub fn image_or_video() -> Query {
    Query::eq(columns::MEDIA_TYPE, MediaType::INDEX_IMAGE)
        .or(Query::eq(columns::MEDIA_TYPE, MediaType::INDEX_VIDEO))
}

/// Predicate restricting media to `album`, if any.
///
/// On the legacy model trash visibility is purely a predicate on
/// `is_trashed`; on the atomic model it is left to the match mode.
pub fn album_filter(album: AlbumKind, capabilities: PlatformCapabilities) -> Option<Query> {
    let legacy = !capabilities.supports_atomic_trash_toggle;
    let not_trashed = || Query::eq(columns::IS_TRASHED, 0);

    match album {
        AlbumKind::Trash if legacy => Some(Query::eq(columns::IS_TRASHED, 1)),
        AlbumKind::Trash => None,
        AlbumKind::Favorites => {
            let favorite = Query::eq(columns::IS_FAVORITE, 1);
            Some(if legacy { favorite.and(not_trashed()) } else { favorite })
        }
        AlbumKind::Real(bucket_id) => {
            let bucket = Query::eq(columns::BUCKET_ID, bucket_id);
            Some(if legacy { bucket.and(not_trashed()) } else { bucket })
        }
        AlbumKind::AllMedia => legacy.then(not_trashed),
    }
}

/// Query for the media of `album`, newest first.
pub fn media_query_args(album: AlbumKind, capabilities: PlatformCapabilities) -> QueryArgs {
    let selection = match album_filter(album, capabilities) {
        Some(filter) => image_or_video().and(filter),
        None => image_or_video(),
    };
    QueryArgs {
        projection: columns::MEDIA_PROJECTION,
        selection: Some(selection.build()),
        sort_order: Some(columns::SORT_DATE_ADDED_DESC),
        match_trashed: capabilities.query_match(album),
        ..QueryArgs::default()
    }
}

/// Query for every media item, trashed ones included, for album aggregation.
pub fn albums_query_args(capabilities: PlatformCapabilities) -> QueryArgs {
    QueryArgs {
        projection: columns::ALBUMS_PROJECTION,
        selection: Some(image_or_video().build()),
        sort_order: Some(columns::SORT_DATE_ADDED_DESC),
        match_trashed: capabilities.aggregate_match(),
        ..QueryArgs::default()
    }
}
