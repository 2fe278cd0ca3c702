//! Media record and its content location.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{MediaIndexError, Result};

/// Kind of media item. Only images and videos are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// `media_type` code the index stores for images.
    pub const INDEX_IMAGE: i64 = 1;
    /// `media_type` code the index stores for videos.
    pub const INDEX_VIDEO: i64 = 3;

    /// Decode the index `media_type` column.
    ///
    /// Any other value means the index schema does not match this model.
    pub fn from_index_value(value: i64) -> Result<Self> {
        match value {
            Self::INDEX_IMAGE => Ok(MediaType::Image),
            Self::INDEX_VIDEO => Ok(MediaType::Video),
            _ => Err(MediaIndexError::SchemaMismatch {
                column: "media_type",
                value,
            }),
        }
    }

    pub fn index_value(&self) -> i64 {
        match self {
            MediaType::Image => Self::INDEX_IMAGE,
            MediaType::Video => Self::INDEX_VIDEO,
        }
    }

    /// Collection this media type lives in on the index.
    pub fn collection(&self) -> Collection {
        match self {
            MediaType::Image => Collection::Images,
            MediaType::Video => Collection::Videos,
        }
    }
}

/// Top-level collections exposed by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    /// Every indexed file, media or not.
    Files,
    Images,
    Videos,
}

impl Collection {
    fn path(&self) -> &'static str {
        match self {
            Collection::Files => "file",
            Collection::Images => "images/media",
            Collection::Videos => "video/media",
        }
    }
}

/// Location of a collection or of a single row on the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentUri {
    collection: Collection,
    id: Option<i64>,
}

impl ContentUri {
    /// All indexed files. Observers here see every change.
    pub const FILES: ContentUri = ContentUri::collection(Collection::Files);

    pub const fn collection(collection: Collection) -> Self {
        Self {
            collection,
            id: None,
        }
    }

    /// Location of a single row inside `collection`.
    pub const fn with_appended_id(collection: Collection, id: i64) -> Self {
        Self {
            collection,
            id: Some(id),
        }
    }

    pub fn collection_kind(&self) -> Collection {
        self.collection
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Whether a change at `other` is at or under this location.
    pub fn contains(&self, other: &ContentUri) -> bool {
        let collection_matches =
            self.collection == Collection::Files || self.collection == other.collection;
        match self.id {
            None => collection_matches,
            Some(id) => other.id == Some(id) && collection_matches,
        }
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content://media/external/{}", self.collection.path())?;
        if let Some(id) = self.id {
            write!(f, "/{}", id)?;
        }
        Ok(())
    }
}

/// Cache key for decoded images of a media item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaSignature {
    pub mime_type: String,
    pub date_modified: i64,
    pub orientation: i32,
}

/// A single indexed image or video.
///
/// Records are rebuilt on every query; a newer record with the same `id`
/// supersedes an older one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Media {
    pub id: i64,
    pub bucket_id: i32,
    pub is_favorite: bool,
    pub is_trashed: bool,
    pub media_type: MediaType,
    pub mime_type: String,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    /// Rotation in degrees: 0, 90, 180 or 270.
    pub orientation: i32,
    external_content_uri: ContentUri,
}

impl Media {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        bucket_id: i32,
        is_favorite: bool,
        is_trashed: bool,
        media_type: MediaType,
        mime_type: impl Into<String>,
        date_added: DateTime<Utc>,
        date_modified: DateTime<Utc>,
        orientation: i32,
    ) -> Self {
        Self {
            id,
            bucket_id,
            is_favorite,
            is_trashed,
            media_type,
            mime_type: mime_type.into(),
            date_added,
            date_modified,
            orientation,
            external_content_uri: ContentUri::with_appended_id(media_type.collection(), id),
        }
    }

    /// Location of this item's row, derived from `media_type` and `id`.
    pub fn external_content_uri(&self) -> ContentUri {
        self.external_content_uri
    }

    pub fn signature(&self) -> MediaSignature {
        MediaSignature {
            mime_type: self.mime_type.clone(),
            date_modified: self.date_modified.timestamp_millis() * 1000,
            orientation: self.orientation,
        }
    }

    /// Same underlying item, possibly with different attributes.
    pub fn same_item(&self, other: &Media) -> bool {
        self.id == other.id
    }
}

impl Ord for Media {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.external_content_uri.cmp(&other.external_content_uri))
            .then_with(|| self.bucket_id.cmp(&other.bucket_id))
            .then_with(|| self.is_favorite.cmp(&other.is_favorite))
            .then_with(|| self.is_trashed.cmp(&other.is_trashed))
            .then_with(|| self.media_type.cmp(&other.media_type))
            .then_with(|| self.mime_type.cmp(&other.mime_type))
            .then_with(|| self.date_added.cmp(&other.date_added))
            .then_with(|| self.date_modified.cmp(&other.date_modified))
            .then_with(|| self.orientation.cmp(&other.orientation))
    }
}

impl PartialOrd for Media {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn media(id: i64, bucket_id: i32, favorite: bool, trashed: bool) -> Media {
        let added = DateTime::from_timestamp(1_700_000_000 + id, 0).unwrap();
        Media::new(
            id,
            bucket_id,
            favorite,
            trashed,
            MediaType::Image,
            "image/jpeg",
            added,
            added,
            0,
        )
    }

    #[test]
    fn test_media_type_from_index_value() {
        assert_eq!(MediaType::from_index_value(1).unwrap(), MediaType::Image);
        assert_eq!(MediaType::from_index_value(3).unwrap(), MediaType::Video);
        assert_eq!(
            MediaType::from_index_value(2),
            Err(MediaIndexError::SchemaMismatch {
                column: "media_type",
                value: 2
            })
        );
    }

    #[test]
    fn test_uri_derived_from_type_and_id() {
        let image = media(42, 1, false, false);
        assert_eq!(
            image.external_content_uri().to_string(),
            "content://media/external/images/media/42"
        );

        let video = Media::new(
            image.id,
            image.bucket_id,
            false,
            false,
            MediaType::Video,
            "video/mp4",
            image.date_added,
            image.date_modified,
            0,
        );
        assert_eq!(
            video.external_content_uri(),
            ContentUri::with_appended_id(Collection::Videos, 42)
        );
    }

    #[test]
    fn test_uri_containment() {
        let row = ContentUri::with_appended_id(Collection::Images, 7);
        assert!(ContentUri::FILES.contains(&row));
        assert!(ContentUri::collection(Collection::Images).contains(&row));
        assert!(!ContentUri::collection(Collection::Videos).contains(&row));
        assert!(row.contains(&row));
        assert!(!row.contains(&ContentUri::with_appended_id(Collection::Images, 8)));
    }

    #[test]
    fn test_ordering_is_total_and_id_first() {
        let a = media(1, 50, true, false);
        let b = media(2, 10, false, false);
        assert!(a < b);

        let mut favorite = a.clone();
        favorite.is_favorite = false;
        assert_ne!(a, favorite);
        assert!(favorite < a);
    }

    #[test]
    fn test_signature_scales_modified_time() {
        let item = media(3, 1, false, false);
        let signature = item.signature();
        assert_eq!(signature.date_modified, 1_700_000_003_000 * 1000);
        assert_eq!(signature.mime_type, "image/jpeg");
    }
}
