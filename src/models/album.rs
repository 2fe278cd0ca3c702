//! Album summaries and the synthetic album identifiers.

use super::media::Media;

/// Reserved bucket id of the favorites album.
pub const FAVORITES_BUCKET_ID: i32 = i32::MIN;
/// Reserved bucket id of the trash album.
pub const TRASH_BUCKET_ID: i32 = i32::MIN + 1;
/// Reserved bucket id of the "all media" pseudo-album.
pub const ALL_MEDIA_BUCKET_ID: i32 = i32::MIN + 2;

/// Which album a selection refers to.
///
/// Synthetic albums have no backing row on the index; they only become
/// integers at the query boundary via [`AlbumKind::bucket_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlbumKind {
    /// A real folder bucket reported by the index.
    Real(i32),
    Favorites,
    Trash,
    AllMedia,
}

impl AlbumKind {
    /// Resolve an optional bucket id; `None` selects every media item.
    pub fn from_bucket_id(bucket_id: Option<i32>) -> Self {
        match bucket_id {
            None | Some(ALL_MEDIA_BUCKET_ID) => AlbumKind::AllMedia,
            Some(FAVORITES_BUCKET_ID) => AlbumKind::Favorites,
            Some(TRASH_BUCKET_ID) => AlbumKind::Trash,
            Some(id) => AlbumKind::Real(id),
        }
    }

    pub fn bucket_id(&self) -> i32 {
        match self {
            AlbumKind::Real(id) => *id,
            AlbumKind::Favorites => FAVORITES_BUCKET_ID,
            AlbumKind::Trash => TRASH_BUCKET_ID,
            AlbumKind::AllMedia => ALL_MEDIA_BUCKET_ID,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self, AlbumKind::Real(_))
    }

    /// Albums a media item contributes to.
    ///
    /// A trashed item counts towards the trash instead of its folder; a
    /// favorite item additionally counts towards favorites, trashed or not.
    pub fn memberships(media: &Media) -> impl Iterator<Item = AlbumKind> {
        let primary = if media.is_trashed {
            AlbumKind::Trash
        } else {
            AlbumKind::Real(media.bucket_id)
        };
        let favorite = media.is_favorite.then_some(AlbumKind::Favorites);
        std::iter::once(primary).chain(favorite)
    }
}

impl From<i32> for AlbumKind {
    fn from(bucket_id: i32) -> Self {
        AlbumKind::from_bucket_id(Some(bucket_id))
    }
}

/// Display names for synthetic albums and unnamed folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumNames {
    pub favorites: String,
    pub trash: String,
    pub all_media: String,
    /// Used for folders the index reports without a display name.
    pub device_model: String,
}

impl AlbumNames {
    pub fn resolve(&self, kind: AlbumKind, bucket_display_name: Option<&str>) -> String {
        match kind {
            AlbumKind::Favorites => self.favorites.clone(),
            AlbumKind::Trash => self.trash.clone(),
            AlbumKind::AllMedia => self.all_media.clone(),
            AlbumKind::Real(_) => bucket_display_name
                .map(str::to_string)
                .unwrap_or_else(|| self.device_model.clone()),
        }
    }
}

impl Default for AlbumNames {
    fn default() -> Self {
        Self {
            favorites: "Favorites".to_string(),
            trash: "Trash".to_string(),
            all_media: "All media".to_string(),
            device_model: "Device".to_string(),
        }
    }
}

/// Summary of one album as of the latest aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub kind: AlbumKind,
    pub name: String,
    /// Number of media items mapped into this album.
    pub size: usize,
    /// Representative media shown as the album cover.
    pub thumbnail: Media,
}

impl Album {
    pub fn new(kind: AlbumKind, name: String, thumbnail: Media) -> Self {
        Self {
            kind,
            name,
            size: 0,
            thumbnail,
        }
    }

    pub fn id(&self) -> i32 {
        self.kind.bucket_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::tests::media;

    #[test]
    fn test_reserved_ids_round_trip() {
        for kind in [AlbumKind::Favorites, AlbumKind::Trash, AlbumKind::AllMedia] {
            assert_eq!(AlbumKind::from(kind.bucket_id()), kind);
            assert!(kind.is_synthetic());
        }
        assert_eq!(AlbumKind::from_bucket_id(None), AlbumKind::AllMedia);
        assert_eq!(AlbumKind::from(12), AlbumKind::Real(12));
    }

    #[test]
    fn test_memberships() {
        let plain: Vec<_> = AlbumKind::memberships(&media(1, 10, false, false)).collect();
        assert_eq!(plain, vec![AlbumKind::Real(10)]);

        let favorite: Vec<_> = AlbumKind::memberships(&media(2, 10, true, false)).collect();
        assert_eq!(favorite, vec![AlbumKind::Real(10), AlbumKind::Favorites]);

        let trashed: Vec<_> = AlbumKind::memberships(&media(3, 10, false, true)).collect();
        assert_eq!(trashed, vec![AlbumKind::Trash]);

        let both: Vec<_> = AlbumKind::memberships(&media(4, 20, true, true)).collect();
        assert_eq!(both, vec![AlbumKind::Trash, AlbumKind::Favorites]);
    }

    #[test]
    fn test_name_resolution() {
        let names = AlbumNames {
            device_model: "Pixel".to_string(),
            ..AlbumNames::default()
        };
        assert_eq!(names.resolve(AlbumKind::Favorites, Some("Camera")), "Favorites");
        assert_eq!(names.resolve(AlbumKind::Real(3), Some("Camera")), "Camera");
        assert_eq!(names.resolve(AlbumKind::Real(3), None), "Pixel");
    }
}
