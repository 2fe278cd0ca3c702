//! Album aggregation.
//!
//! Folds one snapshot of media rows into per-album summaries. Every row
//! contributes to the albums listed by [`AlbumKind::memberships`]; an album is
//! created the first time one of its members is seen.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::mapper::AlbumRow;
use crate::models::{Album, AlbumKind, AlbumNames};

/// Which member becomes an album's thumbnail.
///
/// Rows arrive newest first, so `FirstVisited` yields the most recent item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailPolicy {
    #[default]
    FirstVisited,
    /// Every member overwrites the thumbnail; the last row wins.
    LastVisited,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumAggregator {
    names: AlbumNames,
    thumbnail_policy: ThumbnailPolicy,
}

impl AlbumAggregator {
    pub fn new(names: AlbumNames, thumbnail_policy: ThumbnailPolicy) -> Self {
        Self {
            names,
            thumbnail_policy,
        }
    }

    /// Aggregate one snapshot. The output order is unspecified.
    pub fn aggregate<I>(&self, rows: I) -> Vec<Album>
    where
        I: IntoIterator<Item = AlbumRow>,
    {
        let mut albums: HashMap<AlbumKind, Album> = HashMap::new();

        for row in rows {
            for kind in AlbumKind::memberships(&row.media) {
                match albums.get_mut(&kind) {
                    Some(album) => {
                        album.size += 1;
                        if self.thumbnail_policy == ThumbnailPolicy::LastVisited {
                            album.thumbnail = row.media.clone();
                        }
                    }
                    None => {
                        let name = self.names.resolve(kind, row.bucket_display_name.as_deref());
                        let mut album = Album::new(kind, name, row.media.clone());
                        album.size = 1;
                        albums.insert(kind, album);
                    }
                }
            }
        }

        albums.into_values().collect()
    }
}

/// Sort albums for display: synthetic albums first, then by name.
pub fn sort_for_display(albums: &mut [Album]) {
    albums.sort_by(|a, b| match (a.kind.is_synthetic(), b.kind.is_synthetic()) {
        (true, true) => a.kind.cmp(&b.kind),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.name.cmp(&b.name).then_with(|| a.kind.cmp(&b.kind)),
    });
}
