//! Platform behaviour models for trash handling.

use serde::{Deserialize, Serialize};

use crate::index::MatchTrashed;
use crate::models::AlbumKind;

/// What the media index can do on this platform. Chosen once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// The index hides trashed rows itself and accepts an explicit match mode.
    /// Without it, trashed rows are only told apart by the `is_trashed` column.
    #[serde(default = "default_atomic_trash_toggle")]
    pub supports_atomic_trash_toggle: bool,
}

fn default_atomic_trash_toggle() -> bool {
    true
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::ATOMIC_TRASH
    }
}

impl PlatformCapabilities {
    pub const ATOMIC_TRASH: Self = Self {
        supports_atomic_trash_toggle: true,
    };

    pub const LEGACY: Self = Self {
        supports_atomic_trash_toggle: false,
    };

    /// Match mode for queries that select `album`.
    pub fn query_match(&self, album: AlbumKind) -> Option<MatchTrashed> {
        if !self.supports_atomic_trash_toggle {
            return None;
        }
        match album {
            AlbumKind::Trash => Some(MatchTrashed::Only),
            _ => Some(MatchTrashed::Exclude),
        }
    }

    /// Match mode for queries that aggregate every album, trash included.
    pub fn aggregate_match(&self) -> Option<MatchTrashed> {
        self.supports_atomic_trash_toggle
            .then_some(MatchTrashed::Include)
    }

    /// Match mode for single-row mutations, so trashed rows stay addressable.
    pub fn mutation_match(&self) -> Option<MatchTrashed> {
        self.aggregate_match()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_modes() {
        let atomic = PlatformCapabilities::ATOMIC_TRASH;
        assert_eq!(atomic.query_match(AlbumKind::Trash), Some(MatchTrashed::Only));
        assert_eq!(atomic.query_match(AlbumKind::Real(4)), Some(MatchTrashed::Exclude));
        assert_eq!(atomic.aggregate_match(), Some(MatchTrashed::Include));

        let legacy = PlatformCapabilities::LEGACY;
        assert_eq!(legacy.query_match(AlbumKind::Trash), None);
        assert_eq!(legacy.mutation_match(), None);
    }
}
