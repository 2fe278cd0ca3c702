//! Immutable value records handed to consumers.

pub mod album;
pub mod media;

pub use album::{Album, AlbumKind, AlbumNames, ALL_MEDIA_BUCKET_ID, FAVORITES_BUCKET_ID, TRASH_BUCKET_ID};
pub use media::{Collection, ContentUri, Media, MediaSignature, MediaType};
