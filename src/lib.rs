//! Media indexing core of a photo and video gallery.
//!
//! A [`MediaIndex`](index::MediaIndex) holds the catalog. On top of it this
//! crate provides live album lists, live and paged media listings per album,
//! and favorite/trash/delete actions, all reachable from [`MediaRepository`].

pub mod actions;
pub mod albums;
pub mod config;
pub mod error;
pub mod filters;
pub mod index;
pub mod live;
pub mod logging;
pub mod mapper;
pub mod models;
pub mod paging;
pub mod platform;
pub mod query;
pub mod repository;
pub mod scanner;

pub use actions::MediaActions;
pub use albums::{AlbumAggregator, ThumbnailPolicy};
pub use config::Config;
pub use error::{MediaIndexError, Result};
pub use live::{LiveQuery, Snapshot};
pub use models::{Album, AlbumKind, ContentUri, Media, MediaType};
pub use paging::{MediaPager, PagerEvent, PagingConfig};
pub use platform::PlatformCapabilities;
pub use repository::MediaRepository;
