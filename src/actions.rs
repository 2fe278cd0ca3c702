//! Single-item mutations: favorite, trash and delete.
//!
//! Each action targets the item's own row location and succeeds only if the
//! index reports at least one affected row. Change notification is left to
//! the index, which wakes every live stream and pager watching the item.

use crate::error::{MediaIndexError, Result};
use crate::index::SharedIndex;
use crate::models::Media;
use crate::platform::PlatformCapabilities;
use crate::query::{columns, Value};

#[derive(Clone)]
pub struct MediaActions {
    index: SharedIndex,
    capabilities: PlatformCapabilities,
}

impl MediaActions {
    pub fn new(index: SharedIndex, capabilities: PlatformCapabilities) -> Self {
        Self {
            index,
            capabilities,
        }
    }

    pub async fn favorite(&self, media: &Media, favorite: bool) -> Result<()> {
        self.set_flag(media, columns::IS_FAVORITE, favorite).await
    }

    pub async fn trash(&self, media: &Media, trashed: bool) -> Result<()> {
        self.set_flag(media, columns::IS_TRASHED, trashed).await
    }

    /// Remove the item from the index permanently.
    pub async fn delete(&self, media: &Media) -> Result<()> {
        let index = self.index.clone();
        let uri = media.external_content_uri();
        let match_trashed = self.capabilities.mutation_match();

        let removed = tokio::task::spawn_blocking(move || index.delete(&uri, match_trashed))
            .await
            .map_err(|e| MediaIndexError::Mutation(e.to_string()))??;

        if removed == 0 {
            tracing::warn!(uri = %uri, "Delete matched no rows");
            return Err(MediaIndexError::NotFound(uri));
        }
        tracing::info!(uri = %uri, "Deleted media");
        Ok(())
    }

    async fn set_flag(&self, media: &Media, column: &'static str, value: bool) -> Result<()> {
        let index = self.index.clone();
        let uri = media.external_content_uri();
        let match_trashed = self.capabilities.mutation_match();

        let changed = tokio::task::spawn_blocking(move || {
            index.update(&uri, &[(column, Value::from(value))], match_trashed)
        })
        .await
        .map_err(|e| MediaIndexError::Mutation(e.to_string()))?
        .map_err(|e| {
            tracing::warn!(uri = %uri, column, error = %e, "Update failed");
            e
        })?;

        if changed == 0 {
            tracing::warn!(uri = %uri, column, "Update matched no rows");
            return Err(MediaIndexError::NotFound(uri));
        }
        tracing::debug!(uri = %uri, column, value, "Updated media");
        Ok(())
    }
}
