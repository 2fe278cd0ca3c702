//! The media index collaborator.
//!
//! Everything the core knows about stored media goes through [`MediaIndex`]:
//! one-shot queries, coarse change notifications and single-row mutations.
//! [`SqliteMediaIndex`] is the local implementation.

mod observers;
mod schema;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{MediaIndexError, Result};
use crate::models::ContentUri;
use crate::query::{Selection, Value};

pub use observers::ObserverRegistry;
pub use schema::SCHEMA;
pub use sqlite::{NewMedia, SqliteMediaIndex};

pub type SharedIndex = Arc<dyn MediaIndex>;

/// How trashed rows take part in a request on indexes that toggle trash
/// visibility themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTrashed {
    Include,
    Exclude,
    Only,
}

/// Everything a single query execution needs.
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub projection: &'static [&'static str],
    pub selection: Option<Selection>,
    pub sort_order: Option<&'static str>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub match_trashed: Option<MatchTrashed>,
}

/// Rows returned by one query execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MediaIndexError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Notifications that rows at or under a location may have changed.
///
/// Signals carry no payload and coalesce: several changes before the next
/// [`changed`](Self::changed) call are reported once. Dropping the
/// subscription unregisters it.
#[derive(Debug)]
pub struct ChangeSubscription {
    rx: mpsc::Receiver<()>,
    token: CancellationToken,
}

impl ChangeSubscription {
    pub(crate) fn new(rx: mpsc::Receiver<()>, token: CancellationToken) -> Self {
        Self { rx, token }
    }

    /// Wait for the next change. Returns `false` once cancelled or closed.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            signal = self.rx.recv() => signal.is_some(),
        }
    }

    /// Drop any signal already queued.
    pub fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// The shared media catalog.
///
/// All methods are blocking; async callers run them on the blocking pool.
pub trait MediaIndex: Send + Sync + 'static {
    /// Run a query. `Ok(None)` means the index produced no cursor.
    fn query(&self, uri: &ContentUri, args: &QueryArgs) -> Result<Option<ResultSet>>;

    /// Register for change notifications at or under `uri` until `cancel` fires.
    fn subscribe(&self, uri: &ContentUri, cancel: CancellationToken) -> ChangeSubscription;

    /// Set columns of the row at `uri`; returns the number of rows changed.
    fn update(
        &self,
        uri: &ContentUri,
        values: &[(&'static str, Value)],
        match_trashed: Option<MatchTrashed>,
    ) -> Result<usize>;

    /// Delete the row at `uri`; returns the number of rows removed.
    fn delete(&self, uri: &ContentUri, match_trashed: Option<MatchTrashed>) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_set_column_lookup() {
        let set = ResultSet::new(
            vec!["_id".to_string(), "mime_type".to_string()],
            vec![vec![Value::Integer(1), Value::from("image/png")]],
        );
        assert_eq!(set.column_index("mime_type").unwrap(), 1);
        assert_eq!(
            set.column_index("orientation"),
            Err(MediaIndexError::MissingColumn("orientation".to_string()))
        );
        assert_eq!(set.len(), 1);
    }
}
