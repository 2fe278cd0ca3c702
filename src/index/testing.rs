//! Scripted index for exercising failure paths.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{ChangeSubscription, MatchTrashed, MediaIndex, ObserverRegistry, QueryArgs, ResultSet};
use crate::error::{MediaIndexError, Result};
use crate::models::ContentUri;
use crate::query::{columns, Value};

#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Rows(ResultSet),
    Absent,
    Fail,
}

#[derive(Debug)]
pub(crate) struct ScriptedIndex {
    next: Mutex<Scripted>,
    observers: ObserverRegistry,
    queries: AtomicUsize,
    reject_mutations: bool,
}

impl ScriptedIndex {
    pub(crate) fn new(next: Scripted) -> Arc<Self> {
        Arc::new(Self {
            next: Mutex::new(next),
            observers: ObserverRegistry::new(),
            queries: AtomicUsize::new(0),
            reject_mutations: false,
        })
    }

    pub(crate) fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            next: Mutex::new(Scripted::Absent),
            observers: ObserverRegistry::new(),
            queries: AtomicUsize::new(0),
            reject_mutations: true,
        })
    }

    /// Replace the scripted result and signal a change.
    pub(crate) fn set(&self, next: Scripted) {
        *self.next.lock().unwrap() = next;
        self.observers.notify(&ContentUri::FILES);
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

/// Rows in the album projection with the given media type codes.
pub(crate) fn rows_with_media_types(types: &[i64]) -> ResultSet {
    let rows = types
        .iter()
        .enumerate()
        .map(|(i, media_type)| {
            vec![
                Value::Null,
                Value::Integer(i as i64 + 1),
                Value::Integer(1),
                Value::Integer(0),
                Value::Integer(0),
                Value::Integer(*media_type),
                Value::from("image/jpeg"),
                Value::Integer(1_700_000_000),
                Value::Integer(1_700_000_000),
                Value::Integer(0),
            ]
        })
        .collect();
    ResultSet::new(
        columns::ALBUMS_PROJECTION.iter().map(|c| c.to_string()).collect(),
        rows,
    )
}

impl MediaIndex for ScriptedIndex {
    fn query(&self, _uri: &ContentUri, _args: &QueryArgs) -> Result<Option<ResultSet>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.next.lock().unwrap().clone() {
            Scripted::Rows(set) => Ok(Some(set)),
            Scripted::Absent => Ok(None),
            Scripted::Fail => Err(MediaIndexError::Query("scripted failure".to_string())),
        }
    }

    fn subscribe(&self, uri: &ContentUri, cancel: CancellationToken) -> ChangeSubscription {
        self.observers.register(uri, cancel)
    }

    fn update(
        &self,
        _uri: &ContentUri,
        _values: &[(&'static str, Value)],
        _match_trashed: Option<MatchTrashed>,
    ) -> Result<usize> {
        if self.reject_mutations {
            Err(MediaIndexError::Mutation("permission denied".to_string()))
        } else {
            Ok(0)
        }
    }

    fn delete(&self, _uri: &ContentUri, _match_trashed: Option<MatchTrashed>) -> Result<usize> {
        if self.reject_mutations {
            Err(MediaIndexError::Mutation("permission denied".to_string()))
        } else {
            Ok(0)
        }
    }
}
