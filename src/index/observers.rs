//! Change observer bookkeeping shared by index implementations.

use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ChangeSubscription;
use crate::models::ContentUri;

#[derive(Debug)]
struct Observer {
    uri: ContentUri,
    tx: mpsc::Sender<()>,
    token: CancellationToken,
}

impl Observer {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }
}

/// Registered observers and their locations.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Observer>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, uri: &ContentUri, cancel: CancellationToken) -> ChangeSubscription {
        // Capacity 1: a pending signal already covers any later change.
        let (tx, rx) = mpsc::channel(1);
        let token = cancel.child_token();
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(Observer::is_live);
        observers.push(Observer {
            uri: *uri,
            tx,
            token: token.clone(),
        });
        tracing::debug!(uri = %uri, observers = observers.len(), "Registered change observer");
        ChangeSubscription::new(rx, token)
    }

    /// Signal every live observer whose location overlaps `changed`.
    ///
    /// Never blocks: observers with a signal already pending are skipped.
    pub fn notify(&self, changed: &ContentUri) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(Observer::is_live);
        for observer in observers.iter() {
            if observer.uri.contains(changed) || changed.contains(&observer.uri) {
                let _ = observer.tx.try_send(());
            }
        }
    }

    pub fn len(&self) -> usize {
        let observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.iter().filter(|o| o.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
