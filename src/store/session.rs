//! Sync Session
//!
//! Owns the lifecycle of one synchronized collection: subscribe to the change
//! feed first, then bulk load and seed. Subscribing before loading means no
//! change committed during the load is missed; the collection's merge rules
//! absorb the overlap.
//!
//! Dropping (or closing) the session unsubscribes and disposes the
//! collection, so a late event can never merge into a store nobody owns.

use std::sync::Arc;
use thiserror::Error;

use super::collection::{LoadState, SyncedCollection};
use crate::model::Entity;
use crate::realtime::{ChangeKind, FeedError, Liveness, Subscriber, Subscription};
use crate::source::{PageSource, PaginatedLoader, SourceError};

/// Errors raised while establishing or refreshing a session
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Bulk load failed: {0}")]
    Load(#[from] SourceError),

    #[error("Subscription failed: {0}")]
    Subscribe(#[from] FeedError),
}

/// A collection kept in sync with its source table
pub struct SyncSession<E: Entity> {
    store: Arc<SyncedCollection<E>>,
    subscription: Option<Subscription>,
    liveness: Liveness,
}

impl<E: Entity> SyncSession<E> {
    /// Subscribe `store` to every change kind on its table
    ///
    /// Setup failure is returned once; retrying is up to the caller.
    pub async fn open(
        store: Arc<SyncedCollection<E>>,
        subscriber: &Subscriber,
    ) -> Result<Self, SyncError> {
        let subscription = subscriber
            .subscribe::<E, _>(ChangeKind::all(), Arc::clone(&store))
            .await?;

        Ok(Self {
            store,
            liveness: subscription.liveness(),
            subscription: Some(subscription),
        })
    }

    /// A session that only bulk loads (realtime disabled)
    pub fn detached(store: Arc<SyncedCollection<E>>) -> Self {
        Self {
            store,
            subscription: None,
            liveness: Liveness::off(),
        }
    }

    /// A bulk-only session standing in for a subscription that failed
    ///
    /// Reports its feed as ended, so health checks flag the view as stale.
    pub fn stale(store: Arc<SyncedCollection<E>>) -> Self {
        Self {
            store,
            subscription: None,
            liveness: Liveness::ended(),
        }
    }

    pub fn store(&self) -> &Arc<SyncedCollection<E>> {
        &self.store
    }

    pub fn is_live(&self) -> bool {
        self.liveness.is_live()
    }

    /// Handle for reporting feed state after the session is shared
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.id())
    }

    /// Bulk load from `source` and seed the collection
    ///
    /// On failure nothing is merged and the collection is marked
    /// [`LoadState::Failed`]; calling `load` again restarts from offset zero.
    pub async fn load<S>(&self, source: &S, loader: &PaginatedLoader) -> Result<usize, SyncError>
    where
        S: PageSource<E> + ?Sized,
    {
        self.store.set_load_state(LoadState::Loading).await;

        match loader.load_all(source).await {
            Ok(records) => Ok(self.store.seed(records).await),
            Err(e) => {
                tracing::error!(table = E::TABLE, error = %e, "Bulk load failed");
                self.store
                    .set_load_state(LoadState::Failed(e.to_string()))
                    .await;
                Err(e.into())
            }
        }
    }

    /// Unsubscribe, wait for in-flight dispatch, and dispose the collection
    pub async fn close(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.shutdown().await;
        }
        self.store.dispose();
    }
}

impl<E: Entity> Drop for SyncSession<E> {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.store.dispose();
    }
}
