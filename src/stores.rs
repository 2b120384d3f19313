//! Observable caches of last-fetched values.
//!
//! A [`ResourceStore`] holds `{value, loading, error}` for one resource and
//! publishes every change on a `tokio::sync::watch` channel, so consumers can
//! either read a snapshot or await changes.

use std::{fmt::Display, future::Future, sync::Arc};

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    dto::orders::OrderWithItems,
    models::{Product, PublicSettings},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Resource<T> {
    pub value: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
            error: None,
        }
    }
}

pub struct ResourceStore<T> {
    tx: Arc<watch::Sender<Resource<T>>>,
}

impl<T> Clone for ResourceStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Default for ResourceStore<T> {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(Resource::default());
        Self { tx: Arc::new(tx) }
    }
}

impl<T: Clone> ResourceStore<T> {
    pub fn snapshot(&self) -> Resource<T> {
        self.tx.borrow().clone()
    }

    pub fn value(&self) -> Option<T> {
        self.tx.borrow().value.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Resource<T>> {
        self.tx.subscribe()
    }

    pub fn set(&self, value: T) {
        self.tx.send_modify(|state| {
            state.value = Some(value);
            state.error = None;
        });
    }

    /// Mutate the cached value in place; no-op when nothing is cached.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(|state| {
            if let Some(value) = state.value.as_mut() {
                f(value);
            }
        });
    }

    pub fn invalidate(&self) {
        self.tx.send_modify(|state| state.value = None);
    }

    /// Run `fetch`, flagging `loading` while it is in flight. A failure records
    /// the error and keeps the previous value.
    pub async fn load<F, Fut, E>(&self, fetch: F) -> Resource<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = fetch().await;

        self.tx.send_modify(|state| {
            match result {
                Ok(value) => state.value = Some(value),
                Err(err) => state.error = Some(err.to_string()),
            }
            state.loading = false;
        });

        self.snapshot()
    }
}

pub type ProductStore = ResourceStore<Product>;
pub type SettingsStore = ResourceStore<PublicSettings>;
pub type OrdersStore = ResourceStore<Vec<OrderWithItems>>;

impl OrdersStore {
    /// Drop soft-deleted orders from the cached list.
    pub fn remove_orders(&self, ids: &[Uuid]) {
        if ids.is_empty() {
            return;
        }
        self.update(|orders| orders.retain(|o| !ids.contains(&o.order.id)));
    }
}
