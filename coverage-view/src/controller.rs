// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::Result;

use crate::load::{LoadedView, ViewLoader};
use crate::route::RouteState;

/// Owns the current route and reloads the view whenever the hash changes.
///
/// Loads are never cancelled. When navigations overlap, only the most recent
/// one produces a view; earlier ones resolve to `None`.
pub struct RouteController<L> {
    loader: L,
    route: Mutex<RouteState>,
    generation: AtomicU64,
}

impl<L: ViewLoader> RouteController<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            route: Mutex::new(RouteState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn current(&self) -> RouteState {
        self.route
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Handle a hash change: adopt the route it encodes and load its view.
    ///
    /// Returns `Ok(None)` when another navigation started before this one
    /// finished. Errors of such superseded loads are dropped as well.
    pub async fn navigate(&self, hash: &str) -> Result<Option<LoadedView>> {
        let route = RouteState::parse(hash);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = route.clone();

        let result = self.loader.load(&route).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding superseded load of {}", route.to_hash());
            return Ok(None);
        }

        if let Err(err) = &result {
            warn!("Failed to load coverage: {:#}", err);
        }

        result.map(Some)
    }

    /// Hash of the current route with `params` applied on top. Navigating to
    /// it is up to the caller, as with any other hash change.
    pub fn update<'a>(&self, params: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
        self.current().build_route(params)
    }
}

#[cfg(test)]
pub mod double;
