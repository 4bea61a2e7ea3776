// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use coverage_client::{FileRecord, Filters, RecordType};
use tokio::sync::{Notify, RwLock};

use super::*;
use crate::load::View;

/// Answers every load with an empty view of the requested kind. Loads of a
/// gated path wait until the gate is notified.
#[derive(Debug, Default)]
pub struct ViewLoaderDouble {
    pub loaded: Arc<RwLock<Vec<RouteState>>>,
    pub gates: Arc<RwLock<HashMap<String, Arc<Notify>>>>,
}

impl ViewLoaderDouble {
    pub async fn gate(&self, path: &str) -> Arc<Notify> {
        let mut gates = self.gates.write().await;
        gates.entry(path.to_owned()).or_default().clone()
    }

    pub async fn loads(&self) -> Vec<RouteState> {
        self.loaded.read().await.clone()
    }
}

#[async_trait]
impl ViewLoader for ViewLoaderDouble {
    async fn load(&self, route: &RouteState) -> Result<LoadedView> {
        self.loaded.write().await.push(route.clone());

        let gate = self.gates.read().await.get(&route.path).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let coverage = FileRecord {
            path: route.path.clone(),
            kind: RecordType::Directory,
            ..Default::default()
        };

        let view = match View::from_route(route)? {
            View::Zero => LoadedView::Zero {
                route: route.clone(),
                report: Default::default(),
                third_party: Default::default(),
            },
            View::Directory => LoadedView::Directory {
                route: route.clone(),
                coverage,
                filters: Filters::default(),
                history: None,
            },
            View::File => LoadedView::File {
                route: route.clone(),
                coverage,
                filters: Filters::default(),
                source: String::new(),
            },
        };

        Ok(view)
    }
}
