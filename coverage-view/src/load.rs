// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use coverage_client::{CoverageClient, FileRecord, Filters, HistoryPoint, ZeroCoverageReport};

use crate::filters::is_enabled;
use crate::route::RouteState;
use crate::{VIEW_DIRECTORY, VIEW_FILE, VIEW_ZERO_COVERAGE};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum View {
    Zero,
    Directory,
    File,
}

impl View {
    /// The view a route asks for; no view means the directory view.
    pub fn from_route(route: &RouteState) -> Result<Self> {
        match route.view.as_deref() {
            None | Some("") | Some(VIEW_DIRECTORY) => Ok(Self::Directory),
            Some(VIEW_ZERO_COVERAGE) => Ok(Self::Zero),
            Some(VIEW_FILE) => Ok(Self::File),
            Some(view) => anyhow::bail!("Invalid view : {}", view),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => VIEW_ZERO_COVERAGE,
            Self::Directory => VIEW_DIRECTORY,
            Self::File => VIEW_FILE,
        }
    }
}

/// Everything needed to display one route.
#[derive(Clone, Debug)]
pub enum LoadedView {
    Zero {
        route: RouteState,
        report: ZeroCoverageReport,

        /// Only fetched when third-party files are hidden.
        third_party: Arc<Vec<String>>,
    },
    Directory {
        route: RouteState,
        coverage: FileRecord,
        filters: Filters,

        /// `None` when the backend has no history for the path.
        history: Option<Vec<HistoryPoint>>,
    },
    File {
        route: RouteState,
        coverage: FileRecord,
        filters: Filters,
        source: String,
    },
}

impl LoadedView {
    pub fn route(&self) -> &RouteState {
        match self {
            Self::Zero { route, .. } | Self::Directory { route, .. } | Self::File { route, .. } => {
                route
            }
        }
    }

    pub fn view(&self) -> View {
        match self {
            Self::Zero { .. } => View::Zero,
            Self::Directory { .. } => View::Directory,
            Self::File { .. } => View::File,
        }
    }
}

#[async_trait]
pub trait ViewLoader: Send + Sync {
    async fn load(&self, route: &RouteState) -> Result<LoadedView>;
}

/// Loads views from a [`CoverageClient`], issuing the requests of a view
/// concurrently.
#[derive(Clone)]
pub struct CoverageLoader {
    client: Arc<CoverageClient>,
}

impl CoverageLoader {
    pub fn new(client: Arc<CoverageClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CoverageClient {
        &self.client
    }

    async fn load_zero(&self, route: &RouteState) -> Result<LoadedView> {
        let client = &self.client;

        let third_party = async {
            if is_enabled(route, "third_party") {
                Ok(Arc::default())
            } else {
                client.third_party_paths().await
            }
        };

        let (report, third_party) =
            tokio::try_join!(client.get_zero_coverage_data(), third_party)
                .context("Failed to load zero coverage report")?;

        Ok(LoadedView::Zero {
            route: route.clone(),
            report,
            third_party,
        })
    }

    async fn load_directory(&self, route: &RouteState) -> Result<LoadedView> {
        let client = &self.client;
        let platform = route.platform.as_deref();
        let suite = route.suite.as_deref();

        let (coverage, filters, history) = tokio::try_join!(
            client.get_path_coverage(&route.path, Some(route.revision.as_str()), platform, suite),
            client.get_filters(),
            client.get_history(&route.path, platform, suite),
        )
        .context("Failed to load coverage")?;

        Ok(LoadedView::Directory {
            route: route.clone(),
            coverage,
            filters,
            history,
        })
    }

    async fn load_file(&self, route: &RouteState) -> Result<LoadedView> {
        let client = &self.client;
        let platform = route.platform.as_deref();
        let suite = route.suite.as_deref();

        let (coverage, filters, source) = tokio::try_join!(
            client.get_path_coverage(&route.path, Some(route.revision.as_str()), platform, suite),
            client.get_filters(),
            client.get_source(&route.path, Some(route.revision.as_str())),
        )
        .context("Failed to load coverage")?;

        Ok(LoadedView::File {
            route: route.clone(),
            coverage,
            filters,
            source,
        })
    }
}

#[async_trait]
impl ViewLoader for CoverageLoader {
    async fn load(&self, route: &RouteState) -> Result<LoadedView> {
        info!(
            "loading {} view for {} @ {}",
            View::from_route(route).map(|view| view.as_str()).unwrap_or("unknown"),
            if route.path.is_empty() {
                crate::display::ROOT_NAME
            } else {
                route.path.as_str()
            },
            route.revision
        );

        match View::from_route(route)? {
            View::Zero => self.load_zero(route).await,
            View::Directory => self.load_directory(route).await,
            View::File => self.load_file(route).await,
        }
    }
}
