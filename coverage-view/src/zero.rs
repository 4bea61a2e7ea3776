// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use chrono::{DateTime, Utc};
use coverage_client::ZeroCoverageReport;

use crate::aggregate::{aggregate, normalize_dir, Entry};
use crate::display::{build_navbar, NavLink};
use crate::filters::{apply_filters, FilterOptions};
use crate::route::{RouteState, PATH, REVISION, VIEW};
use crate::{VIEW_FILE, VIEW_ZERO_COVERAGE};

#[derive(Clone, Debug, PartialEq)]
pub struct ZeroEntry {
    pub entry: Entry,

    /// Folders stay in the zero view; files open at the report's revision.
    pub route: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZeroCoverageView {
    pub current_dir: String,
    pub revision: String,
    pub navbar: Vec<NavLink>,
    pub entries: Vec<ZeroEntry>,

    /// Files left after filtering, before aggregation.
    pub total: usize,
}

/// Filter the report to `dir` and fold it into its immediate entries.
pub fn zero_coverage_view(
    report: &ZeroCoverageReport,
    route: &RouteState,
    third_party_prefixes: &[String],
    now: DateTime<Utc>,
) -> ZeroCoverageView {
    let dir = normalize_dir(&route.path);

    let files = report
        .files
        .iter()
        .filter(|file| file.path.starts_with(&dir))
        .cloned()
        .collect();

    let options = FilterOptions::from_route(route);
    let files = apply_filters(files, &options, third_party_prefixes, now);
    debug!(
        "zero coverage for {:?}: {} files after filtering",
        dir,
        files.len()
    );

    let entries = aggregate(&files, &dir)
        .into_iter()
        .map(|entry| {
            let path = format!("{}{}", dir, entry.name);
            let route = if entry.is_leaf() {
                // Drop filter state when leaving the zero view.
                RouteState::default().build_route([
                    (VIEW, VIEW_FILE),
                    (REVISION, report.revision.as_str()),
                    (PATH, path.as_str()),
                ])
            } else {
                route.build_route([(VIEW, VIEW_ZERO_COVERAGE), (PATH, path.as_str())])
            };
            ZeroEntry { entry, route }
        })
        .collect();

    ZeroCoverageView {
        navbar: build_navbar(route, &dir, &route.revision),
        revision: report.revision.clone(),
        current_dir: dir,
        entries,
        total: files.len(),
    }
}
