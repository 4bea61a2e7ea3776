// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[macro_use]
extern crate log;

pub mod aggregate;
pub mod controller;
pub mod display;
pub mod filters;
pub mod load;
pub mod route;
pub mod zero;

pub const VIEW_ZERO_COVERAGE: &str = "zero";
pub const VIEW_DIRECTORY: &str = "directory";
pub const VIEW_FILE: &str = "file";

pub use aggregate::{aggregate, sort_entries, DirectoryAggregate, Entry, EntryKind};
pub use controller::RouteController;
pub use filters::{apply_filters, FilterOptions, Language, LastPush};
pub use load::{CoverageLoader, LoadedView, View, ViewLoader};
pub use route::RouteState;
pub use zero::{zero_coverage_view, ZeroCoverageView};
