// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coverage highlighting over pages that show source code, and the
//! per-bug changeset summary.
//!
//! An [`Overlay`] drives one [`PageAdapter`]: it resolves which file the page
//! shows, fetches that file's coverage through a shared [`CoverageMemo`] and
//! paints covered and uncovered lines. Crash-report stack frames are marked
//! the same way by [`annotate_frames`].

#[macro_use]
extern crate log;

pub mod error;
pub mod frames;
pub mod memo;
pub mod overlay;
pub mod page;
pub mod source;
pub mod summary;

pub use error::OverlayError;
pub use frames::{annotate_frames, frames_from_links, AnnotatedFrame, StackFrame};
pub use memo::CoverageMemo;
pub use overlay::{Overlay, OverlayState, FAILURE_TOOLTIP, TOGGLE_KEY};
pub use page::{
    is_coverage_supported, CodeBrowserPage, DiffBlock, Element, LineColor, LineElement,
    PageAdapter, PageTarget, TextPage,
};
pub use source::CoverageSource;
pub use summary::{revisions_from_links, summarize_changesets, ChangesetsCoverage};
