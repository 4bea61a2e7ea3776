// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use async_trait::async_trait;
use coverage_view::Language;

use crate::error::OverlayError;

pub mod code_browser;
pub mod diff;
pub mod text;

pub use code_browser::CodeBrowserPage;
pub use diff::DiffBlock;
pub use text::TextPage;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineColor {
    Covered,
    Uncovered,
}

impl LineColor {
    /// Color for a line hit `hits` times, or `None` for lines that are not
    /// instrumented.
    pub fn for_hits(hits: i64) -> Option<Self> {
        match hits {
            hits if hits > 0 => Some(Self::Covered),
            0 => Some(Self::Uncovered),
            _ => None,
        }
    }

    pub fn css(&self) -> &'static str {
        match self {
            Self::Covered => "greenyellow",
            Self::Uncovered => "tomato",
        }
    }
}

/// Anything on a page that can be highlighted for one line.
pub trait LineElement {
    fn set_background(&mut self, color: Option<LineColor>);
}

/// A node of a host page, addressed by id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Element {
    pub id: String,
    pub text: String,
    pub background: Option<LineColor>,
}

impl Element {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            background: None,
        }
    }
}

impl LineElement for Element {
    fn set_background(&mut self, color: Option<LineColor>) {
        self.background = color;
    }
}

/// The file a page shows, and at which revision.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageTarget {
    pub revision: String,
    pub path: String,
}

/// What the overlay needs from a host page.
#[async_trait]
pub trait PageAdapter: Send + Sync {
    async fn resolve(&self) -> Result<PageTarget, OverlayError>;

    fn locate_line(&mut self, line: u32) -> Option<&mut dyn LineElement>;

    /// Line number for a key of the coverage map, if the page can show it.
    fn line_for_key(&self, key: u32) -> Option<u32> {
        Some(key)
    }
}

/// Whether overlays are offered for `path` at all.
pub fn is_coverage_supported(path: &str) -> bool {
    Language::classify(path).is_some()
}
