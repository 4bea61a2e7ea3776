// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{Element, LineColor, LineElement, PageAdapter, PageTarget};
use crate::error::OverlayError;

lazy_static! {
    static ref REVISION_REGEX: Regex = Regex::new(r"Mercurial \(([0-9a-f]+)\)").unwrap();
}

const SOURCE_SEGMENT: &str = "/mozilla-central/source/";

/// Revision named in a code browser's navigation panel.
pub fn revision_from_panel(panel: &str) -> Option<String> {
    REVISION_REGEX
        .captures(panel)
        .and_then(|captures| captures.get(1))
        .map(|revision| revision.as_str().to_owned())
}

/// Repository path of the file a breadcrumb link points at.
pub fn path_from_breadcrumb(href: &str) -> Option<String> {
    href.split_once(SOURCE_SEGMENT)
        .map(|(_, path)| path.to_owned())
        .filter(|path| !path.is_empty())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Numbering {
    /// Line number cells are `l1`, `l2`...
    Prefixed,

    /// Line number cells are `1`, `2`...
    Bare,
}

impl Numbering {
    fn detect(ids: &BTreeMap<String, Element>) -> Option<Self> {
        if ids.contains_key("l1") {
            Some(Self::Prefixed)
        } else if ids.contains_key("1") {
            Some(Self::Bare)
        } else {
            None
        }
    }

    fn parse(&self, id: &str) -> Option<u32> {
        match self {
            Self::Prefixed => id.strip_prefix('l')?.parse().ok(),
            Self::Bare => id.parse().ok(),
        }
    }
}

/// The number cell and the code cell of one line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CodeBrowserLine {
    pub number: Element,
    pub code: Option<Element>,
}

impl LineElement for CodeBrowserLine {
    fn set_background(&mut self, color: Option<LineColor>) {
        self.number.set_background(color);
        if let Some(code) = &mut self.code {
            code.set_background(color);
        }
    }
}

/// A source file rendered by a code browser, one number cell and one
/// `line-<n>` code cell per line.
#[derive(Clone, Debug)]
pub struct CodeBrowserPage {
    target: PageTarget,
    lines: BTreeMap<u32, CodeBrowserLine>,
}

impl CodeBrowserPage {
    /// Index the line elements of a page. Fails when the page numbers its
    /// lines in an unknown way.
    pub fn new(target: PageTarget, elements: Vec<Element>) -> Result<Self, OverlayError> {
        let mut ids: BTreeMap<String, Element> = elements
            .into_iter()
            .map(|element| (element.id.clone(), element))
            .collect();

        let numbering = Numbering::detect(&ids).ok_or(OverlayError::UnknownLineElements)?;

        let numbers: Vec<(u32, String)> = ids
            .keys()
            .filter_map(|id| numbering.parse(id).map(|line| (line, id.clone())))
            .collect();

        let mut lines = BTreeMap::new();
        for (line, id) in numbers {
            if let Some(number) = ids.remove(&id) {
                let code = ids.remove(&format!("line-{}", line));
                lines.insert(line, CodeBrowserLine { number, code });
            }
        }

        Ok(Self { target, lines })
    }

    pub fn line(&self, line: u32) -> Option<&CodeBrowserLine> {
        self.lines.get(&line)
    }

    pub fn lines(&self) -> impl Iterator<Item = (u32, &CodeBrowserLine)> {
        self.lines.iter().map(|(line, element)| (*line, element))
    }
}

#[async_trait]
impl PageAdapter for CodeBrowserPage {
    async fn resolve(&self) -> Result<PageTarget, OverlayError> {
        Ok(self.target.clone())
    }

    fn locate_line(&mut self, line: u32) -> Option<&mut dyn LineElement> {
        self.lines
            .get_mut(&line)
            .map(|line| line as &mut dyn LineElement)
    }

    /// Coverage keys count from zero, page lines from one.
    fn line_for_key(&self, key: u32) -> Option<u32> {
        key.checked_add(1)
    }
}
