// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{Element, LineElement, PageAdapter, PageTarget};
use crate::error::OverlayError;

lazy_static! {
    static ref REVISION_PHID_REGEX: Regex = Regex::new(r"/(PHID-DREV-[^/]*)/").unwrap();
}

/// Review revision id carried by a diff page's workflow link.
pub fn revision_phid(href: &str) -> Option<String> {
    REVISION_PHID_REGEX
        .captures(href)
        .and_then(|captures| captures.get(1))
        .map(|phid| phid.as_str().to_owned())
}

/// Leading decimal digits of a row header, ignoring leading whitespace.
pub fn parse_line_number(header: &str) -> Option<u32> {
    let header = header.trim_start();
    let end = header
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(header.len());
    header[..end].parse().ok()
}

/// One file of a code review diff. Rows are addressed by the line number in
/// their header cell; rows without one are ignored.
#[derive(Clone, Debug)]
pub struct DiffBlock {
    path: String,
    parent_revision: Option<String>,
    rows: Vec<Element>,
    index: BTreeMap<u32, usize>,
}

impl DiffBlock {
    /// `parent_revision` is the revision the diff applies to, when known.
    pub fn new(path: impl Into<String>, parent_revision: Option<String>, rows: Vec<Element>) -> Self {
        let mut index = BTreeMap::new();
        for (position, row) in rows.iter().enumerate() {
            if let Some(line) = parse_line_number(&row.text) {
                index.entry(line).or_insert(position);
            }
        }

        Self {
            path: path.into(),
            parent_revision,
            rows,
            index,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn rows(&self) -> &[Element] {
        &self.rows
    }
}

#[async_trait]
impl PageAdapter for DiffBlock {
    async fn resolve(&self) -> Result<PageTarget, OverlayError> {
        let revision = self
            .parent_revision
            .clone()
            .ok_or_else(|| OverlayError::Resolve("Error fetching parent revision.".to_owned()))?;

        Ok(PageTarget {
            revision,
            path: self.path.clone(),
        })
    }

    fn locate_line(&mut self, line: u32) -> Option<&mut dyn LineElement> {
        let position = *self.index.get(&line)?;
        self.rows
            .get_mut(position)
            .map(|row| row as &mut dyn LineElement)
    }
}
