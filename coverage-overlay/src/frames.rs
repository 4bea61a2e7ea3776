// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coverage marks for the stack frames of a crash report.
//!
//! Crash reports link each frame to the annotated source on hg. Frames are
//! grouped by file and revision so each file is fetched once, then every
//! frame is marked covered or uncovered from the line coverage of its file.

use std::collections::BTreeMap;

use coverage_client::{ClientError, CoverageClient, LineCoverage, Result};
use futures::future::try_join_all;
use lazy_static::lazy_static;
use regex::Regex;

use crate::page::{is_coverage_supported, LineColor};
use crate::summary::short_revision;

lazy_static! {
    static ref ANNOTATE_LINK_REGEX: Regex = Regex::new(
        r"^https?://hg\.mozilla\.org/mozilla-central/annotate/([0-9a-f]+)/([^#]+)#l([0-9]+)$"
    )
    .unwrap();
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StackFrame {
    /// Shortened to [`crate::summary::SHORT_REVISION_LEN`] characters.
    pub revision: String,
    pub path: String,
    pub line: u32,
}

impl StackFrame {
    /// Parse an hg annotate link. Links to files without coverage, and to
    /// line 0, yield `None`.
    pub fn from_link(link: &str) -> Option<Self> {
        let captures = ANNOTATE_LINK_REGEX.captures(link.trim())?;

        let path = captures.get(2)?.as_str();
        if !is_coverage_supported(path) {
            return None;
        }

        let line: u32 = captures.get(3)?.as_str().parse().ok()?;
        if line == 0 {
            return None;
        }

        Some(Self {
            revision: short_revision(captures.get(1)?.as_str()).to_owned(),
            path: path.to_owned(),
            line,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnnotatedFrame {
    pub frame: StackFrame,

    /// `None` when the file has no coverage data or the line is absent
    /// from it.
    pub color: Option<LineColor>,
}

pub fn frames_from_links<'a>(links: impl IntoIterator<Item = &'a str>) -> Vec<StackFrame> {
    links.into_iter().filter_map(StackFrame::from_link).collect()
}

async fn file_coverage(
    client: &CoverageClient,
    revision: &str,
    path: &str,
) -> Result<Option<LineCoverage>> {
    match client.get_file_coverage(revision, path).await {
        Ok(coverage) => Ok(Some(coverage)),
        Err(ClientError::MissingData(field)) => {
            warn!("no {} for {} @ {}", field, path, revision);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Mark every frame linked from `links`, in link order.
///
/// Files the backend has no data for leave their frames unmarked; request
/// failures abort the whole annotation.
pub async fn annotate_frames<'a>(
    client: &CoverageClient,
    links: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<AnnotatedFrame>> {
    let frames = frames_from_links(links);

    let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
    for (index, frame) in frames.iter().enumerate() {
        groups
            .entry((frame.path.as_str(), frame.revision.as_str()))
            .or_default()
            .push(index);
    }
    debug!("{} frames in {} files", frames.len(), groups.len());

    let coverages = try_join_all(
        groups
            .keys()
            .map(|(path, revision)| file_coverage(client, revision, path)),
    )
    .await?;

    let mut colors = vec![None; frames.len()];
    for (indices, coverage) in groups.values().zip(coverages) {
        let coverage = match coverage {
            Some(coverage) => coverage,
            None => continue,
        };
        for &index in indices {
            colors[index] = coverage
                .hits(frames[index].line)
                .and_then(LineColor::for_hits);
        }
    }

    Ok(frames
        .into_iter()
        .zip(colors)
        .map(|(frame, color)| AnnotatedFrame { frame, color })
        .collect())
}
