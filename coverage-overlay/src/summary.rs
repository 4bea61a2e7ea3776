// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use coverage_client::{ChangesetSummary, CoverageClient, Result};
use futures::future::try_join_all;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HG_REVISION_REGEX: Regex =
        Regex::new(r"^https?://hg\.mozilla\.org/mozilla-central/rev/([0-9a-f]+)$").unwrap();
}

/// Revisions are shortened to this many characters before querying.
pub const SHORT_REVISION_LEN: usize = 12;

pub fn short_revision(revision: &str) -> &str {
    match revision.char_indices().nth(SHORT_REVISION_LEN) {
        Some((end, _)) => &revision[..end],
        None => revision,
    }
}

/// Short revisions of the links that point at mozilla-central pushes.
pub fn revisions_from_links<'a>(links: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    links
        .into_iter()
        .filter_map(|link| HG_REVISION_REGEX.captures(link.trim()))
        .filter_map(|captures| captures.get(1))
        .map(|revision| short_revision(revision.as_str()).to_owned())
        .collect()
}

/// Combined coverage of the changesets landed for one bug.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChangesetsCoverage {
    pub added: u64,
    pub covered: u64,

    /// Changesets that added lines, with their own summary.
    pub changesets: Vec<(String, ChangesetSummary)>,
}

impl fmt::Display for ChangesetsCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines covered out of {} lines added",
            self.covered, self.added
        )
    }
}

/// Fetch every changeset summary concurrently and add them up.
///
/// Returns `None` when the changesets added no lines at all.
pub async fn summarize_changesets(
    client: &CoverageClient,
    revisions: &[String],
) -> Result<Option<ChangesetsCoverage>> {
    let revisions: Vec<&str> = revisions.iter().map(|rev| short_revision(rev)).collect();

    let summaries = try_join_all(
        revisions
            .iter()
            .map(|revision| client.get_changeset_summary(revision)),
    )
    .await?;

    let mut coverage = ChangesetsCoverage::default();
    for (revision, summary) in revisions.into_iter().zip(summaries) {
        if let Some(error) = &summary.error {
            warn!("changeset {} has no summary: {}", revision, error);
        }

        coverage.added += summary.commit_added;
        coverage.covered += summary.commit_covered;

        if summary.commit_added > 0 {
            coverage.changesets.push((revision.to_owned(), summary));
        }
    }

    if coverage.added == 0 {
        return Ok(None);
    }

    info!("{}", coverage);
    Ok(Some(coverage))
}
