// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Revision sentinel meaning "whatever the backend has most recently ingested".
pub const REV_LATEST: &str = "latest";

/// Platform and suite sentinel meaning "do not filter".
pub const ALL: &str = "all";

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    #[default]
    File,
    Directory,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

/// A file or directory as reported by the backend.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,

    #[serde(rename = "type", default)]
    pub kind: RecordType,

    #[serde(default)]
    pub funcs: u64,

    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub commits: u64,

    #[serde(default, deserialize_with = "push_date::deserialize")]
    pub first_push_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "push_date::deserialize")]
    pub last_push_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub coverage_percent: f64,

    /// No line of this file was covered across its recorded history.
    #[serde(default)]
    pub uncovered: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<LineCoverage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changeset: Option<String>,
}

impl FileRecord {
    pub fn is_directory(&self) -> bool {
        self.kind == RecordType::Directory
    }
}

/// Hit counts keyed by line. A count of `-1` marks a line that is not
/// instrumented.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LineCoverage(pub BTreeMap<u32, i64>);

impl LineCoverage {
    pub fn hits(&self, line: u32) -> Option<i64> {
        self.0.get(&line).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.0.iter().map(|(line, hits)| (*line, *hits))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u32, i64)> for LineCoverage {
    fn from_iter<I: IntoIterator<Item = (u32, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// The backend has shipped both shapes: a dense array indexed by line, and an
// object keyed by the line number as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLineCoverage {
    Dense(Vec<Option<i64>>),
    Sparse(BTreeMap<String, Option<i64>>),
}

impl<'de> Deserialize<'de> for LineCoverage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let lines = match RawLineCoverage::deserialize(deserializer)? {
            RawLineCoverage::Dense(counts) => counts
                .into_iter()
                .enumerate()
                .filter_map(|(index, hits)| Some((index as u32, hits?)))
                .collect(),
            RawLineCoverage::Sparse(counts) => {
                let mut lines = BTreeMap::new();
                for (key, hits) in counts {
                    let line = key
                        .parse::<u32>()
                        .map_err(|_| D::Error::custom(format!("invalid line number: {key}")))?;
                    if let Some(hits) = hits {
                        lines.insert(line, hits);
                    }
                }
                lines
            }
        };

        Ok(LineCoverage(lines))
    }
}

/// One point of a path's coverage history, one per push.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// Push date, in seconds since the epoch.
    pub date: i64,

    pub coverage: Option<f64>,

    pub changeset: String,
}

impl HistoryPoint {
    pub fn pushed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Filters {
    #[serde(default)]
    pub platforms: Vec<String>,

    #[serde(default)]
    pub suites: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct LatestRevision {
    pub latest_rev: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChangesetSummary {
    #[serde(default)]
    pub commit_added: u64,

    #[serde(default)]
    pub commit_covered: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The zero-coverage report artifact, with file entries normalized to
/// [`FileRecord`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ZeroCoverageReport {
    pub files: Vec<FileRecord>,
    pub revision: String,
}

#[derive(Deserialize)]
pub(crate) struct RawZeroCoverageReport {
    #[serde(default)]
    pub files: Vec<ZeroCoverageFile>,

    pub hg_revision: Option<String>,

    pub github_revision: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ZeroCoverageFile {
    pub name: String,

    #[serde(default)]
    pub funcs: u64,

    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub commits: u64,

    #[serde(
        default,
        alias = "firstPushDate",
        deserialize_with = "push_date::deserialize"
    )]
    pub first_push_date: Option<DateTime<Utc>>,

    #[serde(
        default,
        alias = "lastPushDate",
        deserialize_with = "push_date::deserialize"
    )]
    pub last_push_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub uncovered: bool,
}

impl From<ZeroCoverageFile> for FileRecord {
    fn from(file: ZeroCoverageFile) -> Self {
        FileRecord {
            path: file.name,
            kind: RecordType::File,
            funcs: file.funcs,
            size: file.size,
            commits: file.commits,
            first_push_date: file.first_push_date,
            last_push_date: file.last_push_date,
            uncovered: file.uncovered,
            ..Default::default()
        }
    }
}

/// Lenient decoding of push timestamps.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, and integer seconds
/// since the epoch. Anything else decodes to `None`.
pub mod push_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        FractionalSeconds(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Raw>::deserialize(deserializer)?;

        Ok(match raw {
            Some(Raw::Seconds(secs)) => DateTime::from_timestamp(secs, 0),
            Some(Raw::FractionalSeconds(secs)) => DateTime::from_timestamp(secs as i64, 0),
            Some(Raw::Text(text)) => parse(&text),
            None => None,
        })
    }

    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();

        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Some(date.with_timezone(&Utc));
        }

        if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return Some(date.and_utc());
        }

        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|date| date.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_directory_record() -> anyhow::Result<()> {
        let text = r#"{
            "path": "dom",
            "type": "directory",
            "coveragePercent": 42.5,
            "changeset": "abcdef",
            "children": [
                {"path": "dom/base", "type": "directory", "coveragePercent": 40.0},
                {"path": "dom/moz.build", "type": "file", "coveragePercent": 0.0}
            ]
        }"#;

        let record: FileRecord = serde_json::from_str(text)?;

        assert!(record.is_directory());
        assert_eq!(record.children.len(), 2);
        assert_eq!(record.children[1].kind, RecordType::File);
        assert_eq!(record.changeset.as_deref(), Some("abcdef"));
        assert!(record.coverage.is_none());

        Ok(())
    }

    #[test]
    fn test_dense_line_coverage() -> anyhow::Result<()> {
        let text = r#"{"path": "a.cpp", "type": "file", "coverage": [-1, 0, 3, null]}"#;
        let record: FileRecord = serde_json::from_str(text)?;

        let expected: LineCoverage = [(0, -1), (1, 0), (2, 3)].into_iter().collect();
        assert_eq!(record.coverage, Some(expected));

        Ok(())
    }

    #[test]
    fn test_sparse_line_coverage() -> anyhow::Result<()> {
        let text = r#"{"3": 5, "4": 0, "9": null}"#;
        let coverage: LineCoverage = serde_json::from_str(text)?;

        assert_eq!(coverage.hits(3), Some(5));
        assert_eq!(coverage.hits(4), Some(0));
        assert_eq!(coverage.hits(9), None);
        assert_eq!(coverage.len(), 2);

        Ok(())
    }

    #[test]
    fn test_sparse_line_coverage_rejects_bad_keys() {
        let result = serde_json::from_str::<LineCoverage>(r#"{"three": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_push_date_formats() {
        let expected = Utc.with_ymd_and_hms(2019, 3, 4, 0, 0, 0).single();

        assert_eq!(push_date::parse("2019-03-04"), expected);
        assert_eq!(push_date::parse("2019-03-04 00:00:00"), expected);
        assert_eq!(push_date::parse("2019-03-04T00:00:00Z"), expected);
        assert_eq!(push_date::parse("2019-03-04T01:00:00+01:00"), expected);
        assert_eq!(push_date::parse("yesterday"), None);
    }

    #[test]
    fn test_zero_coverage_file() -> anyhow::Result<()> {
        let text = r#"{
            "name": "dom/base/Foo.cpp",
            "funcs": 3,
            "first_push_date": "2017-01-02",
            "last_push_date": 1546300800,
            "size": 1024,
            "commits": 7,
            "uncovered": true
        }"#;

        let file: ZeroCoverageFile = serde_json::from_str(text)?;
        let record = FileRecord::from(file);

        assert_eq!(record.path, "dom/base/Foo.cpp");
        assert_eq!(record.funcs, 3);
        assert_eq!(record.commits, 7);
        assert!(record.uncovered);
        assert_eq!(
            record.last_push_date,
            Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).single()
        );

        Ok(())
    }
}
