// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use coverage_client::{FileRecord, LineCoverage};

use crate::route::{RouteState, PATH, REVISION, VIEW};

pub const ROOT_NAME: &str = "mozilla-central";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NavLink {
    pub name: String,
    pub route: String,
}

/// Breadcrumbs from the repository root down to `path`.
pub fn build_navbar(route: &RouteState, path: &str, revision: &str) -> Vec<NavLink> {
    let path = path.strip_suffix('/').unwrap_or(path);

    let mut links = vec![NavLink {
        name: ROOT_NAME.to_owned(),
        route: route.build_route([(PATH, ""), (REVISION, revision)]),
    }];

    let mut base = String::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        if !base.is_empty() {
            base.push('/');
        }
        base.push_str(segment);

        links.push(NavLink {
            name: segment.to_owned(),
            route: route.build_route([(PATH, base.as_str()), (REVISION, revision)]),
        });
    }

    links
}

/// A hit count abbreviated for display.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Hits {
    pub nb: i64,
    pub unit: &'static str,
}

impl fmt::Display for Hits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.nb, self.unit)
    }
}

pub fn format_hits(count: i64) -> Option<Hits> {
    if count >= 1_000_000 {
        Some(Hits {
            nb: count / 1_000_000,
            unit: "M",
        })
    } else if count >= 1_000 {
        Some(Hits {
            nb: count / 1_000,
            unit: "k",
        })
    } else if count > 0 {
        Some(Hits {
            nb: count,
            unit: "",
        })
    } else {
        None
    }
}

/// Decade bucket of a percentage, used for coloring.
pub fn coverage_range(percent: f64) -> u32 {
    let percent = percent.floor().clamp(0.0, 100.0) as u32;
    percent / 10 * 10
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirectoryRow {
    /// Path relative to the listed directory.
    pub name: String,
    pub path: String,
    pub percent: u32,
    pub range: u32,
    pub route: String,
}

/// Children of a directory, least covered first.
pub fn directory_rows(route: &RouteState, dir: &str, children: &[FileRecord]) -> Vec<DirectoryRow> {
    let mut children: Vec<&FileRecord> = children.iter().collect();
    children.sort_by(|a, b| a.coverage_percent.total_cmp(&b.coverage_percent));

    let dir = dir.trim_end_matches('/');

    children
        .into_iter()
        .map(|child| {
            let name = if dir.is_empty() {
                child.path.as_str()
            } else {
                child
                    .path
                    .strip_prefix(dir)
                    .map(|rest| rest.trim_start_matches('/'))
                    .unwrap_or(&child.path)
            };

            let percent = child.coverage_percent.floor().max(0.0) as u32;

            DirectoryRow {
                name: name.to_owned(),
                path: child.path.clone(),
                percent,
                range: coverage_range(child.coverage_percent),
                route: route.build_route([(PATH, child.path.as_str()), (VIEW, child.kind.as_str())]),
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineClass {
    Covered,
    Uncovered,
    Selected,
    None,
}

impl LineClass {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Covered => "covered",
            Self::Uncovered => "uncovered",
            Self::Selected => "selected",
            Self::None => "",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLine {
    /// Zero-based index, the key into the coverage map.
    pub nb: u32,
    pub hits: Option<Hits>,
    pub coverage: Option<i64>,
    pub line: String,
    pub class: LineClass,
    pub route: String,
}

/// Pair each source line with its coverage. Lines that are not instrumented
/// get no class; `selected` overrides any class.
pub fn file_lines(
    route: &RouteState,
    source: &str,
    coverage: Option<&LineCoverage>,
    selected: Option<u32>,
) -> Vec<SourceLine> {
    source
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            let nb = index as u32;
            let count = coverage.and_then(|coverage| coverage.hits(nb));

            let (mut class, hits) = match count {
                Some(count) if count >= 0 => {
                    let class = if count > 0 {
                        LineClass::Covered
                    } else {
                        LineClass::Uncovered
                    };
                    (class, format_hits(count))
                }
                _ => (LineClass::None, None),
            };

            if selected == Some(nb) {
                class = LineClass::Selected;
            }

            SourceLine {
                nb,
                hits,
                coverage: count,
                line: if line.is_empty() {
                    " ".to_owned()
                } else {
                    line.to_owned()
                },
                class,
                route: route.build_route([("line", nb.to_string().as_str())]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage_client::RecordType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_navbar() {
        let route = RouteState::parse("#view=directory&cpp=off");
        let links = build_navbar(&route, "dom/base/", "abc");

        let names: Vec<&str> = links.iter().map(|link| link.name.as_str()).collect();
        assert_eq!(names, vec!["mozilla-central", "dom", "base"]);

        assert_eq!(
            links[0].route,
            "#revision=abc&path=&view=directory&cpp=off"
        );
        assert_eq!(
            links[2].route,
            "#revision=abc&path=dom%2Fbase&view=directory&cpp=off"
        );
    }

    #[test]
    fn test_navbar_root() {
        let links = build_navbar(&RouteState::default(), "", "latest");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_format_hits() {
        let shown = |count| format_hits(count).map(|hits| hits.to_string());

        assert_eq!(shown(-1), None);
        assert_eq!(shown(0), None);
        assert_eq!(shown(7), Some("7".into()));
        assert_eq!(shown(999), Some("999".into()));
        assert_eq!(shown(1_000), Some("1k".into()));
        assert_eq!(shown(45_678), Some("45k".into()));
        assert_eq!(shown(1_000_000), Some("1M".into()));
        assert_eq!(shown(12_345_678), Some("12M".into()));
    }

    #[test]
    fn test_coverage_range() {
        assert_eq!(coverage_range(0.0), 0);
        assert_eq!(coverage_range(9.99), 0);
        assert_eq!(coverage_range(10.0), 10);
        assert_eq!(coverage_range(57.3), 50);
        assert_eq!(coverage_range(100.0), 100);
    }

    #[test]
    fn test_directory_rows() {
        let child = |path: &str, percent, kind| FileRecord {
            path: path.to_owned(),
            coverage_percent: percent,
            kind,
            ..Default::default()
        };

        let children = vec![
            child("dom/base", 72.8, RecordType::Directory),
            child("dom/moz.build.cpp", 3.2, RecordType::File),
            child("dom/media", 45.0, RecordType::Directory),
        ];

        let rows = directory_rows(&RouteState::default(), "dom", &children);

        let summary: Vec<(&str, u32, u32)> = rows
            .iter()
            .map(|row| (row.name.as_str(), row.percent, row.range))
            .collect();
        assert_eq!(
            summary,
            vec![("moz.build.cpp", 3, 0), ("media", 45, 40), ("base", 72, 70)]
        );
        assert_eq!(
            rows[0].route,
            "#revision=latest&path=dom%2Fmoz.build.cpp&view=file"
        );
    }

    #[test]
    fn test_file_lines() {
        let coverage: LineCoverage = [(0, -1), (1, 0), (2, 1500)].into_iter().collect();
        let lines = file_lines(
            &RouteState::default(),
            "int a;\n\nreturn a;\n}",
            Some(&coverage),
            Some(3),
        );

        let classes: Vec<LineClass> = lines.iter().map(|line| line.class).collect();
        assert_eq!(
            classes,
            vec![
                LineClass::None,
                LineClass::Uncovered,
                LineClass::Covered,
                LineClass::Selected,
            ]
        );
        assert_eq!(lines[1].line, " ");
        assert_eq!(lines[2].hits.map(|hits| hits.to_string()), Some("1k".into()));
        assert_eq!(lines[0].coverage, Some(-1));
        assert_eq!(lines[3].route, "#revision=latest&path=&line=3");
    }
}
