// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use coverage_client::{FileRecord, HistoryPoint};
use coverage_overlay::{AnnotatedFrame, ChangesetsCoverage, LineColor};
use coverage_view::display::{build_navbar, directory_rows, file_lines, LineClass, NavLink};
use coverage_view::{zero_coverage_view, LoadedView, RouteState};

const DATE_FORMAT: &str = "%d/%m/%Y";

fn navbar(out: &mut impl Write, links: &[NavLink]) -> Result<()> {
    let names: Vec<&str> = links.iter().map(|link| link.name.as_str()).collect();
    writeln!(out, "{}", names.join(" / "))?;
    Ok(())
}

fn date(date: Option<DateTime<Utc>>) -> String {
    date.map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_owned())
}

pub fn view(out: &mut impl Write, view: &LoadedView, now: DateTime<Utc>) -> Result<()> {
    match view {
        LoadedView::Zero {
            route,
            report,
            third_party,
        } => {
            let zero = zero_coverage_view(report, route, third_party, now);

            navbar(out, &zero.navbar)?;
            writeln!(
                out,
                "{} files without coverage @ {}",
                zero.total, zero.revision
            )?;

            for entry in &zero.entries {
                let stats = &entry.entry.stats;
                let name = if entry.entry.is_leaf() {
                    entry.entry.name.clone()
                } else {
                    format!("{}/ ({} files)", entry.entry.name, stats.children)
                };
                writeln!(
                    out,
                    "{:>6} funcs {:>8} bytes {:>5} commits  first {:>10}  last {:>10}  {}",
                    stats.funcs,
                    stats.size,
                    stats.commits,
                    date(stats.first_push_date),
                    date(stats.last_push_date),
                    name
                )?;
            }
        }
        LoadedView::Directory {
            route,
            coverage,
            history,
            ..
        } => {
            history_summary(out, &route.path, history.as_deref())?;
            path(out, route, coverage)?;
        }
        LoadedView::File {
            route,
            coverage,
            source,
            ..
        } => {
            navbar(out, &build_navbar(route, &coverage.path, &route.revision))?;

            let selected = route.get("line").and_then(|line| line.parse().ok());
            for line in file_lines(route, source, coverage.coverage.as_ref(), selected) {
                let marker = match line.class {
                    LineClass::Covered => '+',
                    LineClass::Uncovered => '-',
                    LineClass::Selected => '>',
                    LineClass::None => ' ',
                };
                let hits = line.hits.map(|hits| hits.to_string()).unwrap_or_default();
                writeln!(out, "{} {:>5} {:>5} | {}", marker, hits, line.nb + 1, line.line)?;
            }
        }
    }

    Ok(())
}

/// A directory listing, or the summary line of a file.
pub fn path(out: &mut impl Write, route: &RouteState, record: &FileRecord) -> Result<()> {
    navbar(out, &build_navbar(route, &route.path, &route.revision))?;

    if let Some(changeset) = &record.changeset {
        writeln!(out, "changeset {}", changeset)?;
    }
    writeln!(out, "{:.2}% covered", record.coverage_percent)?;

    for row in directory_rows(route, &route.path, &record.children) {
        writeln!(out, "{:>3}% [{:>3}] {}", row.percent, row.range, row.name)?;
    }

    Ok(())
}

fn history_summary(
    out: &mut impl Write,
    path: &str,
    history: Option<&[HistoryPoint]>,
) -> Result<()> {
    let display_path = if path.is_empty() {
        coverage_view::display::ROOT_NAME
    } else {
        path
    };

    match history.and_then(|points| points.last()) {
        Some(point) => writeln!(
            out,
            "{} pushes, last {} ({:.2}%)",
            history.map_or(0, |points| points.len()),
            short(&point.changeset),
            point.coverage.unwrap_or_default()
        )?,
        None => writeln!(out, "No history data for {}", display_path)?,
    }

    Ok(())
}

/// Every history point, oldest first.
pub fn history(
    out: &mut impl Write,
    path: &str,
    history: Option<&[HistoryPoint]>,
) -> Result<()> {
    let points = match history {
        Some(points) => points,
        None => return history_summary(out, path, None),
    };

    for point in points {
        let pushed = point
            .pushed_at()
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        let coverage = point
            .coverage
            .map(|coverage| format!("{:.2}%", coverage))
            .unwrap_or_else(|| "-".to_owned());

        writeln!(out, "{:>10} {:>7} {}", pushed, coverage, short(&point.changeset))?;
    }

    Ok(())
}

pub fn summary(out: &mut impl Write, coverage: &ChangesetsCoverage) -> Result<()> {
    writeln!(out, "Code Coverage: {}", coverage)?;
    for (revision, summary) in &coverage.changesets {
        writeln!(
            out,
            "  {}: {}/{}",
            revision, summary.commit_covered, summary.commit_added
        )?;
    }
    Ok(())
}

/// One line per frame: `+` covered, `-` uncovered, blank when unknown.
pub fn frames(out: &mut impl Write, frames: &[AnnotatedFrame]) -> Result<()> {
    for annotated in frames {
        let marker = match annotated.color {
            Some(LineColor::Covered) => '+',
            Some(LineColor::Uncovered) => '-',
            None => ' ',
        };
        let frame = &annotated.frame;
        writeln!(
            out,
            "{} {}:{} @ {}",
            marker, frame.path, frame.line, frame.revision
        )?;
    }
    Ok(())
}

fn short(revision: &str) -> &str {
    coverage_overlay::summary::short_revision(revision)
}
