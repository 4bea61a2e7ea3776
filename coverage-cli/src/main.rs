// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[macro_use]
extern crate log;

use std::io::{stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use coverage_client::{ClientConfig, CoverageClient, REV_LATEST};
use coverage_overlay::{
    annotate_frames, is_coverage_supported, revisions_from_links, summarize_changesets,
    CoverageMemo, Overlay, PageTarget, TextPage,
};
use coverage_view::filters::{LAST_PUSH, OFF, ON, ZERO_COVERAGE_FILTERS};
use coverage_view::route::{PATH, PLATFORM, REVISION, SUITE, VIEW};
use coverage_view::{CoverageLoader, RouteController, RouteState, VIEW_ZERO_COVERAGE};

mod render;

#[derive(Parser, Debug)]
#[command(name = "codecov", about = "Browse code coverage from a terminal")]
struct Opt {
    /// JSON client configuration. Defaults come from CODECOV_* variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Coverage of a directory or file.
    Path(PathOpt),

    /// Coverage history of a path.
    History(HistoryOpt),

    /// Most recent revision with coverage data.
    Latest,

    /// Platforms and suites known to the backend.
    Filters,

    /// Zero-coverage report for a directory.
    Zero(ZeroOpt),

    /// Lines added and covered by a set of changesets.
    Summary(SummaryOpt),

    /// Print a file with its covered and uncovered lines marked.
    Annotate(AnnotateOpt),

    /// Mark crash-report stack frames, given as hg annotate links.
    Frames(FramesOpt),

    /// Decode a route hash, optionally update it, and print it back.
    Route(RouteOpt),

    /// Load and render the view a route hash points at.
    Open(OpenOpt),

    Version,
}

#[derive(Args, Debug)]
struct BrowseOpt {
    #[arg(long, default_value = REV_LATEST)]
    revision: String,

    #[arg(long)]
    platform: Option<String>,

    #[arg(long)]
    suite: Option<String>,
}

#[derive(Args, Debug)]
struct PathOpt {
    #[arg(default_value = "")]
    path: String,

    #[command(flatten)]
    browse: BrowseOpt,
}

#[derive(Args, Debug)]
struct HistoryOpt {
    #[arg(default_value = "")]
    path: String,

    #[arg(long)]
    platform: Option<String>,

    #[arg(long)]
    suite: Option<String>,
}

#[derive(Args, Debug)]
struct ZeroOpt {
    #[arg(default_value = "")]
    dir: String,

    /// Turn a filter on, e.g. `headers` or `completely_uncovered`.
    #[arg(long = "with")]
    with: Vec<String>,

    /// Turn a filter off, e.g. `third_party` or `js`.
    #[arg(long = "without")]
    without: Vec<String>,

    /// One of all, one_year, two_years, older_than_two_years.
    #[arg(long)]
    last_push: Option<String>,
}

#[derive(Args, Debug)]
struct SummaryOpt {
    /// Revisions, or links to mozilla-central pushes.
    #[arg(required = true)]
    revisions: Vec<String>,
}

#[derive(Args, Debug)]
struct AnnotateOpt {
    path: String,

    #[arg(long, default_value = REV_LATEST)]
    revision: String,
}

#[derive(Args, Debug)]
struct FramesOpt {
    #[arg(required = true)]
    links: Vec<String>,
}

#[derive(Args, Debug)]
struct RouteOpt {
    hash: String,

    /// `key=value` pairs applied on top of the route.
    #[arg(long = "set")]
    set: Vec<String>,
}

#[derive(Args, Debug)]
struct OpenOpt {
    #[arg(default_value = "")]
    hash: String,
}

fn main() -> Result<()> {
    env_logger::init();

    let opt = Opt::parse();

    if let Command::Version = opt.command {
        println!("{}", clap::crate_version!());
        return Ok(());
    }

    let config = match &opt.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?,
    };
    debug!("config parsed");

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run(opt.command, config));

    if let Err(err) = &result {
        error!("error running command: {:#}", err);
    }

    result
}

async fn run(command: Command, config: ClientConfig) -> Result<()> {
    let client = Arc::new(CoverageClient::new(config));
    let mut out = stdout().lock();

    match command {
        Command::Path(opt) => {
            let route = RouteState::default().merge([
                (PATH, opt.path.as_str()),
                (REVISION, opt.browse.revision.as_str()),
            ]);
            let route = with_filters(route, opt.browse.platform, opt.browse.suite);
            let record = client
                .get_path_coverage(
                    &route.path,
                    Some(route.revision.as_str()),
                    route.platform.as_deref(),
                    route.suite.as_deref(),
                )
                .await
                .with_context(|| format!("Failed to load coverage for {}", route.path))?;
            render::path(&mut out, &route, &record)?;
        }
        Command::History(opt) => {
            let history = client
                .get_history(&opt.path, opt.platform.as_deref(), opt.suite.as_deref())
                .await
                .context("Failed to load history")?;
            render::history(&mut out, &opt.path, history.as_deref())?;
        }
        Command::Latest => {
            writeln!(out, "{}", client.get_latest_revision().await?)?;
        }
        Command::Filters => {
            let filters = client.get_filters().await?;
            writeln!(out, "platforms: {}", filters.platforms.join(", "))?;
            writeln!(out, "suites: {}", filters.suites.join(", "))?;
        }
        Command::Zero(opt) => {
            let hash = zero_route(&opt)?.to_hash();
            open(&mut out, client, &hash).await?;
        }
        Command::Summary(opt) => {
            let mut revisions =
                revisions_from_links(opt.revisions.iter().map(String::as_str));
            revisions.extend(
                opt.revisions
                    .iter()
                    .filter(|revision| !revision.contains('/'))
                    .cloned(),
            );

            match summarize_changesets(&client, &revisions).await? {
                Some(coverage) => render::summary(&mut out, &coverage)?,
                None => writeln!(out, "no lines added")?,
            }
        }
        Command::Annotate(opt) => {
            if !is_coverage_supported(&opt.path) {
                warn!("coverage is not collected for {}", opt.path);
            }

            let source = client
                .get_source(&opt.path, Some(opt.revision.as_str()))
                .await
                .with_context(|| format!("Failed to load source of {}", opt.path))?;

            let target = PageTarget {
                revision: opt.revision,
                path: opt.path,
            };
            let memo = Arc::new(CoverageMemo::new(client));
            let mut overlay = Overlay::new(TextPage::new(target, &source), memo);
            overlay.toggle().await?;

            write!(out, "{}", overlay.page())?;
        }
        Command::Frames(opt) => {
            let frames = annotate_frames(&client, opt.links.iter().map(String::as_str))
                .await
                .context("Failed to load frame coverage")?;
            render::frames(&mut out, &frames)?;
        }
        Command::Route(opt) => {
            let route = RouteState::parse(&opt.hash);
            let params = opt
                .set
                .iter()
                .map(|pair| {
                    pair.split_once('=')
                        .with_context(|| format!("expected key=value, got {:?}", pair))
                })
                .collect::<Result<Vec<_>>>()?;

            let route = route.merge(params);
            for (key, value) in route.pairs() {
                writeln!(out, "{} = {}", key, value)?;
            }
            writeln!(out, "{}", route.to_hash())?;
        }
        Command::Open(opt) => {
            open(&mut out, client, &opt.hash).await?;
        }
        Command::Version => {}
    }

    Ok(())
}

fn with_filters(route: RouteState, platform: Option<String>, suite: Option<String>) -> RouteState {
    let mut route = route;
    if let Some(platform) = platform {
        route.set(PLATFORM, &platform);
    }
    if let Some(suite) = suite {
        route.set(SUITE, &suite);
    }
    route
}

fn zero_route(opt: &ZeroOpt) -> Result<RouteState> {
    let mut route =
        RouteState::default().merge([(VIEW, VIEW_ZERO_COVERAGE), (PATH, opt.dir.as_str())]);

    for (keys, value) in [(&opt.with, ON), (&opt.without, OFF)] {
        for key in keys {
            if !ZERO_COVERAGE_FILTERS.iter().any(|filter| filter.key == key.as_str()) {
                anyhow::bail!("unknown filter: {}", key);
            }
            route.set(key, value);
        }
    }

    if let Some(last_push) = &opt.last_push {
        route.set(LAST_PUSH, last_push);
    }

    Ok(route)
}

async fn open(out: &mut impl Write, client: Arc<CoverageClient>, hash: &str) -> Result<()> {
    let controller = RouteController::new(CoverageLoader::new(client));

    if let Some(view) = controller.navigate(hash).await? {
        render::view(out, &view, chrono::Utc::now())?;
    }

    Ok(())
}
