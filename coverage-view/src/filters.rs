// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use chrono::{DateTime, Months, Utc};
use coverage_client::FileRecord;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::route::RouteState;

pub const ON: &str = "on";
pub const OFF: &str = "off";

pub const LAST_PUSH: &str = "last_push";

/// A checkbox of the zero-coverage menu, keyed by its route parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FilterToggle {
    pub key: &'static str,
    pub name: &'static str,
    pub default_on: bool,
}

pub const ZERO_COVERAGE_FILTERS: &[FilterToggle] = &[
    FilterToggle {
        key: "third_party",
        name: "Show third-party files",
        default_on: true,
    },
    FilterToggle {
        key: "headers",
        name: "Show headers",
        default_on: false,
    },
    FilterToggle {
        key: "completely_uncovered",
        name: "Show completely uncovered files only",
        default_on: false,
    },
    FilterToggle {
        key: "cpp",
        name: "C/C++",
        default_on: true,
    },
    FilterToggle {
        key: "js",
        name: "JavaScript",
        default_on: true,
    },
    FilterToggle {
        key: "java",
        name: "Java",
        default_on: true,
    },
    FilterToggle {
        key: "rust",
        name: "Rust",
        default_on: true,
    },
];

/// Whether the toggle `key` is on, falling back to its menu default, then off.
pub fn is_enabled(route: &RouteState, key: &str) -> bool {
    match route.get(key) {
        Some(value) if !value.is_empty() => value == ON,
        _ => ZERO_COVERAGE_FILTERS
            .iter()
            .find(|toggle| toggle.key == key)
            .map_or(false, |toggle| toggle.default_on),
    }
}

#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum Language {
    Cpp,
    Js,
    Rust,
    Java,
}

impl Language {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Cpp => &[
                "c", "cpp", "cxx", "cc", "h", "hh", "hxx", "hpp", "inl", "inc",
            ],
            Self::Js => &["js", "jsm", "xml", "xul", "xhtml", "html"],
            Self::Rust => &["rs"],
            Self::Java => &["java"],
        }
    }

    /// Bucket for `path`, by file extension. Checked in the order C/C++,
    /// JavaScript, Rust, Java.
    pub fn classify(path: &str) -> Option<Self> {
        use strum::IntoEnumIterator;

        Self::iter().find(|language| {
            language.extensions().iter().any(|ext| {
                path.strip_suffix(ext)
                    .map_or(false, |stem| stem.ends_with('.'))
            })
        })
    }
}

/// Staleness buckets for the last push date.
#[derive(AsRefStr, Clone, Copy, Debug, Default, Display, EnumIter, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum LastPush {
    #[default]
    All,
    OneYear,
    TwoYears,
    OlderThanTwoYears,
}

impl LastPush {
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::OneYear => "0 < 1 year",
            Self::TwoYears => "1 < 2 years",
            Self::OlderThanTwoYears => "Older than 2 years",
        }
    }

    /// Inclusive `(lower, upper)` bounds relative to `now`, or `None` for
    /// [`LastPush::All`]. Years are calendar years.
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let years_ago = |years: u32| {
            now.checked_sub_months(Months::new(12 * years))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        };

        match self {
            Self::All => None,
            Self::OneYear => Some((years_ago(1), now)),
            Self::TwoYears => Some((years_ago(2), years_ago(1))),
            Self::OlderThanTwoYears => Some((DateTime::<Utc>::MIN_UTC, years_ago(2))),
        }
    }
}

/// Filter settings, read once from a route.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FilterOptions {
    pub third_party: bool,
    pub headers: bool,
    pub completely_uncovered: bool,
    pub cpp: bool,
    pub js: bool,
    pub java: bool,
    pub rust: bool,
    pub last_push: LastPush,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self::from_route(&RouteState::default())
    }
}

impl FilterOptions {
    pub fn from_route(route: &RouteState) -> Self {
        let last_push = route
            .get(LAST_PUSH)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();

        Self {
            third_party: is_enabled(route, "third_party"),
            headers: is_enabled(route, "headers"),
            completely_uncovered: is_enabled(route, "completely_uncovered"),
            cpp: is_enabled(route, "cpp"),
            js: is_enabled(route, "js"),
            java: is_enabled(route, "java"),
            rust: is_enabled(route, "rust"),
            last_push,
        }
    }

    pub fn language_enabled(&self, language: Language) -> bool {
        match language {
            Language::Cpp => self.cpp,
            Language::Js => self.js,
            Language::Rust => self.rust,
            Language::Java => self.java,
        }
    }
}

/// Drop records under a third-party prefix, unless third-party files are shown.
pub fn filter_third_party(
    files: Vec<FileRecord>,
    show: bool,
    prefixes: &[String],
) -> Vec<FileRecord> {
    if show {
        return files;
    }

    files
        .into_iter()
        .filter(|file| !prefixes.iter().any(|prefix| file.path.starts_with(prefix)))
        .collect()
}

/// Keep directories, and files whose language is enabled.
///
/// Files in no known language are dropped with a warning.
pub fn filter_languages(files: Vec<FileRecord>, options: &FilterOptions) -> Vec<FileRecord> {
    files
        .into_iter()
        .filter(|file| {
            if file.is_directory() {
                return true;
            }

            match Language::classify(&file.path) {
                Some(language) => options.language_enabled(language),
                None => {
                    warn!("unknown language for {}", file.path);
                    false
                }
            }
        })
        .collect()
}

pub fn filter_headers(files: Vec<FileRecord>, show: bool) -> Vec<FileRecord> {
    if show {
        return files;
    }

    files
        .into_iter()
        .filter(|file| !file.path.ends_with(".h"))
        .collect()
}

pub fn filter_completely_uncovered(files: Vec<FileRecord>, only: bool) -> Vec<FileRecord> {
    if !only {
        return files;
    }

    files.into_iter().filter(|file| file.uncovered).collect()
}

/// Keep records whose last push falls in the `last_push` bucket.
///
/// While a bucket other than `All` is selected, records without a push date
/// are dropped.
pub fn filter_last_push_date(
    files: Vec<FileRecord>,
    last_push: LastPush,
    now: DateTime<Utc>,
) -> Vec<FileRecord> {
    let (lower, upper) = match last_push.bounds(now) {
        Some(bounds) => bounds,
        None => return files,
    };

    files
        .into_iter()
        .filter(|file| {
            file.last_push_date
                .map_or(false, |date| lower <= date && date <= upper)
        })
        .collect()
}

/// Every filter, in menu order.
pub fn apply_filters(
    files: Vec<FileRecord>,
    options: &FilterOptions,
    third_party_prefixes: &[String],
    now: DateTime<Utc>,
) -> Vec<FileRecord> {
    let files = filter_third_party(files, options.third_party, third_party_prefixes);
    let files = filter_languages(files, options);
    let files = filter_headers(files, options.headers);
    let files = filter_completely_uncovered(files, options.completely_uncovered);
    filter_last_push_date(files, options.last_push, now)
}
