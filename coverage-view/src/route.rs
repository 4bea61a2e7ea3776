// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use coverage_client::REV_LATEST;

pub const REVISION: &str = "revision";
pub const PATH: &str = "path";
pub const PLATFORM: &str = "platform";
pub const SUITE: &str = "suite";
pub const VIEW: &str = "view";

/// The whole navigable state of a front end, as carried by the URL hash.
///
/// Hashes are `key=value` pairs joined by `&`, each side percent-encoded.
/// A missing `revision` means `latest` and a missing `path` means the
/// repository root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteState {
    pub revision: String,
    pub path: String,
    pub platform: Option<String>,
    pub suite: Option<String>,
    pub view: Option<String>,

    /// Everything else: filter toggles (`on`/`off`), `last_push`, `line`.
    pub params: BTreeMap<String, String>,
}

impl Default for RouteState {
    fn default() -> Self {
        Self {
            revision: REV_LATEST.to_owned(),
            path: String::new(),
            platform: None,
            suite: None,
            view: None,
            params: BTreeMap::new(),
        }
    }
}

impl RouteState {
    /// Decode a URL hash, with or without its leading `#`.
    ///
    /// Pairs without a key are ignored. A pair without `=` sets an empty
    /// value. Only the first `=` separates key from value.
    pub fn parse(hash: &str) -> Self {
        let hash = hash.strip_prefix('#').unwrap_or(hash);
        let mut route = RouteState::default();

        for pair in hash.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                continue;
            }

            let key = url_escape::decode(key);
            let value = url_escape::decode(value);
            route.set(&key, &value);
        }

        if route.revision.is_empty() {
            route.revision = REV_LATEST.to_owned();
        }

        route
    }

    pub fn to_hash(&self) -> String {
        let pairs: Vec<String> = self
            .pairs()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    url_escape::encode_component(key),
                    url_escape::encode_component(value)
                )
            })
            .collect();

        format!("#{}", pairs.join("&"))
    }

    /// Key-value pairs in encoding order: revision and path first, then the
    /// optional well-known keys, then the rest sorted by key.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        let known = [
            (REVISION, Some(self.revision.as_str())),
            (PATH, Some(self.path.as_str())),
            (PLATFORM, self.platform.as_deref()),
            (SUITE, self.suite.as_deref()),
            (VIEW, self.view.as_deref()),
        ];

        known
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .chain(
                self.params
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            REVISION => Some(&self.revision),
            PATH => Some(&self.path),
            PLATFORM => self.platform.as_deref(),
            SUITE => self.suite.as_deref(),
            VIEW => self.view.as_deref(),
            _ => self.params.get(key).map(String::as_str),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let value = value.to_owned();

        match key {
            REVISION => self.revision = value,
            PATH => self.path = value,
            PLATFORM => self.platform = Some(value),
            SUITE => self.suite = Some(value),
            VIEW => self.view = Some(value),
            _ => {
                self.params.insert(key.to_owned(), value);
            }
        }
    }

    /// A copy of this route with `params` applied on top.
    pub fn merge<'a>(&self, params: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut route = self.clone();
        for (key, value) in params {
            route.set(key, value);
        }
        route
    }

    /// Hash for this route with `params` applied on top.
    pub fn build_route<'a>(&self, params: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
        self.merge(params).to_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        for hash in ["", "#", "#&&", "#=nokey"] {
            let route = RouteState::parse(hash);
            assert_eq!(route, RouteState::default(), "hash {:?}", hash);
        }
    }

    #[test]
    fn test_parse() {
        let route = RouteState::parse(
            "#revision=abc123&path=dom%2Fbase&view=zero&cpp=off&last_push=one_year&platform=linux",
        );

        assert_eq!(route.revision, "abc123");
        assert_eq!(route.path, "dom/base");
        assert_eq!(route.view.as_deref(), Some("zero"));
        assert_eq!(route.platform.as_deref(), Some("linux"));
        assert_eq!(route.suite, None);
        assert_eq!(route.get("cpp"), Some("off"));
        assert_eq!(route.get("last_push"), Some("one_year"));
        assert_eq!(route.get("js"), None);
    }

    #[test]
    fn test_empty_revision_means_latest() {
        let route = RouteState::parse("revision=&path=a");
        assert_eq!(route.revision, REV_LATEST);
        assert_eq!(route.path, "a");
    }

    #[test]
    fn test_pair_separators() {
        let route = RouteState::parse("#flag&path=a=b");
        assert_eq!(route.get("flag"), Some(""));
        assert_eq!(route.path, "a=b");
    }

    #[test]
    fn test_to_hash() {
        let mut route = RouteState::default();
        route.path = "dom/base".into();
        route.view = Some("directory".into());
        route.set("headers", "on");

        assert_eq!(
            route.to_hash(),
            "#revision=latest&path=dom%2Fbase&view=directory&headers=on"
        );
    }

    #[test]
    fn test_round_trip() {
        let mut states = vec![RouteState::default()];

        let mut full = RouteState {
            revision: "0123456789ab".into(),
            path: "js/src/jit/BitSet.cpp".into(),
            platform: Some("windows".into()),
            suite: Some("web-platform-tests".into()),
            view: Some("file".into()),
            params: BTreeMap::new(),
        };
        full.set("line", "42");
        full.set("third_party", "off");
        states.push(full);

        let mut odd = RouteState::default();
        odd.path = "a dir/with spaces/ünïcode#hash?.js".into();
        odd.set("k e y", "v%a/l");
        odd.platform = Some(String::new());
        states.push(odd);

        for state in states {
            let hash = state.to_hash();
            assert_eq!(RouteState::parse(&hash), state, "hash {}", hash);
        }
    }

    #[test]
    fn test_merge() {
        let route = RouteState::parse("#path=dom&cpp=off");
        let merged = route.merge([("path", "js"), ("view", "zero")]);

        assert_eq!(merged.path, "js");
        assert_eq!(merged.view.as_deref(), Some("zero"));
        assert_eq!(merged.get("cpp"), Some("off"));

        // Merging leaves the receiver untouched.
        assert_eq!(route.path, "dom");

        assert_eq!(
            route.build_route([("revision", "abc")]),
            "#revision=abc&path=dom&cpp=off"
        );
    }
}
