use crate::classify::Classification;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What happened to a URL handed out by the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageOutcome {
    Visited(Classification),
    /// Redirected onto a URL this root had already visited; processed again
    Revisited(Classification),
    RenderFailed,
    ExtractionFailed,
}

/// Links and form targets harvested from one rendered page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    pub links: Vec<String>,
    /// `(action, method)` with the action already resolved and normalized
    pub forms: Vec<(String, String)>,
}

/// Set of URLs that remembers insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl UrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the URL was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn sorted(&self) -> Vec<String> {
        let mut urls = self.order.clone();
        urls.sort();
        urls
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

impl Serialize for UrlSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.order.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UrlSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let urls = Vec::<String>::deserialize(deserializer)?;
        let mut set = UrlSet::new();
        for url in urls {
            set.insert(url);
        }
        Ok(set)
    }
}

impl<S: Into<String>> FromIterator<S> for UrlSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = UrlSet::new();
        for url in iter {
            set.insert(url);
        }
        set
    }
}

/// Everything one crawl root produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootResult {
    pub root: String,
    pub scope_prefix: String,
    pub vuln_candidates: UrlSet,
    pub directories: UrlSet,
    pub found_urls: UrlSet,
    pub post_endpoints: UrlSet,
    /// Pages counted against the budget
    pub pages_visited: usize,
    /// Set when the budget ran out with links still queued
    pub budget_reached: bool,
}

impl RootResult {
    pub fn new(root: String, scope_prefix: String) -> Self {
        Self {
            root,
            scope_prefix,
            ..Default::default()
        }
    }

    pub fn record(&mut self, url: &str, class: Classification) {
        match class {
            Classification::VulnCandidate => {
                self.vuln_candidates.insert(url);
            }
            Classification::Directory => {
                self.directories.insert(url);
            }
            Classification::Plain => {}
        }
        self.found_urls.insert(url);
    }

    /// All URLs across categories in flat-output order: found, candidates,
    /// POST endpoints, directories. May repeat a URL that sits in more than
    /// one category.
    pub fn all_urls(&self) -> impl Iterator<Item = &String> {
        self.found_urls
            .iter()
            .chain(self.vuln_candidates.iter())
            .chain(self.post_endpoints.iter())
            .chain(self.directories.iter())
    }
}
