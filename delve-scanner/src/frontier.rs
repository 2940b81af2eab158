//! Breadth-first work queue for a single crawl root.

use crate::scope::{in_scope, normalize_url};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierState {
    Idle,
    Running,
    /// Queue drained
    Exhausted,
    /// Page budget spent with work left over
    BudgetReached,
}

/// FIFO queue plus visited set, bounded by a page budget.
///
/// The same URL may sit in the queue several times. [`Frontier::next_url`]
/// drops anything already visited, so each URL is handed out for processing
/// at most once.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<String>,
    visited: HashSet<String>,
    scope_prefix: String,
    pages: usize,
    max_pages: usize,
    state: FrontierState,
}

impl Frontier {
    pub fn new(root: &str, scope_prefix: String, max_pages: usize) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(root.to_string());

        Self {
            queue,
            visited: HashSet::new(),
            scope_prefix,
            pages: 0,
            max_pages,
            state: FrontierState::Idle,
        }
    }

    /// Next unvisited URL, or `None` once the frontier is finished.
    pub fn next_url(&mut self) -> Option<String> {
        if self.state == FrontierState::Idle {
            self.state = FrontierState::Running;
        }

        while !self.queue.is_empty() && self.pages < self.max_pages {
            let current = self.queue.pop_front().map(|u| normalize_url(&u))?;
            if current.is_empty() || self.visited.contains(&current) {
                continue;
            }
            return Some(current);
        }

        self.state = if self.queue.is_empty() {
            FrontierState::Exhausted
        } else {
            FrontierState::BudgetReached
        };
        None
    }

    /// Queue a resolved link if it is non-empty, in scope and not yet
    /// visited. Returns whether it was queued.
    pub fn enqueue(&mut self, url: &str) -> bool {
        let url = normalize_url(url);
        if url.is_empty() || !in_scope(&url, &self.scope_prefix) || self.visited.contains(&url) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Count one fully processed page against the budget.
    pub fn record_page(&mut self) {
        self.pages += 1;
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self) -> FrontierState {
        self.state
    }

    pub fn scope_prefix(&self) -> &str {
        &self.scope_prefix
    }
}
