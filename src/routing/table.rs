//! Route entries and their registration order.
//!
//! # Ordering
//! The routing engine matches in registration order, so the table order is
//! what decides precedence at request time:
//! 1. A middleware entry comes before every entry nested under its path
//! 2. Sibling segments are tried in reverse lexicographic order, which puts
//!    static segments (`count`) ahead of parameters (`:id`)
//! 3. Entries sharing one exact path follow the canonical method order
//!
//! Paths are compared segment by segment, each path being terminated by a
//! marker that sorts before any segment for middleware and after any segment
//! for verbs. This keeps the comparator a total order for every input set.

use std::cmp::Ordering;
use std::iter;

use crate::routing::classify::classify;
use crate::routing::method::RouteMethod;

/// One (method, route path, source file) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteEntry {
    pub method: RouteMethod,
    /// Slash-delimited pattern, always starting with `/`.
    pub route_path: String,
    /// Relative path of the route module this entry came from.
    pub source_path: String,
}

impl RouteEntry {
    fn steps(&self) -> impl Iterator<Item = Step<'_>> {
        let terminal = if self.method.is_middleware() {
            Step::MiddlewareEnd
        } else {
            Step::VerbEnd
        };
        segments(&self.route_path)
            .map(Step::Segment)
            .chain(iter::once(terminal))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    MiddlewareEnd,
    Segment(&'a str),
    VerbEnd,
}

impl Ord for Step<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Step::Segment(a), Step::Segment(b)) => b.cmp(a),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Step<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Step<'_> {
    fn rank(&self) -> u8 {
        match self {
            Step::MiddlewareEnd => 0,
            Step::Segment(_) => 1,
            Step::VerbEnd => 2,
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// True when `ancestor` is a proper path-segment prefix of `path`.
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    let mut outer = segments(ancestor);
    let mut inner = segments(path);
    loop {
        match (outer.next(), inner.next()) {
            (None, Some(_)) => return true,
            (Some(a), Some(b)) if a == b => continue,
            _ => return false,
        }
    }
}

/// The table comparator.
pub fn compare_entries(a: &RouteEntry, b: &RouteEntry) -> Ordering {
    a.steps()
        .cmp(b.steps())
        .then_with(|| a.method.cmp(&b.method))
}

/// Sort classified entries into registration order.
pub fn sort_entries(entries: Vec<RouteEntry>) -> OrderedRouteTable {
    OrderedRouteTable::sort(entries)
}

/// A sequence of route entries in registration order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedRouteTable {
    entries: Vec<RouteEntry>,
}

impl OrderedRouteTable {
    /// Sort a set of classified entries into registration order.
    pub fn sort(mut entries: Vec<RouteEntry>) -> Self {
        entries.sort_by(compare_entries);
        Self { entries }
    }

    /// Classify every candidate path, drop the non-routes and sort the rest.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::sort(paths.into_iter().filter_map(|p| classify(p.as_ref())).collect())
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Relative source paths, in table order.
    pub fn source_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.source_path.as_str())
    }

    pub fn into_entries(self) -> Vec<RouteEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a OrderedRouteTable {
    type Item = &'a RouteEntry;
    type IntoIter = std::slice::Iter<'a, RouteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
