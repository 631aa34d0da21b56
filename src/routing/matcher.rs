//! Path pattern matching used by the ordered engine.
//!
//! # Responsibilities
//! - Parse `/a/:id/b` style patterns into static and parameter segments
//! - Match request paths exactly (verb routes) or by segment prefix (middleware)
//! - Capture parameter values for handlers
//!
//! # Design Decisions
//! - Matching is segment-wise: `/me` never matches `/meme`
//! - Static segments are case-sensitive
//! - Empty segments are ignored, so trailing slashes do not matter
//! - No regex, no wildcards

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Static(String),
    Param(String),
}

/// A compiled route path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => PatternSegment::Param(name.to_string()),
                None => PatternSegment::Static(s.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match the whole request path.
    pub fn match_exact(&self, path: &str) -> Option<PathParams> {
        self.match_segments(path, false)
    }

    /// Match when this pattern covers the leading segments of the request path.
    pub fn match_prefix(&self, path: &str) -> Option<PathParams> {
        self.match_segments(path, true)
    }

    fn match_segments(&self, path: &str, allow_rest: bool) -> Option<PathParams> {
        let mut params = PathParams::default();
        let mut actual = path.split('/').filter(|s| !s.is_empty());

        for expected in &self.segments {
            let segment = actual.next()?;
            match expected {
                PatternSegment::Static(s) if s == segment => {}
                PatternSegment::Static(_) => return None,
                PatternSegment::Param(name) => params.push(name.clone(), segment.to_string()),
            }
        }

        if allow_rest || actual.next().is_none() {
            Some(params)
        } else {
            None
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parameter values captured by the layer currently handling a request.
///
/// Inserted into request extensions before each handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
