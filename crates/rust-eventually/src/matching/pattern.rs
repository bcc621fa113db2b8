//! Pattern types for stream matching.
//!
//! A [`Pattern`] is either a literal substring or a compiled regular
//! expression. Matching is a pure function over a cursor-bounded window of
//! text; callers decide which window to pass.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::cache::GLOBAL_CACHE;

/// A pattern that can be searched for in stream content.
#[derive(Clone)]
pub enum Pattern {
    /// Match an exact substring.
    Literal(String),

    /// Match a regular expression.
    Regex(CompiledRegex),
}

impl Pattern {
    /// Create a literal pattern.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Create a regex pattern, compiling through the global cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let regex = GLOBAL_CACHE.get_or_compile(pattern)?;
        Ok(Self::Regex(CompiledRegex::new(pattern.to_string(), regex)))
    }

    /// Create a regex pattern that matches `text` literally.
    ///
    /// Useful when a literal needs to be combined with regex-only features
    /// later, such as capture groups around it.
    #[must_use]
    pub fn quoted(text: &str) -> Self {
        let escaped = regex::escape(text);
        match GLOBAL_CACHE.get_or_compile(&escaped) {
            Ok(regex) => Self::Regex(CompiledRegex::new(escaped, regex)),
            // An escaped string is always a valid regex; fall back to a literal anyway.
            Err(_) => Self::Literal(text.to_string()),
        }
    }

    /// Get the pattern as a string for display purposes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(r) => r.pattern(),
        }
    }

    /// Number of capture groups, excluding the implicit whole-match group.
    #[must_use]
    pub fn capture_groups(&self) -> usize {
        match self {
            Self::Literal(_) => 0,
            Self::Regex(r) => r.capture_groups(),
        }
    }

    /// Find the first occurrence of this pattern in `text`.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<PatternMatch> {
        match self {
            Self::Literal(s) => text.find(s.as_str()).map(|pos| PatternMatch {
                start: pos,
                end: pos + s.len(),
                text: s.clone(),
                captures: Vec::new(),
            }),
            Self::Regex(r) => r.captures_at(text, 0),
        }
    }

    /// Check if this pattern occurs anywhere in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(s) => text.contains(s.as_str()),
            Self::Regex(r) => r.regex.is_match(text),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<&Pattern> for Pattern {
    fn from(p: &Pattern) -> Self {
        p.clone()
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(CompiledRegex::new(regex.as_str().to_string(), Arc::new(regex)))
    }
}

/// A compiled regular expression with its source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    regex: Arc<Regex>,
}

impl CompiledRegex {
    /// Create a new compiled regex.
    #[must_use]
    pub const fn new(pattern: String, regex: Arc<Regex>) -> Self {
        Self { pattern, regex }
    }

    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Get the compiled regex.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Number of explicit capture groups.
    #[must_use]
    pub fn capture_groups(&self) -> usize {
        self.regex.captures_len().saturating_sub(1)
    }

    /// Match starting the search at byte offset `start`.
    fn captures_at(&self, text: &str, start: usize) -> Option<PatternMatch> {
        self.regex.captures_at(text, start).and_then(|caps| {
            let whole = caps.get(0)?;
            Some(PatternMatch {
                start: whole.start(),
                end: whole.end(),
                text: whole.as_str().to_string(),
                captures: caps
                    .iter()
                    .skip(1) // Skip the full match
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect(),
            })
        })
    }
}

/// Result of a successful pattern search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Start position of the match in the searched text.
    pub start: usize,
    /// End position of the match in the searched text.
    pub end: usize,
    /// The matched text.
    pub text: String,
    /// Capture groups; `None` for groups that did not participate.
    pub captures: Vec<Option<String>>,
}

impl PatternMatch {
    /// Get the length of the match.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the match is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shift positions by `offset`, turning window positions into stream positions.
    #[must_use]
    pub fn offset_by(mut self, offset: usize) -> Self {
        self.start += offset;
        self.end += offset;
        self
    }
}

/// Find the first occurrence of `pattern` in `content`.
///
/// `content` is expected to be a cursor-bounded window; positions in the
/// result are relative to it.
#[must_use]
pub fn find_first(content: &str, pattern: &Pattern) -> Option<PatternMatch> {
    pattern.find(content)
}
