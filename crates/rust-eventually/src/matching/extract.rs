//! Single-capture extraction of correlation identifiers.
//!
//! An [`Extractor`] wraps a regex with exactly one capture group. The arity is
//! checked when the extractor is built, so a wrong pattern fails fast instead
//! of silently returning the wrong group.

use std::fmt;

use super::pattern::{CompiledRegex, Pattern};
use crate::error::{EventuallyError, Result};

/// Pulls the value of a single capture group out of accumulated text.
#[derive(Clone)]
pub struct Extractor {
    regex: CompiledRegex,
}

impl Extractor {
    /// Compile an extractor.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::Regex`] for an invalid regex and
    /// [`EventuallyError::PatternContract`] unless it has exactly one capture group.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::from_pattern(Pattern::regex(pattern)?)
    }

    /// Build an extractor from an existing pattern.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::PatternContract`] for literals and for regexes
    /// that do not have exactly one capture group.
    pub fn from_pattern(pattern: Pattern) -> Result<Self> {
        let groups = pattern.capture_groups();
        match pattern {
            Pattern::Regex(regex) if groups == 1 => Ok(Self { regex }),
            other => Err(EventuallyError::pattern_contract(other.as_str(), groups)),
        }
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.pattern()
    }

    /// Captured value of the first match, or `None` if nothing matched.
    ///
    /// `Some("")` means the group matched an empty string, which is distinct
    /// from no match at all.
    #[must_use]
    pub fn extract(&self, content: &str) -> Option<String> {
        self.regex
            .regex()
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Captured value of the last match.
    #[must_use]
    pub fn extract_last(&self, content: &str) -> Option<String> {
        self.regex
            .regex()
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .last()
            .map(|m| m.as_str().to_string())
    }

    /// Captured values of every match, in stream order.
    #[must_use]
    pub fn extract_all(&self, content: &str) -> Vec<String> {
        self.regex
            .regex()
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// The extractor as a plain search pattern.
    #[must_use]
    pub fn as_pattern(&self) -> Pattern {
        Pattern::Regex(self.regex.clone())
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Extractor").field(&self.pattern()).finish()
    }
}
