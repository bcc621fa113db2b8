//! Conditions evaluated against each observation.

use crate::matching::Pattern;

/// What a condition saw that decided an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    /// The matched or offending text.
    pub text: String,
    /// Offset of `text` in the observed content, when known.
    pub offset: Option<usize>,
}

impl Evidence {
    /// Create evidence with an offset.
    pub fn at(text: impl Into<String>, offset: usize) -> Self {
        Self {
            text: text.into(),
            offset: Some(offset),
        }
    }

    /// Create evidence without an offset.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: None,
        }
    }

    /// Byte offset just past the evidence, when the offset is known.
    #[must_use]
    pub fn end(&self) -> Option<usize> {
        self.offset.map(|o| o + self.text.len())
    }
}

/// The result of checking one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// Whether the condition holds.
    pub holds: bool,
    /// Supporting evidence.
    pub evidence: Option<Evidence>,
}

impl Check {
    /// The condition holds.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            holds: true,
            evidence: None,
        }
    }

    /// The condition does not hold.
    #[must_use]
    pub const fn fail() -> Self {
        Self {
            holds: false,
            evidence: None,
        }
    }

    /// Attach evidence.
    #[must_use]
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = Some(evidence);
        self
    }
}

impl From<bool> for Check {
    fn from(holds: bool) -> Self {
        Self {
            holds,
            evidence: None,
        }
    }
}

/// A predicate over observations of type `T`.
///
/// Any `FnMut(&T) -> bool` (or `-> Check`) is a condition.
pub trait Condition<T: ?Sized> {
    /// Check one observation.
    fn check(&mut self, value: &T) -> Check;
}

impl<T, F, R> Condition<T> for F
where
    T: ?Sized,
    F: FnMut(&T) -> R,
    R: Into<Check>,
{
    fn check(&mut self, value: &T) -> Check {
        self(value).into()
    }
}

/// Holds when the observed text contains a pattern.
#[derive(Debug, Clone)]
pub struct Contains(pub Pattern);

/// Holds when the observed text does not contain a pattern.
///
/// A failed check carries the offending match as evidence.
#[derive(Debug, Clone)]
pub struct Lacks(pub Pattern);

/// Condition that holds once `pattern` appears.
pub fn contains(pattern: impl Into<Pattern>) -> Contains {
    Contains(pattern.into())
}

/// Condition that holds while `pattern` is absent.
pub fn lacks(pattern: impl Into<Pattern>) -> Lacks {
    Lacks(pattern.into())
}

impl<T: AsRef<str> + ?Sized> Condition<T> for Contains {
    fn check(&mut self, value: &T) -> Check {
        match self.0.find(value.as_ref()) {
            Some(m) => Check::pass().with_evidence(Evidence::at(m.text, m.start)),
            None => Check::fail(),
        }
    }
}

impl<T: AsRef<str> + ?Sized> Condition<T> for Lacks {
    fn check(&mut self, value: &T) -> Check {
        match self.0.find(value.as_ref()) {
            Some(m) => Check::fail().with_evidence(Evidence::at(m.text, m.start)),
            None => Check::pass(),
        }
    }
}
