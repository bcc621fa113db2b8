//! Pattern matching over stream windows.
//!
//! This module provides literal and regex patterns, the regex cache, and the
//! single-capture extractor used to pull correlation identifiers out of logs.

mod cache;
mod extract;
mod pattern;

pub use cache::{CacheStats, DEFAULT_CACHE_SIZE, GLOBAL_CACHE, RegexCache};
pub use extract::Extractor;
pub use pattern::{CompiledRegex, Pattern, PatternMatch, find_first};
