//! rust-eventually-macros: Procedural macros for rust-eventually
//!
//! Compile-time checked building blocks for polls and log assertions:
//!
//! - [`pattern!`] - A regex [`Pattern`] validated at compile time
//! - [`capture!`] - A single-group extractor validated at compile time
//! - [`poll_config!`] - A poll configuration from a human-readable cadence
//!
//! The generated code refers to `::rust_eventually`; use the macros through
//! the re-exports in that crate.
//!
//! # Example
//!
//! ```ignore
//! use rust_eventually::{capture, pattern, poll_config};
//!
//! let config = poll_config!(eventually 2 s every 100 ms);
//! let ready = pattern!(r"listening on :\d+");
//! let trace_id = capture!(r"x_b3_traceid:\s*(\w+)");
//! ```
//!
//! [`Pattern`]: https://docs.rs/rust-eventually/latest/rust_eventually/enum.Pattern.html

// In proc-macro crates, passing parsed input by value is idiomatic
#![allow(clippy::needless_pass_by_value)]

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod capture;
mod duration;
mod pattern;
mod poll_config;

/// Compile-time validated regex pattern.
///
/// Expands to a `rust_eventually::Pattern` backed by a regex compiled once
/// per call site. An invalid regex is a compilation error.
///
/// ```ignore
/// let prompt = pattern!(r"request \d+ served");
/// reader.eventually_says(prompt, &poller).await?;
///
/// // Compilation error:
/// // let bad = pattern!(r"[unclosed");
/// ```
#[proc_macro]
pub fn pattern(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as pattern::PatternInput);
    pattern::expand(input).into()
}

/// Compile-time validated extractor.
///
/// Expands to a `&'static rust_eventually::Extractor`. The regex must be
/// valid and contain exactly one capture group; anything else is a
/// compilation error.
///
/// ```ignore
/// let trace = capture!(r"x_b3_traceid:\s*(\w+)");
/// let id = trace.extract(&logs);
///
/// // Compilation error: two capture groups.
/// // let bad = capture!(r"(\w+)=(\w+)");
/// ```
#[proc_macro]
pub fn capture(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as capture::CaptureInput);
    capture::expand(input).into()
}

/// Build a poll configuration from a human-readable cadence.
///
/// # Syntax
///
/// ```ignore
/// poll_config!(eventually <duration> [every <duration>])
/// poll_config!(consistently <duration> [every <duration>])
/// ```
///
/// Durations are one or more `<number> <unit>` terms joined by `+`, with
/// units `ms`, `s`, `m` (and their long forms). A missing `every` clause
/// uses the library's default interval. A zero interval, or a budget
/// shorter than the interval, is a compilation error.
///
/// ```ignore
/// let eventually = poll_config!(eventually 2 s every 100 ms);
/// let consistently = poll_config!(consistently 1 s + 500 ms every 50 ms);
/// ```
#[proc_macro]
pub fn poll_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as poll_config::PollConfigInput);
    poll_config::expand(input).into()
}
