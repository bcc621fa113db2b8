//! Human-readable duration terms shared by the macros.

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitInt, Result, Token};

/// A `+`-separated sum of `<number> <unit>` terms.
pub struct DurationSpec {
    /// Total length in nanoseconds, saturating.
    pub nanos: u64,
}

/// Units accepted in a duration term.
#[derive(Clone, Copy)]
enum Unit {
    Milliseconds,
    Seconds,
    Minutes,
}

impl Unit {
    const fn to_nanos(self) -> u64 {
        match self {
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60 * 1_000_000_000,
        }
    }
}

fn parse_term(input: ParseStream) -> Result<u64> {
    let value: LitInt = input.parse()?;
    let value: u64 = value.base10_parse()?;

    let unit: Ident = input.parse()?;
    let unit = match unit.to_string().as_str() {
        "ms" | "millis" | "milliseconds" => Unit::Milliseconds,
        "s" | "sec" | "secs" | "seconds" => Unit::Seconds,
        "m" | "min" | "mins" | "minutes" => Unit::Minutes,
        other => {
            return Err(syn::Error::new(
                unit.span(),
                format!("unknown time unit: {other} (expected ms, s or m)"),
            ));
        }
    };
    Ok(value.saturating_mul(unit.to_nanos()))
}

impl Parse for DurationSpec {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut nanos = parse_term(input)?;
        while input.peek(Token![+]) {
            let _: Token![+] = input.parse()?;
            nanos = nanos.saturating_add(parse_term(input)?);
        }
        Ok(Self { nanos })
    }
}

impl DurationSpec {
    /// A `std::time::Duration` expression for this spec.
    pub fn to_tokens(&self) -> TokenStream {
        let secs = self.nanos / 1_000_000_000;
        let nanos = (self.nanos % 1_000_000_000) as u32;
        quote! { ::std::time::Duration::new(#secs, #nanos) }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    #[test]
    fn single_term() {
        let spec: DurationSpec = parse_quote! { 100 ms };
        assert_eq!(spec.nanos, 100_000_000);
    }

    #[test]
    fn compound_terms() {
        let spec: DurationSpec = parse_quote! { 1 m + 30 s + 5 ms };
        assert_eq!(spec.nanos, 90_005_000_000);
    }

    #[test]
    fn unknown_unit() {
        let result: Result<DurationSpec> = syn::parse_str("5 fortnights");
        assert!(result.is_err());
    }
}
