//! The `poll_config!` macro.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Ident, Result};

use crate::duration::DurationSpec;

/// Which polarity the configuration is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    /// `eventually <timeout>`
    Eventually,
    /// `consistently <window>`
    Consistently,
}

/// The poll_config! macro input.
pub struct PollConfigInput {
    /// The polarity keyword.
    pub polarity: Polarity,
    /// Timeout or window.
    pub budget: DurationSpec,
    /// The `every` clause, if present.
    pub interval: Option<DurationSpec>,
    span: Span,
}

impl Parse for PollConfigInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let keyword: Ident = input.parse()?;
        let polarity = match keyword.to_string().as_str() {
            "eventually" => Polarity::Eventually,
            "consistently" => Polarity::Consistently,
            other => {
                return Err(syn::Error::new(
                    keyword.span(),
                    format!("expected `eventually` or `consistently`, found `{other}`"),
                ));
            }
        };
        let budget = input.parse()?;

        let interval = if input.is_empty() {
            None
        } else {
            let every: Ident = input.parse()?;
            if every != "every" {
                return Err(syn::Error::new(every.span(), "expected `every`"));
            }
            Some(input.parse()?)
        };

        Ok(Self {
            polarity,
            budget,
            interval,
            span: keyword.span(),
        })
    }
}

/// Generate code for the poll_config! macro.
pub fn expand(input: PollConfigInput) -> TokenStream {
    if let Some(interval) = &input.interval {
        if interval.nanos == 0 {
            return syn::Error::new(input.span, "interval must be greater than zero")
                .to_compile_error();
        }
        if input.budget.nanos < interval.nanos {
            return syn::Error::new(input.span, "budget must be at least one interval")
                .to_compile_error();
        }
    }

    let budget = input.budget.to_tokens();
    let interval = match (&input.interval, input.polarity) {
        (Some(spec), _) => spec.to_tokens(),
        (None, Polarity::Eventually) => quote! { ::rust_eventually::poll::DEFAULT_INTERVAL },
        (None, Polarity::Consistently) => {
            quote! { ::rust_eventually::poll::DEFAULT_CONSISTENTLY_INTERVAL }
        }
    };

    match input.polarity {
        Polarity::Eventually => quote! {
            ::rust_eventually::poll::PollConfig::eventually(#budget, #interval)
        },
        Polarity::Consistently => quote! {
            ::rust_eventually::poll::PollConfig::consistently(#budget, #interval)
        },
    }
}
