//! The `pattern!` macro.

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{LitStr, Result};

/// The pattern! macro input.
pub struct PatternInput {
    /// The regex source.
    pub regex: LitStr,
}

impl Parse for PatternInput {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Self {
            regex: input.parse()?,
        })
    }
}

/// Generate code for the pattern! macro.
pub fn expand(input: PatternInput) -> TokenStream {
    let source = input.regex.value();
    if let Err(e) = regex::Regex::new(&source) {
        return syn::Error::new(input.regex.span(), format!("invalid regex: {e}"))
            .to_compile_error();
    }

    let lit = &input.regex;
    quote! {
        {
            static PATTERN: ::std::sync::OnceLock<::rust_eventually::Pattern> =
                ::std::sync::OnceLock::new();
            ::std::clone::Clone::clone(PATTERN.get_or_init(|| {
                match ::rust_eventually::Pattern::regex(#lit) {
                    ::std::result::Result::Ok(pattern) => pattern,
                    ::std::result::Result::Err(e) => {
                        ::std::unreachable!("pattern! regex rejected at runtime: {}", e)
                    }
                }
            }))
        }
    }
}
