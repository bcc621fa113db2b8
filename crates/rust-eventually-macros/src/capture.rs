//! The `capture!` macro.

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{LitStr, Result};

/// The capture! macro input.
pub struct CaptureInput {
    /// The regex source.
    pub regex: LitStr,
}

impl Parse for CaptureInput {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Self {
            regex: input.parse()?,
        })
    }
}

/// Check the regex and count its capture groups.
fn check(source: &str) -> std::result::Result<(), String> {
    let regex = regex::Regex::new(source).map_err(|e| format!("invalid regex: {e}"))?;
    let groups = regex.captures_len() - 1;
    if groups == 1 {
        Ok(())
    } else {
        Err(format!(
            "capture! needs exactly one capture group, found {groups}"
        ))
    }
}

/// Generate code for the capture! macro.
pub fn expand(input: CaptureInput) -> TokenStream {
    if let Err(message) = check(&input.regex.value()) {
        return syn::Error::new(input.regex.span(), message).to_compile_error();
    }

    let lit = &input.regex;
    quote! {
        {
            static EXTRACTOR: ::std::sync::OnceLock<::rust_eventually::Extractor> =
                ::std::sync::OnceLock::new();
            EXTRACTOR.get_or_init(|| {
                match ::rust_eventually::Extractor::new(#lit) {
                    ::std::result::Result::Ok(extractor) => extractor,
                    ::std::result::Result::Err(e) => {
                        ::std::unreachable!("capture! regex rejected at runtime: {}", e)
                    }
                }
            })
        }
    }
}
