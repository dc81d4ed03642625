//! Derive macros for the specialops crate.
//!
//! Provides:
//! - `#[derive(Error)]` - `Display`, `std::error::Error` and `From` boilerplate for error enums

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` for error types, plus `From` for `#[from]` variants.
#[proc_macro_derive(Error, attributes(error, from))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
