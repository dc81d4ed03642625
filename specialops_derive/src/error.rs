//! Derive macro for error types.
//!
//! Generates `std::fmt::Display`, `std::error::Error` and, for wrapping
//! variants, `From` implementations.
//!
//! # Usage
//!
//! ```ignore
//! use specialops_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum CompileError {
//!     #[error("undefined label: {label}")]
//!     UndefinedLabel { label: String },
//!
//!     #[error("operand of {0} bytes")]
//!     OperandTooWide(usize),
//! }
//!
//! #[derive(Debug, Error)]
//! pub enum Error {
//!     #[error("compilation failed")]
//!     Compile(#[from] CompileError),
//! }
//! ```
//!
//! # Supported Features
//!
//! - Unit variants: `#[error("message")]`
//! - Tuple variants with positional args: `#[error("error: {0}")]`
//! - Struct variants with named args: `#[error("expected {expected}")]`
//! - `#[from]` on the only field of a tuple variant: emits `From<Field>` and
//!   returns the field from `Error::source`
//!
//! Fields the message does not mention are left out of the `write!` call, so
//! a wrapping variant can carry a plain message and expose the inner error
//! through `source()` only.

use proc_macro::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DataEnum, DeriveInput, Fields, Lit, Meta, parse_macro_input};

/// Derives `Display` and `Error` for an enum or struct.
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    match &input.data {
        Data::Enum(data_enum) => expand_enum(input, data_enum),
        Data::Struct(data_struct) => expand_struct(input, &data_struct.fields),
        Data::Union(_) => Err(syn::Error::new_spanned(
            input,
            "Error derive does not support unions",
        )),
    }
}

fn expand_enum(input: &DeriveInput, data_enum: &DataEnum) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut display_arms = Vec::with_capacity(data_enum.variants.len());
    let mut source_arms = Vec::new();
    let mut from_impls = Vec::new();

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;
        let error_msg = extract_error_message_from_attrs(
            &variant.attrs,
            &variant.ident,
            &format!("variant `{}`", variant.ident),
        )?;

        let arm = match &variant.fields {
            Fields::Unit => quote! {
                Self::#variant_name => write!(f, #error_msg),
            },
            Fields::Unnamed(fields) => {
                let format_str = convert_positional_to_named(&error_msg, fields.unnamed.len());
                let bindings: Vec<_> = (0..fields.unnamed.len())
                    .map(|i| format_ident!("f{}", i))
                    .collect();
                let patterns = bindings.iter().map(|b| {
                    if mentions(&format_str, &b.to_string()) {
                        quote!(#b)
                    } else {
                        quote!(_)
                    }
                });
                let used: Vec<_> = bindings
                    .iter()
                    .filter(|b| mentions(&format_str, &b.to_string()))
                    .collect();
                quote! {
                    Self::#variant_name(#(#patterns),*) => write!(f, #format_str, #(#used = #used),*),
                }
            }
            Fields::Named(fields) => {
                let used: Vec<_> = fields
                    .named
                    .iter()
                    .filter_map(|f| f.ident.as_ref())
                    .filter(|ident| mentions(&error_msg, &ident.to_string()))
                    .collect();
                quote! {
                    Self::#variant_name { #(#used,)* .. } => write!(f, #error_msg, #(#used = #used),*),
                }
            }
        };
        display_arms.push(arm);

        if let Some(from_ty) = from_field(&variant.fields)? {
            source_arms.push(quote! {
                Self::#variant_name(inner) => ::std::option::Option::Some(inner as &(dyn ::std::error::Error + 'static)),
            });
            from_impls.push(quote! {
                impl #impl_generics ::std::convert::From<#from_ty> for #name #ty_generics #where_clause {
                    fn from(inner: #from_ty) -> Self {
                        Self::#variant_name(inner)
                    }
                }
            });
        }
    }

    let error_impl = if source_arms.is_empty() {
        quote! {
            impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
        }
    } else {
        quote! {
            impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {
                #[allow(unreachable_patterns)]
                fn source(&self) -> ::std::option::Option<&(dyn ::std::error::Error + 'static)> {
                    match self {
                        #(#source_arms)*
                        _ => ::std::option::Option::None,
                    }
                }
            }
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#display_arms)*
                }
            }
        }

        #error_impl

        #(#from_impls)*
    })
}

fn expand_struct(input: &DeriveInput, fields: &Fields) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let error_msg = extract_error_message_from_attrs(
        &input.attrs,
        &input.ident,
        &format!("type `{}`", input.ident),
    )?;

    let display_body = match fields {
        Fields::Unit => quote! {
            write!(f, #error_msg)
        },
        Fields::Named(fields) => {
            let used: Vec<_> = fields
                .named
                .iter()
                .filter_map(|f| f.ident.as_ref())
                .filter(|ident| mentions(&error_msg, &ident.to_string()))
                .collect();
            quote! {
                write!(f, #error_msg, #(#used = self.#used),*)
            }
        }
        Fields::Unnamed(fields) => {
            let format_str = convert_positional_to_named(&error_msg, fields.unnamed.len());
            let (idents, indices): (Vec<_>, Vec<_>) = (0..fields.unnamed.len())
                .map(|i| (format_ident!("f{}", i), syn::Index::from(i)))
                .filter(|(ident, _)| mentions(&format_str, &ident.to_string()))
                .unzip();
            quote! {
                write!(f, #format_str, #(#idents = self.#indices),*)
            }
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Returns the wrapped type when the variant is `Variant(#[from] Inner)`.
///
/// `#[from]` anywhere else is rejected so the generated `From` stays unambiguous.
fn from_field(fields: &Fields) -> syn::Result<Option<&syn::Type>> {
    let has_from = |field: &syn::Field| field.attrs.iter().any(|a| a.path().is_ident("from"));

    match fields {
        Fields::Unnamed(unnamed) => {
            let marked: Vec<&syn::Field> = unnamed.unnamed.iter().filter(|&f| has_from(f)).collect();
            match (marked.as_slice(), unnamed.unnamed.len()) {
                ([], _) => Ok(None),
                ([field], 1) => Ok(Some(&field.ty)),
                ([field, ..], _) => Err(syn::Error::new_spanned(
                    field,
                    "#[from] requires a tuple variant with exactly one field",
                )),
            }
        }
        Fields::Named(named) => match named.named.iter().find(|&f| has_from(f)) {
            Some(field) => Err(syn::Error::new_spanned(
                field,
                "#[from] is only supported on tuple variants, e.g. Compile(#[from] CompileError)",
            )),
            None => Ok(None),
        },
        Fields::Unit => Ok(None),
    }
}

/// Extracts the message from the `#[error("...")]` attribute.
fn extract_error_message_from_attrs<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!("missing #[error(\"...\")] attribute on {target_desc}"),
        ));
    };

    let Meta::List(meta_list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute; use #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(meta_list.tokens.clone()) {
        Ok(Lit::Str(lit_str)) => Ok(lit_str.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] expects a string literal, e.g. #[error(\"stack underflow: {depth}\")]",
        )),
    }
}

/// Whether `format_str` interpolates the named argument `name`.
fn mentions(format_str: &str, name: &str) -> bool {
    format_str.contains(&format!("{{{name}}}")) || format_str.contains(&format!("{{{name}:"))
}

/// Converts positional format args `{0}`, `{1}` to named args `{f0}`, `{f1}`.
///
/// Format specs survive the rewrite: `{0:#x}` becomes `{f0:#x}`.
fn convert_positional_to_named(format_str: &str, field_count: usize) -> String {
    let mut result = format_str.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}
