//! Procedural macros for action unit registration.
//!
//! `#[action_unit]` marks a type implementing `action_registry::Action` as
//! discoverable. It leaves the item untouched and submits a zero-argument
//! factory for it into the link-time catalog read by the discovery loader.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Expr, ExprLit, Item, Lit, MetaNameValue, Token, parse_macro_input};

const DEFAULT_LOCATION: &str = "builtin";

/// Registers an action unit type for discovery.
///
/// Accepted arguments:
///
/// * `location = "plugins"`: catalog location (defaults to `"builtin"`);
/// * `constructor = path::to::fn`: fallible zero-argument constructor
///   returning `Result<Self, E>` where `E: Display`. Without it the type must
///   implement `Default`.
///
/// ```ignore
/// #[action_unit(location = "plugins")]
/// #[derive(Default)]
/// struct MineBlock;
/// ```
#[proc_macro_attribute]
pub fn action_unit(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated::<MetaNameValue, Token![,]>::parse_terminated);
    let item = parse_macro_input!(item as Item);

    match expand(&args, &item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: &Punctuated<MetaNameValue, Token![,]>, item: &Item) -> syn::Result<TokenStream2> {
    let (ident, generics) = match item {
        Item::Struct(item) => (&item.ident, &item.generics),
        Item::Enum(item) => (&item.ident, &item.generics),
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "#[action_unit] can only be applied to structs and enums",
            ));
        }
    };

    if !generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            generics,
            "#[action_unit] types cannot be generic",
        ));
    }

    let mut location = DEFAULT_LOCATION.to_owned();
    let mut constructor: Option<&Expr> = None;

    for arg in args {
        if arg.path.is_ident("location") {
            match &arg.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(value),
                    ..
                }) if !value.value().trim().is_empty() => location = value.value(),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "`location` must be a non-empty string literal",
                    ));
                }
            }
        } else if arg.path.is_ident("constructor") {
            match &arg.value {
                path @ Expr::Path(_) => constructor = Some(path),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "`constructor` must be a function path",
                    ));
                }
            }
        } else {
            return Err(syn::Error::new_spanned(
                &arg.path,
                "unknown #[action_unit] argument, expected `location` or `constructor`",
            ));
        }
    }

    let build = match constructor {
        Some(path) => quote! {
            #path()
                .map(|unit: #ident| ::std::boxed::Box::new(unit) as ::std::boxed::Box<dyn ::action_registry::Action>)
                .map_err(|err| ::action_registry::ActionError::construction(err.to_string()))
        },
        None => quote! {
            ::std::result::Result::Ok(
                ::std::boxed::Box::new(<#ident as ::std::default::Default>::default())
                    as ::std::boxed::Box<dyn ::action_registry::Action>,
            )
        },
    };

    Ok(quote! {
        #item

        ::action_registry::__private::inventory::submit! {
            ::action_registry::UnitRegistration {
                location: #location,
                module: ::core::module_path!(),
                factory: {
                    fn factory() -> ::action_registry::ActionResult<::std::boxed::Box<dyn ::action_registry::Action>> {
                        #build
                    }
                    factory
                },
            }
        }
    })
}
