//! Procedural macros for the docwork project.
//!
//! `#[derive(EntitySets)]` generates the static entity-set registration of a unit
//! of work: every named field of type `EntitySet<D>` is registered under the
//! field's name, bound to a collection of the same name unless overridden.
//!
//! ```ignore
//! #[derive(EntitySets)]
//! struct Shop {
//!     customers: EntitySet<Customer>,
//!     #[entity_set(collection = "order_lines")]
//!     lines: EntitySet<OrderLine>,
//!     #[entity_set(skip)]
//!     label: String,
//! }
//! ```
//!
//! Skipped fields are initialized with `Default::default()`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Field, Fields, LitStr, Type, parse_macro_input, spanned::Spanned,
};

#[proc_macro_derive(EntitySets, attributes(entity_set))]
pub fn derive_entity_sets(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity_sets(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct SlotOptions {
    collection: Option<String>,
    skip: bool,
}

fn expand_entity_sets(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "EntitySets can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "EntitySets can only be derived for structs",
            ));
        }
    };

    let initializers = fields
        .iter()
        .map(field_initializer)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::docwork::unit::EntitySets for #name #ty_generics #where_clause {
            fn register(
                registry: &mut ::docwork::unit::SetRegistry,
            ) -> ::docwork::error::DocumentStoreResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#initializers,)*
                })
            }
        }
    })
}

fn field_initializer(field: &Field) -> syn::Result<TokenStream2> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
    let options = parse_slot_options(&field.attrs)?;

    if options.skip {
        if options.collection.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "#[entity_set(skip)] cannot define a collection",
            ));
        }
        return Ok(quote! { #ident: ::core::default::Default::default() });
    }

    if !is_entity_set(&field.ty) {
        return Err(syn::Error::new(
            field.ty.span(),
            "EntitySets fields must be of type EntitySet<T>; mark other fields with #[entity_set(skip)]",
        ));
    }

    let slot = ident.to_string().trim_start_matches("r#").to_string();
    let collection = options.collection.unwrap_or_else(|| slot.clone());

    Ok(quote! { #ident: registry.register_as(#slot, #collection)? })
}

fn is_entity_set(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "EntitySet"),
        _ => false,
    }
}

fn parse_slot_options(attrs: &[syn::Attribute]) -> syn::Result<SlotOptions> {
    let mut options = SlotOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("entity_set") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("collection name cannot be empty"));
                }
                options.collection = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported entity_set attribute. Supported: collection = \"...\", skip",
            ))
        })?;
    }

    Ok(options)
}
