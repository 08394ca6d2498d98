//! Mapped derive macro implementation

mod attrs;

use attrs::{FieldTag, table_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

const DEFAULT_NAMESPACE: &str = "orm";

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let table = table_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Mapped can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Mapped can only be derived for structs",
            ));
        }
    };

    let mut registrations = Vec::new();
    for field in fields {
        let tags = field
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("orm"))
            .map(|attr| attr.parse_args::<FieldTag>())
            .collect::<Result<Vec<_>>>()?;
        // Untagged fields never take part in mapping.
        if tags.is_empty() {
            continue;
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let field_name = ident.unraw().to_string();
        let tag_calls = tags.iter().map(|tag| {
            let namespace = tag.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
            let value = &tag.tag;
            quote! { .tag_in(#namespace, #value) }
        });

        registrations.push(quote! {
            fields
                .field::<#ty>(#field_name, |s| &s.#ident, |s| &mut s.#ident)
                #(#tag_calls)*;
        });
    }

    Ok(quote! {
        impl #impl_generics ::relmap::Mapped for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table
            }

            fn describe(fields: &mut ::relmap::FieldSet<Self>) {
                #(#registrations)*
            }
        }
    })
}
