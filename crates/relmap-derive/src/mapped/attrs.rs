//! Attribute parsing for the Mapped derive macro.

use heck::ToSnakeCase;
use syn::parse::{Parse, ParseStream};
use syn::{DeriveInput, LitStr, Result};

/// One field-level `#[orm(...)]` attribute.
///
/// Either a bare tag, `#[orm("column:id;primary")]`, for the default
/// namespace, or `#[orm(ns = "legacy", tag = "column:user_id")]`.
pub(super) struct FieldTag {
    pub namespace: Option<String>,
    pub tag: String,
}

impl Parse for FieldTag {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(LitStr) {
            let tag: LitStr = input.parse()?;
            if !input.is_empty() {
                return Err(input.error("unexpected tokens after tag string"));
            }
            return Ok(FieldTag {
                namespace: None,
                tag: tag.value(),
            });
        }

        let mut namespace = None;
        let mut tag = None;
        loop {
            if input.is_empty() {
                break;
            }
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: LitStr = input.parse()?;

            if ident == "ns" {
                namespace = Some(value.value());
            } else if ident == "tag" {
                tag = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(ident, "expected `ns` or `tag`"));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        let Some(tag) = tag else {
            return Err(input.error("missing `tag = \"...\"`"));
        };
        Ok(FieldTag { namespace, tag })
    }
}

/// Table name from `#[orm(table = "...")]`, or the snake_case struct name.
pub(super) fn table_name(input: &DeriveInput) -> Result<String> {
    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported struct attribute, expected `table = \"...\"`"))
            }
        })?;
    }
    Ok(table.unwrap_or_else(|| input.ident.to_string().to_snake_case()))
}
