//! Derive macros for relmap
//!
//! Provides `#[derive(Mapped)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod mapped;

/// Derive `relmap::Mapped` for a struct.
///
/// # Example
///
/// ```ignore
/// use relmap::Mapped;
///
/// #[derive(Default, Mapped)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm("column:id;primary;auto_increment")]
///     id: i64,
///     #[orm("column:name")]
///     #[orm(ns = "legacy", tag = "column:user_name")]
///     name: String,
///     // not mapped
///     cache: Vec<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the snake_case struct name)
/// - `#[orm("tag")]` - Field tag in the default `orm` namespace
/// - `#[orm(ns = "name", tag = "tag")]` - Field tag in another namespace
///
/// Fields without an `#[orm]` attribute are not registered. Tags are
/// validated when the type is first registered with a `Registry`.
#[proc_macro_derive(Mapped, attributes(orm))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    mapped::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
