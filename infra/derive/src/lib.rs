#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the herald crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! herald-derive = { path = "../infra/derive" }
//! thiserror = "2"
//! ```
//!
//! The generated code refers to `::thiserror`, so consuming crates must depend on it.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for declaring error enums.
///
/// # Injected Behaviors
///
/// * **Derives**: Adds `Debug` and `thiserror::Error` unless already derived.
/// * **Context**: Generates a companion `<Name>Ext` trait whose `.context(...)` fills the
///   `context` field of the error (or wraps a source error into the matching variant).
/// * **Conversions**: Implements `From<Source>` for every variant with a source field, so
///   `?` works on upstream errors.
/// * **Formatting**: Emits a module-local `format_context` helper that renders
///   `Some(ctx)` as `" (ctx)"` and `None` as an empty string.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Every variant uses named fields. Tuple and unit variants are rejected.
/// 3. A `context` field, when present, has the type `Option<Cow<'static, str>>`.
/// 4. A variant with a source (a field named `source`, or marked `#[source]`/`#[from]`)
///    must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use herald_derive::herald_error;
/// use std::borrow::Cow;
///
/// #[herald_error]
/// pub enum ParseError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Bad header{}: {message}", format_context(.context))]
///     BadHeader { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &str) -> Result<String, ParseError> {
///     std::fs::read_to_string(path).context("Reading header file")
/// }
/// ```
#[proc_macro_attribute]
pub fn herald_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
