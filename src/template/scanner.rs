//! Directive tag scanning.
//!
//! # Responsibilities
//! - Hold the three directive patterns (include, code block, output)
//! - List include targets for the compile-time include check
//!
//! # Design Decisions
//! - Pattern based and non-recursive per pass; anything that does not match a
//!   form's exact grammar is left as literal text
//! - The processor runs one pattern per pass: includes, then code blocks, then
//!   output tags

use std::sync::LazyLock;

use regex::Regex;

/// `<%@include file="PATH" %>`
pub(crate) static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<%@include\s+file="([^"]+)"\s*%>"#).expect("include pattern is valid")
});

/// `<% BODY %>` where BODY does not start with `=`.
pub(crate) static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<%\s*([^=][^%]*)\s*%>").expect("code pattern is valid"));

/// `<%= EXPR %>`
pub(crate) static OUTPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<%=\s*([^%]+)\s*%>").expect("output pattern is valid"));

/// Returns every include target referenced by `text`, in order of appearance.
pub fn include_targets(text: &str) -> impl Iterator<Item = &str> {
    INCLUDE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}
