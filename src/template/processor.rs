//! Directive expansion.
//!
//! # Data Flow
//! ```text
//! raw template
//!     → includes (recursive, inline error markers)
//!     → code blocks (assignments into the render's scope, removed from output)
//!     → output tags (evaluated against scope + request)
//!     → rendered text
//! ```
//!
//! # Design Decisions
//! - One fresh [`VariableScope`] per [`DirectiveProcessor::render`] call
//! - All code blocks run before any output tag, so an assignment is visible to
//!   every output tag in the document, including ones that appear before it
//! - A failed include never aborts the render
//! - Include nesting is capped by `max_include_depth`; `0` leaves it unbounded,
//!   in which case a self-including template recurses without limit

use regex::Captures;

use crate::template::context::RequestContext;
use crate::template::expr;
use crate::template::registry::TemplateRegistry;
use crate::template::scanner::{CODE_RE, INCLUDE_RE, OUTPUT_RE};
use crate::template::scope::VariableScope;

/// Default include nesting limit.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Expands directives in templates fetched from a registry.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveProcessor<'r> {
    registry: &'r dyn TemplateRegistry,
    max_include_depth: usize,
}

impl<'r> DirectiveProcessor<'r> {
    pub fn new(registry: &'r dyn TemplateRegistry) -> Self {
        Self {
            registry,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Set the include nesting limit. `0` disables the limit.
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Render `content` with a fresh scope.
    pub fn render(&self, content: &str, request: &RequestContext) -> String {
        let mut scope = VariableScope::new();
        let expanded = self.expand_includes(content, 0);
        let stripped = run_code_blocks(&expanded, &mut scope);
        render_outputs(&stripped, &scope, request)
    }

    /// Replace every include tag with the recursively expanded target.
    pub fn expand_includes(&self, content: &str, depth: usize) -> String {
        INCLUDE_RE
            .replace_all(content, |caps: &Captures<'_>| {
                let target = &caps[1];
                let next = depth + 1;

                if self.max_include_depth > 0 && next > self.max_include_depth {
                    tracing::warn!(
                        target_template = %target,
                        max_depth = self.max_include_depth,
                        "Include depth exceeded"
                    );
                    return format!(
                        "<!-- Include error: maximum include depth {} exceeded at {} -->",
                        self.max_include_depth, target
                    );
                }

                match self.registry.fetch(target) {
                    Ok(included) => self.expand_includes(&included, next),
                    Err(e) => {
                        tracing::debug!(target_template = %target, error = %e, "Include failed");
                        format!("<!-- Include error: {} -->", e)
                    }
                }
            })
            .into_owned()
    }
}

/// Apply every code block to `scope` and strip it from the text.
///
/// A body containing `=` is split once on the first `=` into a trimmed name
/// and a trimmed value; one pair of surrounding double quotes is removed from
/// the value. Other bodies are dropped without effect.
pub fn run_code_blocks(content: &str, scope: &mut VariableScope) -> String {
    CODE_RE
        .replace_all(content, |caps: &Captures<'_>| {
            let code = caps[1].trim();
            if let Some((name, value)) = code.split_once('=') {
                scope.assign(name.trim(), unquote(value.trim()));
            }
            String::new()
        })
        .into_owned()
}

/// Replace every output tag with its evaluated expression.
pub fn render_outputs(content: &str, scope: &VariableScope, request: &RequestContext) -> String {
    OUTPUT_RE
        .replace_all(content, |caps: &Captures<'_>| {
            expr::evaluate(caps[1].trim(), scope, request)
        })
        .into_owned()
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::registry::EmbeddedRegistry;

    fn render_with(registry: &EmbeddedRegistry, content: &str) -> String {
        DirectiveProcessor::new(registry).render(content, &RequestContext::default())
    }

    #[test]
    fn test_plain_document_is_unchanged() {
        let registry = EmbeddedRegistry::default();
        let doc = "<html>\n<body><p>50% off & more</p></body>\n</html>\n";
        assert_eq!(render_with(&registry, doc), doc);
    }

    #[test]
    fn test_assignment_then_output() {
        let registry = EmbeddedRegistry::default();
        let doc = r#"<% who = "World" %><h1>Hello <%= who %></h1>"#;
        assert_eq!(render_with(&registry, doc), "<h1>Hello World</h1>");
    }

    #[test]
    fn test_assignment_visible_before_its_position() {
        let registry = EmbeddedRegistry::default();
        let doc = r#"<p><%= title %></p><% title = "Late" %>"#;
        assert_eq!(render_with(&registry, doc), "<p>Late</p>");
    }

    #[test]
    fn test_code_block_without_assignment_is_stripped() {
        let registry = EmbeddedRegistry::default();
        let doc = "a<% if (x) { %>b<% } %>c";
        assert_eq!(render_with(&registry, doc), "abc");
    }

    #[test]
    fn test_value_split_on_first_equals() {
        let mut scope = VariableScope::new();
        let out = run_code_blocks(r#"<% query = "a=b" %>"#, &mut scope);
        assert_eq!(out, "");
        assert_eq!(scope.get("query"), Some("a=b"));
    }

    #[test]
    fn test_unquote_only_strips_matching_pair() {
        assert_eq!(unquote(r#""value""#), "value");
        assert_eq!(unquote(r#""open"#), r#""open"#);
        assert_eq!(unquote(r#"""#), r#"""#);
        assert_eq!(unquote("bare"), "bare");
    }

    #[test]
    fn test_nested_includes_flatten() {
        let registry = EmbeddedRegistry::from_static(&[
            ("a.html", r#"[A <%@include file="b.html" %>]"#),
            ("b.html", "(B)"),
        ]);
        let processor = DirectiveProcessor::new(&registry);

        let nested = processor.render(r#"<%@include file="a.html" %>"#, &RequestContext::default());
        let b = processor.render("(B)", &RequestContext::default());
        let manual = format!("[A {}]", b);
        assert_eq!(nested, manual);
        assert_eq!(nested, "[A (B)]");
    }

    #[test]
    fn test_included_directives_share_the_scope() {
        let registry = EmbeddedRegistry::from_static(&[(
            "vars.html",
            r#"<% site = "Example" %>"#,
        )]);
        let doc = r#"<%@include file="vars.html" %><title><%= site %></title>"#;
        assert_eq!(render_with(&registry, doc), "<title>Example</title>");
    }

    #[test]
    fn test_missing_include_renders_marker_and_continues() {
        let registry = EmbeddedRegistry::default();
        let doc = r#"<%@include file="missing.html" %><% n = "1" %><p><%= n %></p>"#;
        let out = render_with(&registry, doc);

        assert!(out.contains("<!-- Include error:"));
        assert!(out.contains("missing.html"));
        assert!(out.ends_with("<p>1</p>"));
    }

    #[test]
    fn test_self_include_stops_at_depth_limit() {
        let registry = EmbeddedRegistry::from_static(&[(
            "loop.html",
            r#"x<%@include file="loop.html" %>"#,
        )]);
        let out = DirectiveProcessor::new(&registry)
            .with_max_include_depth(3)
            .render(r#"<%@include file="loop.html" %>"#, &RequestContext::default());

        assert!(out.starts_with("xxx<!-- Include error: maximum include depth 3 exceeded"));
    }

    #[test]
    fn test_scope_does_not_leak_between_renders() {
        let registry = EmbeddedRegistry::default();
        let processor = DirectiveProcessor::new(&registry);
        let request = RequestContext::default();

        assert_eq!(processor.render(r#"<% x = "1" %><%= x %>"#, &request), "1");
        assert_eq!(processor.render("<%= x %>", &request), "x");
    }

    #[test]
    fn test_arithmetic_in_document() {
        let registry = EmbeddedRegistry::default();
        assert_eq!(render_with(&registry, "<%= 2 + 3 %>"), "5");
        assert_eq!(render_with(&registry, "<%= ab + cd %>"), "abcd");
        assert_eq!(render_with(&registry, "<%= totallyUnknown %>"), "totallyUnknown");
    }
}
