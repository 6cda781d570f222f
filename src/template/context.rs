//! Request data visible to output expressions.

/// The parts of an incoming request that templates may reference through the
/// `request.*`, `query.*` and `form.*` namespaces.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: String,
    /// Request target as received (path and query).
    pub url: String,
    pub host: String,
    pub remote_addr: String,
    pub query: Vec<(String, String)>,
    /// Decoded `application/x-www-form-urlencoded` body fields.
    pub form: Vec<(String, String)>,
}

impl RequestContext {
    /// First value of the named query parameter, or `""` when absent.
    pub fn query_param(&self, name: &str) -> &str {
        first_value(&self.query, name).unwrap_or("")
    }

    /// First value of the named form field, or `""` when absent.
    ///
    /// Body fields take precedence; query parameters are consulted when the
    /// body does not carry the field.
    pub fn form_value(&self, name: &str) -> &str {
        first_value(&self.form, name)
            .or_else(|| first_value(&self.query, name))
            .unwrap_or("")
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}
