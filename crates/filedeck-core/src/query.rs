//! List query parameters and filter helpers.

/// Sort and filter for a list request.
///
/// Both use the backend's expression syntax: `sort` is a comma separated
/// list of fields with an optional `-` prefix for descending order, and
/// `filter` is a boolean expression such as `owner = "abc" && name ~ "q"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub filter: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Quotes a value as a filter string literal.
///
/// ```
/// use filedeck_core::query::quote;
///
/// assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
/// ```
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Builds `field = "value"`.
pub fn eq(field: &str, value: &str) -> String {
    format!("{} = {}", field, quote(value))
}

/// Builds `field != "value"`.
pub fn ne(field: &str, value: &str) -> String {
    format!("{} != {}", field, quote(value))
}

/// Builds `field ?= "value"` (array field contains value).
pub fn has(field: &str, value: &str) -> String {
    format!("{} ?= {}", field, quote(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let q = ListQuery::new().sort("-created").filter(eq("name", "Reports"));
        assert_eq!(q.sort.as_deref(), Some("-created"));
        assert_eq!(q.filter.as_deref(), Some(r#"name = "Reports""#));
    }

    #[test]
    fn quote_escapes_backslashes() {
        assert_eq!(quote(r"a\b"), r#""a\\b""#);
        assert_eq!(has("shared", "u1"), r#"shared ?= "u1""#);
    }
}
