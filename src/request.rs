use serde::Serialize;
use std::collections::BTreeMap;

/// Span field names recognised as the request URL, in priority order.
pub const URL_FIELDS: [&str; 3] = ["url", "http.url", "request.url"];

/// Span field names recognised as the request method.
pub const METHOD_FIELDS: [&str; 2] = ["method", "http.method"];

/// The request that was being served when a record was logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestContext {
    pub url: Option<String>,
    pub method: Option<String>,
    /// All fields of the enclosing spans, innermost value winning.
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl RequestContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Build a context from collected span fields, picking out the URL and
    /// method. Returns `None` when there is nothing to report.
    pub fn from_fields(fields: BTreeMap<String, serde_json::Value>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let url = first_string(&fields, &URL_FIELDS);
        let method = first_string(&fields, &METHOD_FIELDS);
        Some(Self { url, method, fields })
    }

    pub fn url_or_empty(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }
}

fn first_string(fields: &BTreeMap<String, serde_json::Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    })
}
