//! Hook for adding request-specific lines to every card.

use crate::error::ChatError;
use crate::formatter::capitalize_words;
use crate::payload::{KnownIcon, Widget};
use crate::request::RequestContext;
use serde::Serialize;
use serde_json::Value;

/// Supplies extra fields for the card of each dispatched record.
///
/// Named fields render as `<b>Field Name:</b> value`, positional fields
/// as the bare value. Entry order is preserved.
///
/// Any `Fn(&RequestContext) -> R` closure implements this trait when `R`
/// converts into [`AdditionalFields`], which includes `serde_json::Value`.
pub trait AdditionalFieldsProvider: Send + Sync {
    fn additional_fields(&self, request: &RequestContext) -> AdditionalFields;
}

impl<F, R> AdditionalFieldsProvider for F
where
    F: Fn(&RequestContext) -> R + Send + Sync,
    R: Into<AdditionalFields>,
{
    fn additional_fields(&self, request: &RequestContext) -> AdditionalFields {
        self(request).into()
    }
}

type Deferred = Box<dyn FnOnce() -> Result<Value, serde_json::Error>>;

enum FieldValue {
    Ready(Value),
    /// Serialized only when the card is rendered.
    Deferred(Deferred),
}

impl FieldValue {
    fn resolve(self) -> Result<Value, serde_json::Error> {
        match self {
            FieldValue::Ready(value) => Ok(value),
            FieldValue::Deferred(serialize) => serialize(),
        }
    }
}

struct Entry {
    key: String,
    named: bool,
    value: FieldValue,
}

/// Ordered extra fields returned by an [`AdditionalFieldsProvider`].
///
/// Build one from a JSON object or array, or field by field with any
/// `Serialize` value:
///
/// ```
/// use tracing_google_chat::extension::AdditionalFields;
/// let fields = AdditionalFields::new().field("user_id", 42).item("beta");
/// assert_eq!(fields.len(), 2);
/// ```
pub struct AdditionalFields {
    entries: Vec<Entry>,
    invalid: Option<&'static str>,
}

impl Default for AdditionalFields {
    fn default() -> Self {
        Self::new()
    }
}

impl AdditionalFields {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            invalid: None,
        }
    }

    /// Add a named field. Numeric keys such as `"3"` count as positional.
    pub fn field<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Serialize + 'static,
    {
        let key = key.into();
        let named = !is_numeric_key(&key);
        self.entries.push(Entry {
            key,
            named,
            value: FieldValue::Deferred(Box::new(move || serde_json::to_value(value))),
        });
        self
    }

    /// Add a positional field, rendered without a label.
    pub fn item<T>(mut self, value: T) -> Self
    where
        T: Serialize + 'static,
    {
        let key = self.entries.len().to_string();
        self.entries.push(Entry {
            key,
            named: false,
            value: FieldValue::Deferred(Box::new(move || serde_json::to_value(value))),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Value> for AdditionalFields {
    fn from(value: Value) -> Self {
        let ready = |key: String, named: bool, value: Value| Entry {
            key,
            named,
            value: FieldValue::Ready(value),
        };

        match value {
            Value::Object(map) => Self {
                entries: map
                    .into_iter()
                    .map(|(key, value)| {
                        let named = !is_numeric_key(&key);
                        ready(key, named, value)
                    })
                    .collect(),
                invalid: None,
            },
            Value::Array(items) => Self {
                entries: items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, value)| ready(idx.to_string(), false, value))
                    .collect(),
                invalid: None,
            },
            other => Self {
                entries: Vec::new(),
                invalid: Some(json_kind(&other)),
            },
        }
    }
}

/// Run the hook (if any) and turn its fields into card widgets.
///
/// **Errors**
/// - [`ChatError::InvalidExtensionResult`] when the hook returned neither
///   a map nor a list. No widgets are produced.
/// - [`ChatError::Serialization`] when a value cannot be serialized; it
///   names the field and fields after it are not serialized.
pub fn collect_custom_widgets(
    provider: Option<&dyn AdditionalFieldsProvider>,
    request: &RequestContext,
) -> Result<Vec<Widget>, ChatError> {
    let Some(provider) = provider else {
        return Ok(Vec::new());
    };

    let fields = provider.additional_fields(request);
    if let Some(found) = fields.invalid {
        return Err(ChatError::InvalidExtensionResult { found });
    }

    let mut widgets = Vec::with_capacity(fields.entries.len());
    for Entry { key, named, value } in fields.entries {
        let value = value
            .resolve()
            .map_err(|source| ChatError::Serialization { key: key.clone(), source })?;
        let value = field_text(value);
        let text = if named {
            format!("<b>{}:</b> {}", capitalize_words(&key.replace('_', " ")), value)
        } else {
            value
        };
        widgets.push(Widget::new(text, KnownIcon::ConfirmationNumberIcon));
    }
    Ok(widgets)
}

fn field_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        v if is_falsy(&v) => falsy_text(&v),
        v => v.to_string(),
    }
}

/// Values that are left as-is instead of being JSON-encoded.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn falsy_text(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Array(_) => "[]".to_string(),
        Value::Object(_) => "{}".to_string(),
        _ => String::new(),
    }
}

/// Object keys such as `"3"` or `"1.5"` count as positional.
fn is_numeric_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
        && key.parse::<f64>().is_ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn widgets_for(value: Value) -> Result<Vec<Widget>, ChatError> {
        let hook = move |_: &RequestContext| value.clone();
        collect_custom_widgets(Some(&hook), &RequestContext::default())
    }

    fn texts(widgets: &[Widget]) -> Vec<&str> {
        widgets.iter().map(Widget::text).collect()
    }

    #[test]
    fn no_hook_means_no_widgets() {
        let widgets = collect_custom_widgets(None, &RequestContext::default()).unwrap();
        assert!(widgets.is_empty());
    }

    #[test]
    fn named_fields_get_title_cased_labels() {
        let widgets = widgets_for(json!({"user_id": 42})).unwrap();
        assert_eq!(texts(&widgets), vec!["<b>User Id:</b> 42"]);
        assert_eq!(widgets[0].icon(), KnownIcon::ConfirmationNumberIcon);
    }

    #[test]
    fn order_is_preserved() {
        let widgets = widgets_for(json!({"zeta": "z", "alpha": "a", "mid_name": "m"})).unwrap();
        assert_eq!(
            texts(&widgets),
            vec!["<b>Zeta:</b> z", "<b>Alpha:</b> a", "<b>Mid Name:</b> m"]
        );
    }

    #[test]
    fn positional_fields_are_bare() {
        let widgets = widgets_for(json!(["first", {"a": 1}])).unwrap();
        assert_eq!(texts(&widgets), vec!["first", r#"{"a":1}"#]);
    }

    #[test]
    fn numeric_object_keys_are_positional() {
        let widgets = widgets_for(json!({"7": "seven", "tenant": "acme"})).unwrap();
        assert_eq!(texts(&widgets), vec!["seven", "<b>Tenant:</b> acme"]);
    }

    #[test]
    fn structured_values_are_json_encoded() {
        let widgets = widgets_for(json!({"roles": ["admin", "ops"], "active": true})).unwrap();
        assert_eq!(
            texts(&widgets),
            vec![r#"<b>Roles:</b> ["admin","ops"]"#, "<b>Active:</b> true"]
        );
    }

    #[test]
    fn falsy_values_are_not_encoded() {
        let widgets = widgets_for(json!({"a": null, "b": false, "c": 0, "d": []})).unwrap();
        assert_eq!(
            texts(&widgets),
            vec!["<b>A:</b> ", "<b>B:</b> ", "<b>C:</b> 0", "<b>D:</b> []"]
        );
    }

    #[test]
    fn scalar_result_is_rejected() {
        let err = widgets_for(json!(42)).unwrap_err();
        assert!(matches!(err, ChatError::InvalidExtensionResult { found: "a number" }));
    }

    #[test]
    fn hook_sees_the_request() {
        let hook = |req: &RequestContext| json!({"path": req.url_or_empty()});
        let request = RequestContext::new("https://app.test/cart");
        let widgets = collect_custom_widgets(Some(&hook), &request).unwrap();
        assert_eq!(texts(&widgets), vec!["<b>Path:</b> https://app.test/cart"]);
    }

    /// Serializes like a map with non-string keys: always fails.
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("key must be a string"))
        }
    }

    /// Records whether it was ever serialized.
    struct Tracked(Arc<AtomicBool>);

    impl Serialize for Tracked {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.0.store(true, Ordering::SeqCst);
            serializer.serialize_str("tracked")
        }
    }

    #[test]
    fn builder_fields_render_like_json_fields() {
        let hook = |_: &RequestContext| {
            AdditionalFields::new()
                .field("user_id", 42)
                .field("roles", vec!["admin", "ops"])
                .item("bare")
                .field("9", "numeric")
        };
        let widgets = collect_custom_widgets(Some(&hook), &RequestContext::default()).unwrap();
        assert_eq!(
            texts(&widgets),
            vec![
                "<b>User Id:</b> 42",
                r#"<b>Roles:</b> ["admin","ops"]"#,
                "bare",
                "numeric"
            ]
        );
    }

    #[test]
    fn failing_value_is_a_serialization_error_naming_the_key() {
        let later_serialized = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&later_serialized);
        let hook = move |_: &RequestContext| {
            AdditionalFields::new()
                .field("tenant", "acme")
                .field("session_map", Unserializable)
                .field("after", Tracked(Arc::clone(&flag)))
        };

        let err = collect_custom_widgets(Some(&hook), &RequestContext::default()).unwrap_err();
        match &err {
            ChatError::Serialization { key, source } => {
                assert_eq!(key, "session_map");
                assert!(source.to_string().contains("key must be a string"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("key[session_map]"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!later_serialized.load(Ordering::SeqCst));
    }

    #[test]
    fn numeric_key_detection() {
        assert!(is_numeric_key("12"));
        assert!(is_numeric_key(" 1.5 "));
        assert!(!is_numeric_key("user_id"));
        assert!(!is_numeric_key("inf"));
        assert!(!is_numeric_key(""));
    }
}
