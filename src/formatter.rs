use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::extension::{collect_custom_widgets, AdditionalFieldsProvider};
use crate::mention::notifiable_text;
use crate::payload::{CardHeader, ChatPayload, KnownIcon, Widget};
use crate::record::LogRecord;
use crate::request::RequestContext;
use chrono::SecondsFormat;
use std::fmt;
use std::sync::Arc;

/// Google Chat rejects message text longer than this many characters.
pub const MAX_TEXT_CHARS: usize = 4096;

/// Renders [`LogRecord`]s into [`ChatPayload`]s.
///
/// The optional additional-fields hook lives on the formatter instance,
/// so two sinks in one process can carry different hooks.
#[derive(Clone, Default)]
pub struct MessageFormatter {
    additional_fields: Option<Arc<dyn AdditionalFieldsProvider>>,
}

impl fmt::Debug for MessageFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageFormatter")
            .field("additional_fields", &self.additional_fields.is_some())
            .finish()
    }
}

impl MessageFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the hook contributing extra card widgets per record.
    pub fn with_additional_fields(self, provider: impl AdditionalFieldsProvider + 'static) -> Self {
        self.with_shared_additional_fields(Arc::new(provider))
    }

    pub fn with_shared_additional_fields(mut self, provider: Arc<dyn AdditionalFieldsProvider>) -> Self {
        self.additional_fields = Some(provider);
        self
    }

    /// Render `record` using the mention, app and env settings in `config`.
    ///
    /// Widgets come out in a fixed order: environment, severity, timestamp,
    /// request URL, then hook fields in the order the hook returned them.
    ///
    /// **Errors**
    /// - Hook failures, see [`collect_custom_widgets`].
    pub fn build_payload(&self, record: &LogRecord, config: &ChatConfig) -> Result<ChatPayload, ChatError> {
        let mentions = notifiable_text(&config.notify.resolve_mention_ids(record.severity));
        let text = truncate_chars(&format!("{}{}", mentions, record.formatted), MAX_TEXT_CHARS);

        let header = CardHeader {
            title: format!("{}: {}", record.severity.name(), record.message),
            subtitle: config.app_name.clone(),
        };

        let default_request = RequestContext::default();
        let request = record.request.as_ref().unwrap_or(&default_request);

        let mut widgets = vec![
            Widget::new(env_text(config.app_env.as_deref()), KnownIcon::Bookmark),
            Widget::new(level_text(record), KnownIcon::Ticket),
            Widget::new(
                record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
                KnownIcon::Clock,
            ),
            Widget::new(request.url_or_empty(), KnownIcon::Bus),
        ];
        widgets.extend(collect_custom_widgets(self.additional_fields.as_deref(), request)?);

        Ok(ChatPayload::new(text, header, widgets))
    }
}

fn env_text(app_env: Option<&str>) -> String {
    let env = app_env.filter(|e| !e.is_empty()).unwrap_or("NA");
    format!("{} [Env]", capitalize_words(env))
}

fn level_text(record: &LogRecord) -> String {
    format!(
        "<font color='{}'>{}</font>",
        record.severity.color(),
        record.severity.name()
    )
}

/// Keep at most `max` characters. No ellipsis is added.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Upper-case the first character of every whitespace-separated word when
/// it is an ASCII letter, leaving the rest untouched.
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if word_start {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        word_start = matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c');
    }
    out
}
