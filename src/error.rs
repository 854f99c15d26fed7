/// Errors surfaced while formatting or delivering a chat message.
///
/// Every variant aborts the dispatch that produced it. Nothing here is
/// retried; the caller decides whether to swallow or report.
#[derive(thiserror::Error, Debug)]
pub enum ChatError {
    /// No webhook URL is configured.
    #[error("webhook url is not configured")]
    Configuration,

    /// The additional-fields hook returned something other than a map
    /// or a list.
    #[error("additional fields must be a map or a list, got {found}")]
    InvalidExtensionResult { found: &'static str },

    /// A custom field value failed to serialize. Fields after it are
    /// not rendered.
    #[error("additional field value could not be serialized for key[{key}]: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The HTTP request itself failed (connect, timeout, body encoding).
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("webhook {url} responded with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}
