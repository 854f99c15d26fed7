use std::sync::Arc;
use tracing::error;

use tracing_google_chat::env::EnvConfig;
use tracing_google_chat::extension::AdditionalFields;
use tracing_google_chat::init::{init_tracing_with_config, LayerConfig};
use tracing_google_chat::{GoogleChatSink, MessageFormatter, RequestContext, Severity};

/// Adds request-derived lines to every card and forwards warnings too.
#[tokio::main]
async fn main() {
    let formatter = MessageFormatter::new().with_additional_fields(|req: &RequestContext| {
        AdditionalFields::new()
            .field("http_method", req.method.clone().unwrap_or_default())
            .field("tenant", "acme")
            .field("flags", ["beta", "eu"])
    });
    let sink = Arc::new(GoogleChatSink::new(EnvConfig).with_formatter(formatter));

    let config = LayerConfig {
        min_severity: Severity::Warning,
        enable_stdout: false,
    };
    let handle = init_tracing_with_config(sink, config).expect("set global subscriber");

    error!(severity = "alert", "replica lag above 30s");

    if let Err(e) = handle.drain().await {
        eprintln!("flush failed: {}", e);
    }
}
