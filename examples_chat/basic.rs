use std::sync::Arc;
use tracing::{error, info, info_span};

use tracing_google_chat::env::EnvConfig;
use tracing_google_chat::init::init_tracing;
use tracing_google_chat::GoogleChatSink;

/// Posts one error card to the webhook(s) in `GOOGLE_CHAT_WEBHOOK_URL`.
///
/// ```text
/// GOOGLE_CHAT_WEBHOOK_URL=https://chat.googleapis.com/v1/spaces/... \
/// GOOGLE_CHAT_NOTIFY_USERS_ERROR=all APP_NAME=shop APP_ENV=staging \
/// cargo run --example basic
/// ```
#[tokio::main]
async fn main() {
    let sink = Arc::new(GoogleChatSink::new(EnvConfig));
    let handle = init_tracing(sink).expect("set global subscriber");

    info!("starting service");

    let span = info_span!("request", url = "https://shop.example/checkout", method = "POST");
    let guard = span.enter();
    error!(order_id = 1042, "payment provider rejected the charge");
    drop(guard);

    if let Err(e) = handle.drain().await {
        eprintln!("flush failed: {}", e);
    }
}
