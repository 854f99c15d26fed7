use crate::layer::{ChatLogHandle, ChatLogLayer};
use crate::record::Severity;
use crate::sink::LogSink;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the chat logging layer.
///
/// **Fields**
/// - `min_severity`: records below this severity are not sent to chat.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to [`ChatLogLayer`] so events also reach the console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_severity: Severity,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Error,
            enable_stdout: true,
        }
    }
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`], normally a
///   [`crate::google_chat::GoogleChatSink`].
/// - `config`: [`LayerConfig`] controlling the severity threshold and
///   console output.
///
/// **Returns**
/// - A [`ChatLogHandle`]; call [`ChatLogHandle::drain`] before the runtime
///   shuts down so in-flight messages are not lost.
///
/// **Errors**
/// - Fails if a global default subscriber is already set.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<ChatLogHandle, tracing::subscriber::SetGlobalDefaultError> {
    let layer = ChatLogLayer::new(sink, config.min_severity);
    let handle = layer.handle();

    // The two branches produce different subscriber types.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`]: errors and above go to chat, everything is
/// printed to the console.
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<ChatLogHandle, tracing::subscriber::SetGlobalDefaultError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
