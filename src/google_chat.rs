use crate::config::ConfigSource;
use crate::error::ChatError;
use crate::formatter::MessageFormatter;
use crate::payload::ChatPayload;
use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Google Chat implementation of [`LogSink`] posting `cardsV2` messages to
/// one or more incoming webhooks.
///
/// Configuration is loaded from the [`ConfigSource`] on every dispatch, so
/// webhook URLs and mention lists can change while the process runs.
#[derive(Clone)]
pub struct GoogleChatSink {
    client: Client,
    config: Arc<dyn ConfigSource>,
    formatter: MessageFormatter,
}

impl GoogleChatSink {
    /// Construct a new sink reading its settings from `config`.
    ///
    /// **Parameters**
    /// - `config`: any [`ConfigSource`], e.g. [`crate::env::EnvConfig`] or
    ///   [`crate::config::StaticConfig`].
    ///
    /// **Returns**
    /// - A sink with a plain [`MessageFormatter`]; use
    ///   [`GoogleChatSink::with_formatter`] to add a hook.
    pub fn new(config: impl ConfigSource + 'static) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
            formatter: MessageFormatter::new(),
        }
    }

    pub fn with_formatter(mut self, formatter: MessageFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Use a preconfigured HTTP client (proxy, TLS roots, default timeout).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn formatter(&self) -> &MessageFormatter {
        &self.formatter
    }

    /// Format `record` once and post it to every configured webhook, in
    /// order.
    ///
    /// **Errors**
    /// - [`ChatError::Configuration`] before any request if no webhook is
    ///   configured.
    /// - Formatting errors from the additional-fields hook, also before
    ///   any request.
    /// - [`ChatError::Http`] / [`ChatError::Status`] for the first
    ///   webhook that fails; later webhooks are not attempted.
    pub async fn dispatch(&self, record: &LogRecord) -> Result<(), ChatError> {
        let config = self.config.load();
        let targets = config.resolve_targets()?;
        let payload = self.formatter.build_payload(record, &config)?;

        for url in &targets {
            self.post(url, &payload, config.request_timeout()).await?;
        }
        Ok(())
    }

    async fn post(
        &self,
        url: &str,
        payload: &ChatPayload,
        timeout: Option<Duration>,
    ) -> Result<(), ChatError> {
        let mut request = self.client.post(url).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(ChatError::Status {
                url: url.to_string(),
                status,
                body,
            })
        }
    }
}

#[async_trait]
impl LogSink for GoogleChatSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.dispatch(record).await?;
        Ok(())
    }
}
