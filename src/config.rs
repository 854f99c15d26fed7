use crate::error::ChatError;
use crate::record::Severity;
use serde::Deserialize;
use std::time::Duration;

/// One or more webhook URLs.
///
/// Accepts either a list or a single comma-separated string, so both
/// `"webhook": ["a", "b"]` and `"webhook": "a, b"` deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WebhookTarget {
    List(Vec<String>),
    Joined(String),
}

impl WebhookTarget {
    fn is_empty(&self) -> bool {
        match self {
            WebhookTarget::List(urls) => urls.is_empty(),
            WebhookTarget::Joined(urls) => urls.is_empty(),
        }
    }

    /// Lists pass through untouched; joined strings are split on `,` and
    /// each segment trimmed. Segments are not validated.
    pub fn urls(&self) -> Vec<String> {
        match self {
            WebhookTarget::List(urls) => urls.clone(),
            WebhookTarget::Joined(urls) => urls.split(',').map(|s| s.trim().to_string()).collect(),
        }
    }
}

impl From<&str> for WebhookTarget {
    fn from(urls: &str) -> Self {
        WebhookTarget::Joined(urls.to_string())
    }
}

impl From<Vec<String>> for WebhookTarget {
    fn from(urls: Vec<String>) -> Self {
        WebhookTarget::List(urls)
    }
}

/// Comma-separated user ids to mention, per severity plus a default list
/// that applies to every severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub default: Option<String>,
    pub emergency: Option<String>,
    pub alert: Option<String>,
    pub critical: Option<String>,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub notice: Option<String>,
    pub info: Option<String>,
    pub debug: Option<String>,
}

impl NotifyConfig {
    pub fn for_severity(&self, severity: Severity) -> Option<&str> {
        let ids = match severity {
            Severity::Emergency => &self.emergency,
            Severity::Alert => &self.alert,
            Severity::Critical => &self.critical,
            Severity::Error => &self.error,
            Severity::Warning => &self.warning,
            Severity::Notice => &self.notice,
            Severity::Info => &self.info,
            Severity::Debug => &self.debug,
        };
        ids.as_deref()
    }

    pub fn set(&mut self, severity: Severity, ids: impl Into<String>) {
        let slot = match severity {
            Severity::Emergency => &mut self.emergency,
            Severity::Alert => &mut self.alert,
            Severity::Critical => &mut self.critical,
            Severity::Error => &mut self.error,
            Severity::Warning => &mut self.warning,
            Severity::Notice => &mut self.notice,
            Severity::Info => &mut self.info,
            Severity::Debug => &mut self.debug,
        };
        *slot = Some(ids.into());
    }

    /// Ids to mention for `severity`: `default,levelSpecific` when both
    /// are set, whichever one is set otherwise, or an empty string.
    pub fn resolve_mention_ids(&self, severity: Severity) -> String {
        let level_ids = self.for_severity(severity).unwrap_or_default().trim();
        let default_ids = self.default.as_deref().unwrap_or_default().trim();

        if !default_ids.is_empty() && !level_ids.is_empty() {
            format!("{default_ids},{level_ids}")
        } else {
            format!("{default_ids}{level_ids}")
        }
    }
}

/// Everything a dispatch reads from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub webhook: Option<WebhookTarget>,
    pub notify: NotifyConfig,
    pub app_name: Option<String>,
    pub app_env: Option<String>,
    /// Per-request timeout in seconds. Unset or `0` keeps the client default.
    pub timeout_secs: Option<u64>,
}

impl ChatConfig {
    pub fn with_webhook(mut self, webhook: impl Into<WebhookTarget>) -> Self {
        self.webhook = Some(webhook.into());
        self
    }

    pub fn with_app(mut self, name: impl Into<String>, env: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self.app_env = Some(env.into());
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    /// Webhook URLs to post to.
    ///
    /// **Errors**
    /// - [`ChatError::Configuration`] if no target is set or it is empty.
    pub fn resolve_targets(&self) -> Result<Vec<String>, ChatError> {
        match &self.webhook {
            Some(target) if !target.is_empty() => Ok(target.urls()),
            _ => Err(ChatError::Configuration),
        }
    }
}

/// Where a dispatch gets its [`ChatConfig`] from.
///
/// `load` is called on every dispatch; implementations must not cache
/// unless that is what the caller wants.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> ChatConfig;
}

/// A fixed configuration value.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub ChatConfig);

impl ConfigSource for StaticConfig {
    fn load(&self) -> ChatConfig {
        self.0.clone()
    }
}

impl<F> ConfigSource for F
where
    F: Fn() -> ChatConfig + Send + Sync,
{
    fn load(&self) -> ChatConfig {
        self()
    }
}
