//! Environment variable names used by [`EnvConfig`].
//!
//! Variables are re-read on every [`ConfigSource::load`], so changes to
//! the process environment are picked up by the next log write.

use crate::config::{ChatConfig, ConfigSource, NotifyConfig, WebhookTarget};
use crate::record::Severity;

/// Webhook URL, or several separated by commas.
pub const GOOGLE_CHAT_WEBHOOK_URL_ENV: &str = "GOOGLE_CHAT_WEBHOOK_URL";

/// User ids mentioned regardless of severity.
pub const GOOGLE_CHAT_NOTIFY_USERS_DEFAULT_ENV: &str = "GOOGLE_CHAT_NOTIFY_USERS_DEFAULT";

/// Application name shown as the card subtitle.
pub const APP_NAME_ENV: &str = "APP_NAME";

/// Application environment shown in the first card widget.
pub const APP_ENV_ENV: &str = "APP_ENV";

/// Optional per-request timeout in whole seconds.
pub const GOOGLE_CHAT_TIMEOUT_SECS_ENV: &str = "GOOGLE_CHAT_TIMEOUT_SECS";

/// Per-severity mention variable, e.g. `GOOGLE_CHAT_NOTIFY_USERS_ERROR`.
pub fn notify_users_env(severity: Severity) -> String {
    format!("GOOGLE_CHAT_NOTIFY_USERS_{}", severity.name().to_ascii_uppercase())
}

/// Read an environment variable, treating empty values as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// [`ConfigSource`] backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn load(&self) -> ChatConfig {
        let mut notify = NotifyConfig {
            default: env_opt(GOOGLE_CHAT_NOTIFY_USERS_DEFAULT_ENV),
            ..Default::default()
        };
        for severity in Severity::ALL {
            if let Some(ids) = env_opt(&notify_users_env(severity)) {
                notify.set(severity, ids);
            }
        }

        ChatConfig {
            webhook: env_opt(GOOGLE_CHAT_WEBHOOK_URL_ENV).map(WebhookTarget::Joined),
            notify,
            app_name: env_opt(APP_NAME_ENV),
            app_env: env_opt(APP_ENV_ENV),
            timeout_secs: env_opt(GOOGLE_CHAT_TIMEOUT_SECS_ENV).and_then(|v| parse_timeout_secs(&v)),
        }
    }
}

/// Whole seconds, at least 1. Anything else keeps the client default and
/// is reported on stderr.
fn parse_timeout_secs(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            eprintln!("{GOOGLE_CHAT_TIMEOUT_SECS_ENV}=0 ignored; timeout must be at least 1 second");
            None
        }
        Ok(secs) => Some(secs),
        Err(e) => {
            eprintln!("{GOOGLE_CHAT_TIMEOUT_SECS_ENV}={raw:?} ignored: {e}");
            None
        }
    }
}
