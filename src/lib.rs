pub mod record;
pub mod request;
pub mod config;
pub mod env;
pub mod error;
pub mod mention;
pub mod payload;
pub mod extension;
pub mod formatter;
pub mod sink;
pub mod google_chat;
pub mod layer;
pub mod init;

pub use config::{ChatConfig, ConfigSource, NotifyConfig, StaticConfig, WebhookTarget};
pub use error::ChatError;
pub use formatter::MessageFormatter;
pub use google_chat::GoogleChatSink;
pub use layer::{ChatLogHandle, ChatLogLayer};
pub use record::{LogRecord, Severity};
pub use request::RequestContext;
