pub mod senders;
pub mod service;

pub use senders::{MessageTransport, SenderError, TelegramSender};
pub use service::Notifier;
