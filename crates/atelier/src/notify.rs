use crate::models::message::Message;

/// Presentation boundary: every message appended to a transcript is
/// mirrored here before the chat proceeds. This is a display side channel,
/// not part of the chat's correctness.
pub trait Notifier: Send + Sync {
    fn message(&self, author: &str, recipient: &str, message: &Message);
}

/// Logs display events through tracing, used when no UI is attached
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn message(&self, author: &str, recipient: &str, message: &Message) {
        tracing::info!(author, recipient, content = %message.text(), "chat message");
    }
}

/// Discards display events
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn message(&self, _author: &str, _recipient: &str, _message: &Message) {}
}
